//! Transaction service - Core business logic for donations and refunds.
//!
//! This service handles:
//! - Idempotency checking
//! - Campaign state checks (status, deadline)
//! - Keeping the campaign's cached counters in step with its transactions
//! - Database transaction management
//!
//! # Atomicity Guarantees
//!
//! A donation or refund writes the transaction row and adjusts the campaign
//! counters in one PostgreSQL transaction, with the campaign row locked
//! (`FOR UPDATE`) so concurrent donations to the same campaign serialise.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, is_unique_violation},
    middleware::auth::AuthContext,
    models::{
        campaign::Campaign,
        pagination::{Page, PageParams},
        transaction::{DonationRequest, Transaction, TransactionStatus},
    },
    validation,
};

/// Whether `auth` may see a transaction from `donor_id` to a campaign
/// created by `creator_id`.
pub fn can_view(auth: &AuthContext, donor_id: Uuid, creator_id: Uuid) -> bool {
    auth.is_admin() || auth.user_id == donor_id || auth.user_id == creator_id
}

async fn find_by_idempotency_key(
    pool: &DbPool,
    donor_id: Uuid,
    key: &str,
) -> Result<Option<Transaction>, AppError> {
    let existing = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE donor_id = $1 AND idempotency_key = $2",
    )
    .bind(donor_id)
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(existing)
}

/// Whether `donor_id` has a completed donation to the campaign.
async fn has_completed_donation(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    campaign_id: Uuid,
    donor_id: Uuid,
) -> Result<bool, AppError> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM transactions
            WHERE campaign_id = $1 AND donor_id = $2 AND status = $3
        )
        "#,
    )
    .bind(campaign_id)
    .bind(donor_id)
    .bind(TransactionStatus::Completed.as_str())
    .fetch_one(&mut **tx)
    .await?;

    Ok(exists)
}

/// Donate to a campaign.
///
/// # Process
///
/// 1. Validate amount, message and idempotency key
/// 2. Return the earlier transaction if the idempotency key was seen
/// 3. Start database transaction and lock the campaign
/// 4. Check the campaign accepts donations
/// 5. Record transaction and bump the campaign counters
/// 6. Commit (or rollback on error)
///
/// # Errors
///
/// - `InvalidRequest`: Amount not in `1..=MAX_AMOUNT_CENTS`, message too
///   long, or the campaign total would overflow
/// - `CampaignNotFound`: Campaign doesn't exist
/// - `CampaignClosed`: Campaign is not active or its deadline passed
/// - `Database`: Database error occurred
pub async fn donate(
    pool: &DbPool,
    donor_id: Uuid,
    request: DonationRequest,
) -> Result<Transaction, AppError> {
    validation::amount(request.amount_cents)?;
    let message = validation::message(request.message)?;
    validation::idempotency_key(request.idempotency_key.as_deref())?;

    if let Some(ref key) = request.idempotency_key {
        if let Some(existing) = find_by_idempotency_key(pool, donor_id, key).await? {
            tracing::debug!(transaction_id = %existing.id, "idempotent replay of donation");
            return Ok(existing);
        }
    }

    let mut tx = pool.begin().await?;

    let campaign =
        sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1 FOR UPDATE")
            .bind(request.campaign_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::CampaignNotFound)?;

    if !campaign.accepts_donations(Utc::now()) {
        tx.rollback().await?;
        return Err(AppError::CampaignClosed);
    }

    // The row is locked, so this is the total the UPDATE below adds to
    if campaign
        .current_amount_cents
        .checked_add(request.amount_cents)
        .is_none()
    {
        tx.rollback().await?;
        return Err(AppError::InvalidRequest(
            "Donation would exceed the campaign's maximum total".to_string(),
        ));
    }

    // A donor only counts once per campaign
    let returning_donor = has_completed_donation(&mut tx, campaign.id, donor_id).await?;

    let inserted = sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions (
            campaign_id,
            donor_id,
            amount_cents,
            message,
            is_anonymous,
            idempotency_key,
            status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(campaign.id)
    .bind(donor_id)
    .bind(request.amount_cents)
    .bind(message)
    .bind(request.is_anonymous)
    .bind(&request.idempotency_key)
    .bind(TransactionStatus::Completed.as_str())
    .fetch_one(&mut *tx)
    .await;

    let transaction = match inserted {
        Ok(transaction) => transaction,
        // Lost a race with a concurrent request carrying the same key
        Err(e) if is_unique_violation(&e) => {
            drop(tx);
            let key = request.idempotency_key.as_deref().unwrap_or_default();
            return find_by_idempotency_key(pool, donor_id, key)
                .await?
                .ok_or(AppError::Database(e));
        }
        Err(e) => return Err(e.into()),
    };

    sqlx::query(
        r#"
        UPDATE campaigns
        SET current_amount_cents = current_amount_cents + $1,
            donor_count = donor_count + $2,
            updated_at = NOW()
        WHERE id = $3
        "#,
    )
    .bind(transaction.amount_cents)
    .bind(if returning_donor { 0_i64 } else { 1_i64 })
    .bind(campaign.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        transaction_id = %transaction.id,
        campaign_id = %campaign.id,
        amount_cents = transaction.amount_cents,
        "donation recorded"
    );

    Ok(transaction)
}

/// Get a transaction visible to the caller.
///
/// Returns `TransactionNotFound` both when the row is missing and when the
/// caller is not the donor, the campaign's creator, or an admin.
pub async fn get_transaction(
    pool: &DbPool,
    auth: &AuthContext,
    transaction_id: Uuid,
) -> Result<Transaction, AppError> {
    let transaction = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
        .bind(transaction_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::TransactionNotFound)?;

    let creator_id: Uuid = sqlx::query_scalar("SELECT creator_id FROM campaigns WHERE id = $1")
        .bind(transaction.campaign_id)
        .fetch_one(pool)
        .await?;

    if !can_view(auth, transaction.donor_id, creator_id) {
        return Err(AppError::TransactionNotFound);
    }

    Ok(transaction)
}

/// Refund a completed donation.
///
/// Only the campaign's creator or an admin may refund. The campaign row is
/// locked before the transaction row, the same order donations use.
pub async fn refund(
    pool: &DbPool,
    auth: &AuthContext,
    transaction_id: Uuid,
) -> Result<Transaction, AppError> {
    let campaign_id: Uuid =
        sqlx::query_scalar("SELECT campaign_id FROM transactions WHERE id = $1")
            .bind(transaction_id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::TransactionNotFound)?;

    let mut tx = pool.begin().await?;

    let creator_id: Uuid =
        sqlx::query_scalar("SELECT creator_id FROM campaigns WHERE id = $1 FOR UPDATE")
            .bind(campaign_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::CampaignNotFound)?;

    let transaction =
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1 FOR UPDATE")
            .bind(transaction_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::TransactionNotFound)?;

    if !can_view(auth, transaction.donor_id, creator_id) {
        tx.rollback().await?;
        return Err(AppError::TransactionNotFound);
    }
    if let Err(e) = auth.require_owner_or_admin(creator_id) {
        tx.rollback().await?;
        return Err(e);
    }

    if transaction.status != TransactionStatus::Completed.as_str() {
        tx.rollback().await?;
        return Err(AppError::Conflict(
            "Only completed transactions can be refunded".to_string(),
        ));
    }

    let refunded = sqlx::query_as::<_, Transaction>(
        "UPDATE transactions SET status = $2 WHERE id = $1 RETURNING *",
    )
    .bind(transaction_id)
    .bind(TransactionStatus::Refunded.as_str())
    .fetch_one(&mut *tx)
    .await?;

    let still_donor = has_completed_donation(&mut tx, campaign_id, refunded.donor_id).await?;

    // GREATEST keeps the CHECK constraints satisfied if the counters had drifted
    sqlx::query(
        r#"
        UPDATE campaigns
        SET current_amount_cents = GREATEST(current_amount_cents - $1, 0),
            donor_count = GREATEST(donor_count - $2, 0),
            updated_at = NOW()
        WHERE id = $3
        "#,
    )
    .bind(refunded.amount_cents)
    .bind(if still_donor { 0_i64 } else { 1_i64 })
    .bind(campaign_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        %transaction_id,
        %campaign_id,
        refunded_by = %auth.user_id,
        "donation refunded"
    );

    Ok(refunded)
}

/// A donor's transactions, newest first.
pub async fn list_for_donor(
    pool: &DbPool,
    donor_id: Uuid,
    params: PageParams,
) -> Result<Page<Transaction>, AppError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE donor_id = $1")
        .bind(donor_id)
        .fetch_one(pool)
        .await?;

    let transactions = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE donor_id = $1
        ORDER BY created_at DESC, id
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(donor_id)
    .bind(params.per_page())
    .bind(params.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page::new(transactions, params, total))
}
