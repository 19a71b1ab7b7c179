//! Campaign service - creation, listing, editing and deletion of campaigns.
//!
//! Validation happens before any query runs, so invalid requests never
//! touch the database.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        campaign::{
            Campaign, CampaignFilter, CampaignStatus, CreateCampaignRequest, ListCampaignsQuery,
            UpdateCampaignRequest,
        },
        pagination::{Page, PageParams},
        transaction::{DonationRow, TransactionStatus},
    },
    validation,
};

/// Shared WHERE clause for campaign listings.
///
/// `$1` status, `$2` category, `$3` title pattern, `$4` creator id. A NULL
/// parameter disables its filter.
const CAMPAIGN_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR status = $1)
      AND ($2::text IS NULL OR category = $2)
      AND ($3::text IS NULL OR title ILIKE $3)
      AND ($4::uuid IS NULL OR creator_id = $4)
"#;

/// Turn raw query parameters into a validated filter.
///
/// # Errors
///
/// `InvalidRequest` for an unknown status or an invalid category.
pub fn parse_filter(query: &ListCampaignsQuery) -> Result<CampaignFilter, AppError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<CampaignStatus>)
        .transpose()
        .map_err(AppError::InvalidRequest)?;

    let category = query
        .category
        .as_deref()
        .map(validation::category)
        .transpose()?;

    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(CampaignFilter {
        status,
        category,
        search,
        creator_id: query.creator_id,
    })
}

/// Build an ILIKE pattern matching `search` anywhere, with LIKE
/// metacharacters in the input matched literally.
pub fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// List campaigns matching `filter`, newest first.
pub async fn list_campaigns(
    pool: &DbPool,
    filter: &CampaignFilter,
    params: PageParams,
) -> Result<Page<Campaign>, AppError> {
    let status = filter.status.map(|s| s.as_str());
    let pattern = filter.search.as_deref().map(like_pattern);

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM campaigns {CAMPAIGN_FILTER}"))
        .bind(status)
        .bind(filter.category.as_deref())
        .bind(pattern.as_deref())
        .bind(filter.creator_id)
        .fetch_one(pool)
        .await?;

    let campaigns = sqlx::query_as::<_, Campaign>(&format!(
        "SELECT * FROM campaigns {CAMPAIGN_FILTER} ORDER BY created_at DESC, id LIMIT $5 OFFSET $6"
    ))
    .bind(status)
    .bind(filter.category.as_deref())
    .bind(pattern.as_deref())
    .bind(filter.creator_id)
    .bind(params.per_page())
    .bind(params.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page::new(campaigns, params, total))
}

/// Fetch one campaign or fail with `CampaignNotFound`.
pub async fn get_campaign(pool: &DbPool, campaign_id: Uuid) -> Result<Campaign, AppError> {
    sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
        .bind(campaign_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::CampaignNotFound)
}

/// Create a campaign owned by `creator_id`.
///
/// New campaigns start `active` with zeroed counters.
pub async fn create_campaign(
    pool: &DbPool,
    creator_id: Uuid,
    request: CreateCampaignRequest,
) -> Result<Campaign, AppError> {
    let now = Utc::now();
    let title = validation::title(&request.title)?;
    let description = validation::description(&request.description)?;
    validation::goal(request.goal_cents)?;
    let category = request
        .category
        .as_deref()
        .map(validation::category)
        .transpose()?;
    let image_url = request
        .image_url
        .as_deref()
        .map(|u| validation::http_url("Image URL", u))
        .transpose()?;
    if let Some(deadline) = request.deadline {
        validation::deadline(deadline, now)?;
    }

    let campaign = sqlx::query_as::<_, Campaign>(
        r#"
        INSERT INTO campaigns (creator_id, title, description, goal_cents, category, image_url, deadline)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(creator_id)
    .bind(title)
    .bind(description)
    .bind(request.goal_cents)
    .bind(category)
    .bind(image_url)
    .bind(request.deadline)
    .fetch_one(pool)
    .await?;

    tracing::info!(campaign_id = %campaign.id, %creator_id, "campaign created");

    Ok(campaign)
}

/// Apply a partial update. Only the creator or an admin may edit.
pub async fn update_campaign(
    pool: &DbPool,
    auth: &AuthContext,
    campaign_id: Uuid,
    request: UpdateCampaignRequest,
) -> Result<Campaign, AppError> {
    let now = Utc::now();
    let title = request.title.as_deref().map(validation::title).transpose()?;
    let description = request
        .description
        .as_deref()
        .map(validation::description)
        .transpose()?;
    if let Some(goal) = request.goal_cents {
        validation::goal(goal)?;
    }
    let category = request
        .category
        .as_deref()
        .map(validation::category)
        .transpose()?;
    let image_url = request
        .image_url
        .as_deref()
        .map(|u| validation::http_url("Image URL", u))
        .transpose()?;
    if let Some(deadline) = request.deadline {
        validation::deadline(deadline, now)?;
    }

    let existing = get_campaign(pool, campaign_id).await?;
    auth.require_owner_or_admin(existing.creator_id)?;

    let campaign = sqlx::query_as::<_, Campaign>(
        r#"
        UPDATE campaigns
        SET title = COALESCE($2, title),
            description = COALESCE($3, description),
            goal_cents = COALESCE($4, goal_cents),
            category = COALESCE($5, category),
            image_url = COALESCE($6, image_url),
            deadline = COALESCE($7, deadline),
            status = COALESCE($8, status),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(campaign_id)
    .bind(title)
    .bind(description)
    .bind(request.goal_cents)
    .bind(category)
    .bind(image_url)
    .bind(request.deadline)
    .bind(request.status.map(|s| s.as_str()))
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::CampaignNotFound)?;

    Ok(campaign)
}

/// Delete a campaign that has never received a donation.
///
/// Campaigns with transactions must be cancelled instead, so their
/// donation history is kept.
pub async fn delete_campaign(
    pool: &DbPool,
    auth: &AuthContext,
    campaign_id: Uuid,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let creator_id: Uuid =
        sqlx::query_scalar("SELECT creator_id FROM campaigns WHERE id = $1 FOR UPDATE")
            .bind(campaign_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::CampaignNotFound)?;

    auth.require_owner_or_admin(creator_id)?;

    let has_transactions: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM transactions WHERE campaign_id = $1)")
            .bind(campaign_id)
            .fetch_one(&mut *tx)
            .await?;

    if has_transactions {
        tx.rollback().await?;
        return Err(AppError::Conflict(
            "Campaign has donations; cancel it instead of deleting".to_string(),
        ));
    }

    sqlx::query("DELETE FROM campaigns WHERE id = $1")
        .bind(campaign_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(%campaign_id, deleted_by = %auth.user_id, "campaign deleted");

    Ok(())
}

/// Completed donations to a campaign, newest first.
pub async fn list_donations(
    pool: &DbPool,
    campaign_id: Uuid,
    params: PageParams,
) -> Result<Page<DonationRow>, AppError> {
    // 404 for unknown campaigns rather than an empty page
    get_campaign(pool, campaign_id).await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM transactions WHERE campaign_id = $1 AND status = $2",
    )
    .bind(campaign_id)
    .bind(TransactionStatus::Completed.as_str())
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query_as::<_, DonationRow>(
        r#"
        SELECT t.id, t.donor_id, u.name AS donor_name, t.amount_cents, t.message,
               t.is_anonymous, t.created_at
        FROM transactions t
        JOIN users u ON u.id = t.donor_id
        WHERE t.campaign_id = $1 AND t.status = $2
        ORDER BY t.created_at DESC, t.id
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(campaign_id)
    .bind(TransactionStatus::Completed.as_str())
    .bind(params.per_page())
    .bind(params.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page::new(rows, params, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("garden"), "%garden%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\x"), "%c:\\\\x%");
    }

    #[test]
    fn test_parse_filter_accepts_known_status() {
        let query = ListCampaignsQuery {
            status: Some("completed".to_string()),
            category: Some(" Health ".to_string()),
            search: Some("  ".to_string()),
            ..Default::default()
        };

        let filter = parse_filter(&query).unwrap();
        assert_eq!(filter.status, Some(CampaignStatus::Completed));
        assert_eq!(filter.category.as_deref(), Some("health"));
        assert!(filter.search.is_none());
    }

    #[test]
    fn test_parse_filter_rejects_unknown_status() {
        let query = ListCampaignsQuery {
            status: Some("paused".to_string()),
            ..Default::default()
        };

        match parse_filter(&query) {
            Err(AppError::InvalidRequest(msg)) => assert!(msg.contains("paused")),
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_campaign_with_donations_cannot_be_deleted(pool: DbPool) {
        use crate::{
            models::user::Role,
            services::transaction_service,
            test_support::{campaign, donation, user},
        };

        let creator = user(&pool, Role::User).await;
        let donor = user(&pool, Role::User).await;
        let campaign_id = campaign(&pool, creator.user_id).await;

        let tx = transaction_service::donate(&pool, donor.user_id, donation(campaign_id, 100))
            .await
            .unwrap();
        // Refunded history still blocks deletion
        transaction_service::refund(&pool, &creator, tx.id).await.unwrap();

        assert!(matches!(
            delete_campaign(&pool, &creator, campaign_id).await,
            Err(AppError::Conflict(_))
        ));
        assert!(get_campaign(&pool, campaign_id).await.is_ok());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_only_owner_or_admin_deletes_empty_campaign(pool: DbPool) {
        use crate::{
            models::user::Role,
            test_support::{campaign, user},
        };

        let creator = user(&pool, Role::User).await;
        let stranger = user(&pool, Role::User).await;
        let admin = user(&pool, Role::Admin).await;
        let mine = campaign(&pool, creator.user_id).await;
        let other = campaign(&pool, creator.user_id).await;

        assert!(matches!(
            delete_campaign(&pool, &stranger, mine).await,
            Err(AppError::Forbidden)
        ));

        delete_campaign(&pool, &creator, mine).await.unwrap();
        delete_campaign(&pool, &admin, other).await.unwrap();

        assert!(matches!(
            get_campaign(&pool, mine).await,
            Err(AppError::CampaignNotFound)
        ));
        assert!(matches!(
            get_campaign(&pool, other).await,
            Err(AppError::CampaignNotFound)
        ));
    }
}
