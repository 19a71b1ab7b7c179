//! Fixtures for tests that run against a real database.
//!
//! Those tests use `#[sqlx::test(migrations = "./migrations")]`, which
//! creates a fresh database per test from `DATABASE_URL`. They are
//! `#[ignore]`d by default; run them with `cargo test -- --ignored`.

use uuid::Uuid;

use crate::{
    db::DbPool,
    middleware::auth::AuthContext,
    models::{transaction::DonationRequest, user::Role},
};

/// Insert a user and return an `AuthContext` for them.
pub async fn user(pool: &DbPool, role: Role) -> AuthContext {
    let user_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind("Test User")
    .bind(format!("{}@example.com", Uuid::new_v4()))
    .bind("$argon2id$unused")
    .bind(role.as_str())
    .fetch_one(pool)
    .await
    .unwrap();

    AuthContext { user_id, role }
}

/// Insert an active campaign with zeroed counters.
pub async fn campaign(pool: &DbPool, creator_id: Uuid) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO campaigns (creator_id, title, goal_cents) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(creator_id)
    .bind("Community garden")
    .bind(100_000_i64)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// `(current_amount_cents, donor_count)` as cached on the campaign row.
pub async fn counters(pool: &DbPool, campaign_id: Uuid) -> (i64, i64) {
    sqlx::query_as("SELECT current_amount_cents, donor_count FROM campaigns WHERE id = $1")
        .bind(campaign_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub fn donation(campaign_id: Uuid, amount_cents: i64) -> DonationRequest {
    DonationRequest {
        campaign_id,
        amount_cents,
        message: None,
        is_anonymous: false,
        idempotency_key: None,
    }
}
