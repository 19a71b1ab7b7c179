//! User profile HTTP handlers.
//!
//! - GET /api/v1/users/{id} - Public profile
//! - PUT /api/v1/users/me - Update own profile
//! - GET /api/v1/users/me/campaigns - Campaigns created by the caller
//! - GET /api/v1/users/me/transactions - Donations made by the caller

use axum::{
    Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        campaign::{CampaignFilter, CampaignResponse},
        pagination::{Page, PageParams},
        transaction::TransactionResponse,
        user::{PublicUserResponse, UpdateProfileRequest, User, UserResponse},
    },
    services::{campaign_service, transaction_service},
    validation,
};

/// Public profile of any user. Email and role are not included.
pub async fn get_user(
    State(pool): State<DbPool>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<PublicUserResponse>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::UserNotFound)?;

    Ok(Json(user.into()))
}

/// Update the caller's profile.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Ada King",
///   "bio": "Mathematician",
///   "avatar_url": "https://example.com/ada.png"
/// }
/// ```
///
/// Every field is optional; absent fields are left unchanged.
pub async fn update_me(
    State(pool): State<DbPool>,
    auth: AuthContext,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let name = request.name.as_deref().map(validation::name).transpose()?;
    let bio = request.bio.as_deref().map(validation::bio).transpose()?;
    let avatar_url = request
        .avatar_url
        .as_deref()
        .map(|u| validation::http_url("Avatar URL", u))
        .transpose()?;

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            bio = COALESCE($3, bio),
            avatar_url = COALESCE($4, avatar_url),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(auth.user_id)
    .bind(name)
    .bind(bio)
    .bind(avatar_url)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::UserNotFound)?;

    Ok(Json(user.into()))
}

/// Campaigns created by the caller, newest first, in any status.
pub async fn my_campaigns(
    State(pool): State<DbPool>,
    auth: AuthContext,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<CampaignResponse>>, AppError> {
    let filter = CampaignFilter {
        creator_id: Some(auth.user_id),
        ..Default::default()
    };

    let page = campaign_service::list_campaigns(&pool, &filter, params).await?;

    Ok(Json(page.map(Into::into)))
}

/// Donations made by the caller, newest first, including refunded ones.
pub async fn my_transactions(
    State(pool): State<DbPool>,
    auth: AuthContext,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<TransactionResponse>>, AppError> {
    let page = transaction_service::list_for_donor(&pool, auth.user_id, params).await?;

    Ok(Json(page.map(Into::into)))
}
