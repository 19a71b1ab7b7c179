//! Campaign HTTP handlers.
//!
//! This module implements the campaign-related API endpoints:
//! - GET /api/v1/campaigns - List campaigns (public, filterable, paginated)
//! - POST /api/v1/campaigns - Create a campaign
//! - GET /api/v1/campaigns/{id} - Get one campaign (public)
//! - PUT /api/v1/campaigns/{id} - Edit a campaign (creator or admin)
//! - DELETE /api/v1/campaigns/{id} - Delete a campaign without donations
//! - GET /api/v1/campaigns/{id}/donations - Public donation list

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        campaign::{
            CampaignResponse, CreateCampaignRequest, ListCampaignsQuery, UpdateCampaignRequest,
        },
        pagination::{Page, PageParams},
        transaction::DonationResponse,
    },
    services::campaign_service,
};

/// List campaigns.
///
/// # Query Parameters
///
/// - `page`, `per_page` - pagination (defaults 1 and 20, `per_page` max 100)
/// - `status` - `active`, `completed`, or `cancelled`
/// - `category` - exact category match (case-insensitive)
/// - `search` - case-insensitive substring of the title
/// - `creator_id` - only campaigns by this user
///
/// # Response (200 OK)
///
/// ```json
/// { "items": [ { "id": "...", "title": "...", ... } ], "page": 1, "per_page": 20, "total": 1 }
/// ```
pub async fn list_campaigns(
    State(pool): State<DbPool>,
    Query(query): Query<ListCampaignsQuery>,
) -> Result<Json<Page<CampaignResponse>>, AppError> {
    let filter = campaign_service::parse_filter(&query)?;

    let page = campaign_service::list_campaigns(&pool, &filter, query.pagination()).await?;

    Ok(Json(page.map(Into::into)))
}

/// Create a campaign owned by the caller.
///
/// # Response
///
/// - **Success (201 Created)**: the new campaign
/// - **Error (400)**: Invalid title, goal, URL, or past deadline
/// - **Error (401)**: Missing or invalid token
pub async fn create_campaign(
    State(pool): State<DbPool>,
    auth: AuthContext,
    Json(request): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<CampaignResponse>), AppError> {
    let campaign = campaign_service::create_campaign(&pool, auth.user_id, request).await?;

    Ok((StatusCode::CREATED, Json(campaign.into())))
}

pub async fn get_campaign(
    State(pool): State<DbPool>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<CampaignResponse>, AppError> {
    let campaign = campaign_service::get_campaign(&pool, campaign_id).await?;

    Ok(Json(campaign.into()))
}

/// Partially update a campaign.
///
/// # Response
///
/// - **Success (200 OK)**: the updated campaign
/// - **Error (403)**: Caller is neither the creator nor an admin
/// - **Error (404)**: Campaign not found
pub async fn update_campaign(
    State(pool): State<DbPool>,
    auth: AuthContext,
    Path(campaign_id): Path<Uuid>,
    Json(request): Json<UpdateCampaignRequest>,
) -> Result<Json<CampaignResponse>, AppError> {
    let campaign = campaign_service::update_campaign(&pool, &auth, campaign_id, request).await?;

    Ok(Json(campaign.into()))
}

/// Delete a campaign.
///
/// # Response
///
/// - **Success (204 No Content)**
/// - **Error (409)**: Campaign has donations and must be cancelled instead
pub async fn delete_campaign(
    State(pool): State<DbPool>,
    auth: AuthContext,
    Path(campaign_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    campaign_service::delete_campaign(&pool, &auth, campaign_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Completed donations to a campaign, newest first.
///
/// Anonymous donations are listed without donor id or name.
pub async fn list_donations(
    State(pool): State<DbPool>,
    Path(campaign_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<DonationResponse>>, AppError> {
    let page = campaign_service::list_donations(&pool, campaign_id, params).await?;

    Ok(Json(page.map(Into::into)))
}
