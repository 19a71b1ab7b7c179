//! Transaction HTTP handlers.
//!
//! This module implements transaction-related API endpoints:
//! - POST /api/v1/transactions - Donate to a campaign
//! - GET /api/v1/transactions/{id} - Get transaction details
//! - POST /api/v1/transactions/{id}/refund - Refund a donation

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::transaction::{DonationRequest, TransactionResponse},
    services::transaction_service,
};

/// Donate to a campaign as the authenticated user.
///
/// # Request Body
///
/// ```json
/// {
///   "campaign_id": "550e8400-...",
///   "amount_cents": 2500,
///   "message": "Good luck!",
///   "is_anonymous": false,
///   "idempotency_key": "checkout-7f3a"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the transaction (or the earlier one for a
///   repeated idempotency key)
/// - **Error (400)**: Amount not positive, message too long
/// - **Error (404)**: Campaign not found
/// - **Error (422)**: Campaign is not accepting donations
pub async fn create_donation(
    State(pool): State<DbPool>,
    auth: AuthContext,
    Json(request): Json<DonationRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let transaction = transaction_service::donate(&pool, auth.user_id, request).await?;

    Ok((StatusCode::CREATED, Json(transaction.into())))
}

/// Get transaction by ID.
///
/// # Security
///
/// Returns 404 unless the caller is the donor, the campaign's creator, or
/// an admin.
pub async fn get_transaction(
    State(pool): State<DbPool>,
    auth: AuthContext,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<TransactionResponse>, AppError> {
    let transaction = transaction_service::get_transaction(&pool, &auth, transaction_id).await?;

    Ok(Json(transaction.into()))
}

/// Refund a completed donation.
///
/// # Response
///
/// - **Success (200 OK)**: the transaction with status `refunded`
/// - **Error (403)**: Caller is the donor but not the creator or an admin
/// - **Error (409)**: Transaction was already refunded
pub async fn refund_transaction(
    State(pool): State<DbPool>,
    auth: AuthContext,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<TransactionResponse>, AppError> {
    let transaction = transaction_service::refund(&pool, &auth, transaction_id).await?;

    Ok(Json(transaction.into()))
}
