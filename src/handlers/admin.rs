//! Admin-only HTTP handlers.
//!
//! - GET /api/v1/admin/reconcile - Report campaign counter drift
//! - POST /api/v1/admin/reconcile - Report and repair drift

use axum::{Json, extract::State};

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    services::reconciliation_service::{self, ReconcileReport},
};

/// Dry-run reconciliation.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "campaigns_checked": 12,
///   "discrepancies": [
///     {
///       "campaign_id": "...",
///       "cached_amount_cents": 1000,
///       "actual_amount_cents": 3500,
///       "cached_donor_count": 1,
///       "actual_donor_count": 2,
///       "amount_drift_cents": 2500
///     }
///   ],
///   "applied": false,
///   "checked_at": "2025-12-21T19:00:00Z"
/// }
/// ```
pub async fn reconcile_preview(
    State(pool): State<DbPool>,
    auth: AuthContext,
) -> Result<Json<ReconcileReport>, AppError> {
    auth.require_admin()?;

    let report = reconciliation_service::reconcile(&pool, false).await?;

    Ok(Json(report))
}

/// Reconcile and rewrite drifted counters.
pub async fn reconcile_apply(
    State(pool): State<DbPool>,
    auth: AuthContext,
) -> Result<Json<ReconcileReport>, AppError> {
    auth.require_admin()?;

    let report = reconciliation_service::reconcile(&pool, true).await?;

    tracing::info!(
        admin_id = %auth.user_id,
        repaired = report.discrepancies.len(),
        "manual reconciliation"
    );

    Ok(Json(report))
}
