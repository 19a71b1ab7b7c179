//! `GET /health`, polled by load balancers and by `crowdfund check`.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db::{self, DbPool},
    error::AppError,
};

/// Body of a healthy response.
///
/// `crowdfund check` parses the same struct from the server it checks.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `healthy`; an unhealthy server answers with an error body
    pub status: String,

    /// `connected` once `SELECT 1` succeeded
    pub database: String,

    pub timestamp: DateTime<Utc>,
}

/// Report liveness after a round trip to Postgres.
///
/// ```json
/// { "status": "healthy", "database": "connected", "timestamp": "2026-03-01T12:00:00Z" }
/// ```
///
/// A failed ping surfaces as the usual 500 `internal_error` body, which
/// `check` reports as a server failure.
pub async fn health_check(State(pool): State<DbPool>) -> Result<Json<HealthResponse>, AppError> {
    db::ping(&pool).await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        database: "connected".to_string(),
        timestamp: Utc::now(),
    }))
}
