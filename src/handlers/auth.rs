//! Registration, login and current-user HTTP handlers.
//!
//! - POST /api/v1/auth/register - Create a user and return a token
//! - POST /api/v1/auth/login - Exchange credentials for a token
//! - GET /api/v1/auth/me - Profile of the authenticated user

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    db::DbPool,
    error::{AppError, is_unique_violation},
    middleware::auth::AuthContext,
    models::user::{AuthResponse, LoginRequest, RegisterRequest, User, UserResponse},
    services::auth_service::{self, JwtKeys},
    validation,
};

/// Register a new user.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Ada Lovelace",
///   "email": "ada@example.com",
///   "password": "correct horse battery"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: `{ "token": "...", "user": {...} }`
/// - **Error (400)**: Invalid name, email, or password
/// - **Error (409)**: Email already registered
pub async fn register(
    State(pool): State<DbPool>,
    State(jwt): State<Arc<JwtKeys>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let name = validation::name(&request.name)?;
    let email = validation::email(&request.email)?;
    validation::password(&request.password)?;

    let password_hash = auth_service::hash_password(request.password).await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(&email)
    .bind(password_hash)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::EmailTaken
        } else {
            AppError::Database(e)
        }
    })?;

    tracing::info!(user_id = %user.id, "user registered");

    let token = jwt.issue(user.id, user.role())?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// Log in with email and password.
///
/// # Response
///
/// - **Success (200 OK)**: `{ "token": "...", "user": {...} }`
/// - **Error (401)**: Unknown email or wrong password (same error for both)
pub async fn login(
    State(pool): State<DbPool>,
    State(jwt): State<Arc<JwtKeys>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = request.email.trim().to_lowercase();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&pool)
        .await?;

    // Unknown emails still pay for one Argon2 verification
    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let valid = auth_service::verify_password(request.password, stored_hash).await?;

    let user = match user {
        Some(user) if valid => user,
        Some(user) => {
            tracing::debug!(user_id = %user.id, "login with wrong password");
            return Err(AppError::InvalidCredentials);
        }
        None => return Err(AppError::InvalidCredentials),
    };

    let token = jwt.issue(user.id, user.role())?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// Profile of the authenticated user.
///
/// Returns 404 when the token names a user that no longer exists (possible
/// with unverified tokens while auth is disabled).
pub async fn me(
    State(pool): State<DbPool>,
    auth: AuthContext,
) -> Result<Json<UserResponse>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth.user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::UserNotFound)?;

    Ok(Json(user.into()))
}
