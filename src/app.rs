//! HTTP router assembly.
//!
//! Public routes (browsing campaigns, registration, login) are merged with
//! protected routes that sit behind the bearer token middleware. CORS lets
//! the single-page frontend call the API from its own origin.

use anyhow::Context;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::Config, handlers, middleware, state::AppState};

/// CORS policy: a single configured origin, or any origin when unset.
fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let Some(origin) = &config.cors_allowed_origin else {
        return Ok(CorsLayer::permissive());
    };

    let origin: HeaderValue = origin
        .parse()
        .with_context(|| format!("invalid CORS_ALLOWED_ORIGIN: {origin}"))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}

/// Build the application router.
///
/// # Errors
///
/// Fails when `CORS_ALLOWED_ORIGIN` is not a valid header value.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors = cors_layer(&state.config)?;

    let authenticated_routes = Router::new()
        .route("/api/v1/auth/me", get(handlers::auth::me))
        // Own profile
        .route("/api/v1/users/me", put(handlers::users::update_me))
        .route(
            "/api/v1/users/me/campaigns",
            get(handlers::users::my_campaigns),
        )
        .route(
            "/api/v1/users/me/transactions",
            get(handlers::users::my_transactions),
        )
        // Campaign management
        .route(
            "/api/v1/campaigns",
            post(handlers::campaigns::create_campaign),
        )
        .route(
            "/api/v1/campaigns/{id}",
            put(handlers::campaigns::update_campaign).delete(handlers::campaigns::delete_campaign),
        )
        // Donations
        .route(
            "/api/v1/transactions",
            post(handlers::transactions::create_donation),
        )
        .route(
            "/api/v1/transactions/{id}",
            get(handlers::transactions::get_transaction),
        )
        .route(
            "/api/v1/transactions/{id}/refund",
            post(handlers::transactions::refund_transaction),
        )
        // Admin
        .route(
            "/api/v1/admin/reconcile",
            get(handlers::admin::reconcile_preview).post(handlers::admin::reconcile_apply),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/users/{id}", get(handlers::users::get_user))
        .route("/api/v1/campaigns", get(handlers::campaigns::list_campaigns))
        .route(
            "/api/v1/campaigns/{id}",
            get(handlers::campaigns::get_campaign),
        )
        .route(
            "/api/v1/campaigns/{id}/donations",
            get(handlers::campaigns::list_donations),
        )
        .merge(authenticated_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::user::Role, services::auth_service::JwtKeys};
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{Value, json};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "router-test-secret";

    fn test_config(auth_enabled: bool, cors_allowed_origin: Option<&str>) -> Config {
        Config {
            database_url: "postgres://postgres@localhost/crowdfund_test".to_string(),
            jwt_secret: SECRET.to_string(),
            server_port: 3000,
            database_max_connections: 1,
            jwt_ttl_hours: 1,
            auth_enabled,
            reconcile_interval_secs: 0,
            cors_allowed_origin: cors_allowed_origin.map(str::to_string),
        }
    }

    /// Router over a pool that never connects; every request in these tests
    /// is decided before a query would run.
    fn app_with(config: Config) -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        build_router(AppState::new(pool, config)).unwrap()
    }

    fn app() -> Router {
        app_with(test_config(true, None))
    }

    fn token(role: Role) -> String {
        JwtKeys::new(SECRET, 1, true)
            .issue(Uuid::new_v4(), role)
            .unwrap()
    }

    fn json_request(method: Method, uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn error_code(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        body["error"]["code"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn test_invalid_cors_origin_fails_router_build() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://postgres@localhost/crowdfund_test")
            .unwrap();
        let state = AppState::new(pool, test_config(true, Some("bad\norigin")));
        assert!(build_router(state).is_err());
    }

    #[tokio::test]
    async fn test_create_campaign_requires_token() {
        let response = app()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/campaigns",
                None,
                json!({"title": "Garden", "goal_cents": 1000}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(response).await, "unauthorized");
    }

    #[tokio::test]
    async fn test_me_rejects_forged_token() {
        let forged = JwtKeys::new("other-secret", 1, true)
            .issue(Uuid::new_v4(), Role::Admin)
            .unwrap();

        let response = app()
            .oneshot(json_request(
                Method::GET,
                "/api/v1/auth/me",
                Some(&forged),
                json!({}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_email() {
        let response = app()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                json!({"name": "Ada", "email": "not-an-email", "password": "long enough"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "invalid_request");
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let response = app()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                json!({"name": "Ada", "email": "ada@example.com", "password": "short"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_campaign_validates_goal() {
        let response = app()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/campaigns",
                Some(&token(Role::User)),
                json!({"title": "Garden", "goal_cents": 0}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_donation_validates_amount() {
        let response = app()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/transactions",
                Some(&token(Role::User)),
                json!({"campaign_id": Uuid::new_v4(), "amount_cents": -100}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reconcile_is_admin_only() {
        for method in [Method::GET, Method::POST] {
            let response = app()
                .oneshot(json_request(
                    method,
                    "/api/v1/admin/reconcile",
                    Some(&token(Role::User)),
                    json!({}),
                ))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::FORBIDDEN);
            assert_eq!(error_code(response).await, "forbidden");
        }
    }

    #[tokio::test]
    async fn test_list_campaigns_rejects_unknown_status() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/campaigns?status=paused")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_uuid_campaign_id_is_bad_request() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/campaigns/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_debug_mode_accepts_foreign_token() {
        let foreign = JwtKeys::new("other-secret", 1, true)
            .issue(Uuid::new_v4(), Role::User)
            .unwrap();

        // Gets past auth and fails validation instead
        let response = app_with(test_config(false, None))
            .oneshot(json_request(
                Method::POST,
                "/api/v1/campaigns",
                Some(&foreign),
                json!({"title": "x", "goal_cents": 1000}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cors_preflight_for_configured_origin() {
        let response = app_with(test_config(true, Some("http://localhost:5173")))
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/v1/campaigns")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
    }
}
