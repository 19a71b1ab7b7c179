//! Application configuration management.
//!
//! Configuration comes from environment variables (and an optional `.env`
//! file). The `envy` crate deserializes them into a type-safe struct, so
//! `database_url` is read from `DATABASE_URL`, `jwt_secret` from `JWT_SECRET`
//! and so on.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `JWT_SECRET` (required): HS256 signing secret for access tokens
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `JWT_TTL_HOURS` (optional): token lifetime, 1..=8760, defaults to 24
/// - `AUTH_ENABLED` (optional): set to `false` to skip token verification
///   while debugging, defaults to `true`
/// - `RECONCILE_INTERVAL_SECS` (optional): campaign total reconciliation
///   period, `0` disables it, defaults to 300
/// - `CORS_ALLOWED_ORIGIN` (optional): frontend origin; any origin is
///   allowed when unset
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    pub jwt_secret: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_jwt_ttl_hours")]
    pub jwt_ttl_hours: i64,

    #[serde(default = "default_auth_enabled")]
    pub auth_enabled: bool,

    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,

    #[serde(default)]
    pub cors_allowed_origin: Option<String>,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

/// One year.
pub const MAX_JWT_TTL_HOURS: i64 = 24 * 365;

fn default_jwt_ttl_hours() -> i64 {
    24
}

fn default_auth_enabled() -> bool {
    true
}

fn default_reconcile_interval() -> u64 {
    300
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (`DATABASE_URL`, `JWT_SECRET`)
    /// - Environment variable values cannot be parsed into expected types
    /// - `JWT_TTL_HOURS` is outside `1..=MAX_JWT_TTL_HOURS`
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()?.validated()
    }

    /// Range checks serde cannot express.
    fn validated(self) -> Result<Self, envy::Error> {
        if !(1..=MAX_JWT_TTL_HOURS).contains(&self.jwt_ttl_hours) {
            return Err(envy::Error::Custom(format!(
                "JWT_TTL_HOURS must be between 1 and {MAX_JWT_TTL_HOURS}, got {}",
                self.jwt_ttl_hours
            )));
        }
        Ok(self)
    }

    /// Base URL of the locally running server, used by the `check` command.
    pub fn local_base_url(&self) -> String {
        format!("http://localhost:{}", self.server_port)
    }
}
