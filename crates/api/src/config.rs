use pumpwatch_core::error::CoreError;

use crate::auth::jwt::JwtConfig;

/// Default bound of each live session's outbound queue.
pub const DEFAULT_LIVE_SESSION_QUEUE: usize = 64;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Outbound messages buffered per live session before pushes are dropped.
    pub live_session_queue: usize,
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `LIVE_SESSION_QUEUE`   | `64`                       |
    /// | `JWT_SECRET`           | required                   |
    pub fn from_env() -> Result<Self, CoreError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = parse_env("PORT", 3000u16)?;

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = parse_env("REQUEST_TIMEOUT_SECS", 30u64)?;

        let live_session_queue = parse_env("LIVE_SESSION_QUEUE", DEFAULT_LIVE_SESSION_QUEUE)?;
        if live_session_queue == 0 {
            return Err(CoreError::Validation(
                "LIVE_SESSION_QUEUE must be at least 1".into(),
            ));
        }

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            live_session_queue,
            jwt: JwtConfig::from_env()?,
        })
    }
}

pub(crate) fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, CoreError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}
