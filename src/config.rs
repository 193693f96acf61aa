// src/config.rs

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;
use thiserror::Error;

/// Default length of one timed assessment, in seconds.
pub const DEFAULT_ASSESSMENT_DURATION_SECS: u32 = 1800;

/// Candidate tokens live for a working day.
pub const DEFAULT_CANDIDATE_TOKEN_TTL_SECS: u64 = 8 * 60 * 60;

/// Admin tokens live for 24 hours.
pub const DEFAULT_ADMIN_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub port: u16,
    pub assessment_duration_secs: u32,
    pub candidate_token_ttl_secs: u64,
    pub admin_token_ttl_secs: u64,
    pub questions_path: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub cors_origin: Option<String>,
}

/// Raised when the process environment cannot produce a usable `Config`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            rust_log,
            port: parsed("PORT", 5000)?,
            assessment_duration_secs: parsed(
                "ASSESSMENT_DURATION_SECS",
                DEFAULT_ASSESSMENT_DURATION_SECS,
            )?,
            candidate_token_ttl_secs: parsed(
                "CANDIDATE_TOKEN_TTL_SECS",
                DEFAULT_CANDIDATE_TOKEN_TTL_SECS,
            )?,
            admin_token_ttl_secs: parsed("ADMIN_TOKEN_TTL_SECS", DEFAULT_ADMIN_TOKEN_TTL_SECS)?,
            questions_path: env::var("QUESTIONS_PATH")
                .unwrap_or_else(|_| "questions.json".to_string()),
            admin_email: optional("ADMIN_EMAIL"),
            admin_password: optional("ADMIN_PASSWORD"),
            cors_origin: optional("CORS_ORIGIN"),
        })
    }

    /// Configuration used by tests and local tooling that never touches Postgres.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: jwt_secret.to_string(),
            rust_log: "error".to_string(),
            port: 0,
            assessment_duration_secs: DEFAULT_ASSESSMENT_DURATION_SECS,
            candidate_token_ttl_secs: 600,
            admin_token_ttl_secs: 600,
            questions_path: "questions.json".to_string(),
            admin_email: None,
            admin_password: None,
            cors_origin: None,
        }
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn optional(key: &'static str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}
