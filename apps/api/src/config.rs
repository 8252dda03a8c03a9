use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
///
/// Only a handful of settings are required. Missing collaborators degrade the
/// service instead of aborting startup: no `DATABASE_URL` selects the in-memory
/// store, no `JWT_SECRET` leaves identity unconfigured (routes answer 503), and
/// no S3 settings keep photos on local disk.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub token_ttl_hours: i64,
    pub anthropic_api_key: Option<String>,
    pub s3: Option<S3Config>,
    pub upload_dir: String,
    pub recommendation_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            jwt_secret: optional_env("JWT_SECRET"),
            token_ttl_hours: parse_env("TOKEN_TTL_HOURS", 168)?,
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            s3: S3Config::from_env()?,
            upload_dir: optional_env("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()),
            recommendation_timeout_secs: parse_env("RECOMMENDATION_TIMEOUT_SECS", 15)?,
            port: parse_env("PORT", 3001)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl S3Config {
    /// S3 storage is all-or-nothing: `S3_BUCKET` switches it on, after which the
    /// endpoint and credentials become mandatory.
    fn from_env() -> Result<Option<Self>> {
        let Some(bucket) = optional_env("S3_BUCKET") else {
            return Ok(None);
        };

        Ok(Some(S3Config {
            bucket,
            endpoint: require_env("S3_ENDPOINT")?,
            access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
        }))
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
