use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Unset means the in-memory store is used.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_apply_schema: bool,
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", 10)?,
            db_apply_schema: parse_env("DB_APPLY_SCHEMA", true)?,
            jwt_secret: require_env("JWT_SECRET")?,
            jwt_ttl_secs: parse_env("JWT_TTL_SECS", 86_400)?,
            port: parse_env("PORT", 5000)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
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
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_falls_back_to_default() {
        let port: u16 = parse_env("RESUME_API_TEST_UNSET_PORT", 5000).unwrap();
        assert_eq!(port, 5000);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("RESUME_API_TEST_BAD_PORT", "not-a-port");
        let result: Result<u16> = parse_env("RESUME_API_TEST_BAD_PORT", 5000);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_env_bool() {
        std::env::set_var("RESUME_API_TEST_APPLY", "false");
        let apply: bool = parse_env("RESUME_API_TEST_APPLY", true).unwrap();
        assert!(!apply);
    }
}
