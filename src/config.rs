use std::env;
use std::time::Duration;

use crate::error::AppError;
use crate::security::authorization::AuthorizationMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Credentials for the admin record seeded at startup.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub cors_origin: String,
    pub store_timeout: Duration,
    pub event_buffer_size: usize,
    pub authorization_mode: AuthorizationMode,
    pub admin_seed: Option<AdminSeed>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let store_timeout_secs: u64 = parse_or_default("STORE_TIMEOUT_SECS", 10)?;
        if store_timeout_secs == 0 {
            return Err(AppError::Internal(
                "invalid STORE_TIMEOUT_SECS: must be > 0".to_string(),
            ));
        }

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 8001)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: parse_or_default("LOG_FORMAT", LogFormat::Compact)?,
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            store_timeout: Duration::from_secs(store_timeout_secs),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            authorization_mode: parse_or_default(
                "AUTHORIZATION_MODE",
                AuthorizationMode::Permissive,
            )?,
            admin_seed: admin_seed_from_env(),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8001,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            cors_origin: "http://localhost:3000".to_string(),
            store_timeout: Duration::from_secs(10),
            event_buffer_size: 1024,
            authorization_mode: AuthorizationMode::Permissive,
            admin_seed: None,
        }
    }
}

fn admin_seed_from_env() -> Option<AdminSeed> {
    let email = env::var("ADMIN_EMAIL").ok().filter(|v| !v.is_empty())?;
    let password = env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty())?;

    Some(AdminSeed {
        name: env::var("ADMIN_NAME").unwrap_or_else(|_| "admin".to_string()),
        email,
        password,
    })
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
