//! Configuration for tuition-service.

use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct TuitionConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl TuitionConfig {
    pub fn from_env() -> Result<Self, AppError> {
        // Common config handles .env and the APP__ prefix.
        let common = core_config::Config::load()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(TuitionConfig {
            common,
            service_name: get_env("SERVICE_NAME", Some("tuition-service"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", 2)?,
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod && default.is_none() {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(val) => val.parse::<T>().map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!(format!("{} must be a valid number", key)))
        }),
        Err(_) => Ok(default),
    }
}
