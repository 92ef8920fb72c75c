use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_service_name() -> String {
    "ledger-engine".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn is_prod(&self) -> bool {
        self.environment == "prod"
    }
}

/// Read an environment variable, falling back to `default` outside production.
pub fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

/// Parse an environment variable, falling back to `default` when unset.
pub fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!("{} has an invalid value: {}", key, raw))
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_get_env_default_outside_prod() {
        unsafe { env::remove_var("SERVICE_CORE_TEST_MISSING") };
        let value = get_env("SERVICE_CORE_TEST_MISSING", Some("fallback"), false).unwrap();
        assert_eq!(value, "fallback");
    }

    #[test]
    #[serial]
    fn test_get_env_required_in_prod() {
        unsafe { env::remove_var("SERVICE_CORE_TEST_MISSING") };
        let result = get_env("SERVICE_CORE_TEST_MISSING", Some("fallback"), true);
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    #[serial]
    fn test_parse_env_rejects_garbage() {
        unsafe { env::set_var("SERVICE_CORE_TEST_NUMBER", "twelve") };
        let result = parse_env::<u64>("SERVICE_CORE_TEST_NUMBER", 5);
        assert!(result.is_err());

        unsafe { env::set_var("SERVICE_CORE_TEST_NUMBER", " 12 ") };
        assert_eq!(parse_env::<u64>("SERVICE_CORE_TEST_NUMBER", 5).unwrap(), 12);

        unsafe { env::remove_var("SERVICE_CORE_TEST_NUMBER") };
        assert_eq!(parse_env::<u64>("SERVICE_CORE_TEST_NUMBER", 5).unwrap(), 5);
    }
}
