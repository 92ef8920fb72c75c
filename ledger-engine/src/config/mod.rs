//! Configuration module for ledger-engine.

use crate::models::{AbsTolerance, ToleranceConfig};
use rust_decimal::Decimal;
use service_core::config::{self as core_config, get_env, parse_env};
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub tolerance: ToleranceConfig,
    /// Quotes older than this are refetched before building new entries.
    pub quote_max_age_secs: i64,
    /// Reports cover this many days back from now when set.
    pub report_age_days: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = common.is_prod();

        let mongodb = MongoConfig {
            uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
            database: get_env("MONGODB_DATABASE", Some("ledger_dev"), is_prod)?,
            collection: env::var("LEDGER_COLLECTION").unwrap_or_else(|_| "ledger".to_string()),
        };

        let defaults = ToleranceConfig::default();
        let tolerance = ToleranceConfig {
            rel_tol: parse_env("LEDGER_REL_TOL", defaults.rel_tol)?,
            abs_tol: AbsTolerance {
                hive: parse_env("LEDGER_ABS_TOL_HIVE", defaults.abs_tol.hive)?,
                hbd: parse_env("LEDGER_ABS_TOL_HBD", defaults.abs_tol.hbd)?,
                usd: parse_env("LEDGER_ABS_TOL_USD", defaults.abs_tol.usd)?,
                btc: parse_env("LEDGER_ABS_TOL_BTC", defaults.abs_tol.btc)?,
                sats: parse_env("LEDGER_ABS_TOL_SATS", defaults.abs_tol.sats)?,
                msats: parse_env("LEDGER_ABS_TOL_MSATS", defaults.abs_tol.msats)?,
            },
            msats_balance_tol: parse_env("LEDGER_MSATS_TOL", defaults.msats_balance_tol)?,
            balance_sheet_rel_tol: parse_env(
                "LEDGER_BALANCE_SHEET_REL_TOL",
                defaults.balance_sheet_rel_tol,
            )?,
        };
        validate_tolerance(&tolerance)?;

        let report_age_days = match env::var("REPORT_AGE_DAYS") {
            Ok(_) => Some(parse_env("REPORT_AGE_DAYS", 0_i64)?),
            Err(_) => None,
        };

        Ok(Self {
            common,
            mongodb,
            tolerance,
            quote_max_age_secs: parse_env("QUOTE_MAX_AGE_SECS", 600)?,
            report_age_days,
        })
    }

    pub fn quote_max_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.quote_max_age_secs)
    }

    pub fn report_age(&self) -> Option<chrono::Duration> {
        self.report_age_days
            .filter(|days| *days > 0)
            .map(chrono::Duration::days)
    }
}

fn validate_tolerance(tolerance: &ToleranceConfig) -> Result<(), AppError> {
    for (key, value) in [
        ("LEDGER_REL_TOL", tolerance.rel_tol),
        ("LEDGER_MSATS_TOL", tolerance.msats_balance_tol),
        ("LEDGER_BALANCE_SHEET_REL_TOL", tolerance.balance_sheet_rel_tol),
        ("LEDGER_ABS_TOL_HIVE", tolerance.abs_tol.hive),
        ("LEDGER_ABS_TOL_HBD", tolerance.abs_tol.hbd),
        ("LEDGER_ABS_TOL_USD", tolerance.abs_tol.usd),
        ("LEDGER_ABS_TOL_BTC", tolerance.abs_tol.btc),
        ("LEDGER_ABS_TOL_SATS", tolerance.abs_tol.sats),
        ("LEDGER_ABS_TOL_MSATS", tolerance.abs_tol.msats),
    ] {
        if value < Decimal::ZERO {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "{} must not be negative: {}",
                key,
                value
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serial_test::serial;

    const KEYS: [&str; 12] = [
        "MONGODB_URI",
        "LEDGER_COLLECTION",
        "LEDGER_MSATS_TOL",
        "LEDGER_REL_TOL",
        "LEDGER_ABS_TOL_HIVE",
        "LEDGER_ABS_TOL_HBD",
        "LEDGER_ABS_TOL_USD",
        "LEDGER_ABS_TOL_BTC",
        "LEDGER_ABS_TOL_SATS",
        "LEDGER_ABS_TOL_MSATS",
        "REPORT_AGE_DAYS",
        "QUOTE_MAX_AGE_SECS",
    ];

    fn clear() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();
        let config = LedgerConfig::from_env().unwrap();
        assert_eq!(config.mongodb.uri, "mongodb://localhost:27017");
        assert_eq!(config.mongodb.collection, "ledger");
        assert_eq!(config.tolerance, ToleranceConfig::default());
        assert_eq!(config.quote_max_age_secs, 600);
        assert!(config.report_age().is_none());
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear();
        env::set_var("LEDGER_COLLECTION", "ledger_test");
        env::set_var("LEDGER_MSATS_TOL", "25");
        env::set_var("REPORT_AGE_DAYS", "30");
        let config = LedgerConfig::from_env().unwrap();
        assert_eq!(config.mongodb.collection, "ledger_test");
        assert_eq!(config.tolerance.msats_balance_tol, dec!(25));
        assert_eq!(config.report_age(), Some(chrono::Duration::days(30)));
        clear();
    }

    #[test]
    #[serial]
    fn test_every_absolute_tolerance_is_configurable() {
        clear();
        env::set_var("LEDGER_ABS_TOL_HIVE", "0.5");
        env::set_var("LEDGER_ABS_TOL_HBD", "0.25");
        env::set_var("LEDGER_ABS_TOL_BTC", "0.0000002");
        env::set_var("LEDGER_ABS_TOL_SATS", "3");
        let config = LedgerConfig::from_env().unwrap();
        let abs = &config.tolerance.abs_tol;
        assert_eq!(abs.hive, dec!(0.5));
        assert_eq!(abs.hbd, dec!(0.25));
        assert_eq!(abs.btc, dec!(0.0000002));
        assert_eq!(abs.sats, dec!(3));
        assert_eq!(abs.usd, AbsTolerance::default().usd);
        assert_eq!(abs.msats, AbsTolerance::default().msats);

        env::set_var("LEDGER_ABS_TOL_SATS", "-1");
        assert!(LedgerConfig::from_env().is_err());
        clear();
    }

    #[test]
    #[serial]
    fn test_rejects_bad_values() {
        clear();
        env::set_var("LEDGER_REL_TOL", "-0.5");
        assert!(LedgerConfig::from_env().is_err());
        env::set_var("LEDGER_REL_TOL", "abc");
        assert!(LedgerConfig::from_env().is_err());
        clear();
    }
}
