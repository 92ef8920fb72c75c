//! Ledger Engine - double-entry accounting for Hive and Lightning treasury flows.

pub mod config;
pub mod error;
pub mod models;
pub mod reports;
pub mod services;

pub use error::LedgerError;
