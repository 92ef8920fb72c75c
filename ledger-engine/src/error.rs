//! Error taxonomy for the ledger core.

use service_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed input caught while building an entry; never persisted.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The entry failed its completeness check and was not written.
    #[error("Ledger entry {group_id} is not completed: {reason}")]
    NotCompleted { group_id: String, reason: String },

    /// Another entry already owns this `group_id`.
    #[error("Duplicate ledger entry: {group_id}")]
    Duplicate { group_id: String },

    #[error("Ledger entry not found: {group_id}")]
    NotFound { group_id: String },

    #[error("Quote unavailable: {0}")]
    Quote(String),

    #[error("Persistence error: {0}")]
    Persistence(anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(anyhow::Error),
}

impl LedgerError {
    /// Label used on the `ledger_errors_total` metric.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation",
            LedgerError::NotCompleted { .. } => "not_completed",
            LedgerError::Duplicate { .. } => "duplicate",
            LedgerError::NotFound { .. } => "not_found",
            LedgerError::Quote(_) => "quote",
            LedgerError::Persistence(_) => "persistence",
            LedgerError::Config(_) => "config",
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, LedgerError::Duplicate { .. })
    }
}

impl From<mongodb::error::Error> for LedgerError {
    fn from(err: mongodb::error::Error) -> Self {
        LedgerError::Persistence(anyhow::Error::new(err))
    }
}

impl From<mongodb::bson::ser::Error> for LedgerError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        LedgerError::Persistence(anyhow::Error::new(err))
    }
}

impl From<mongodb::bson::de::Error> for LedgerError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        LedgerError::Persistence(anyhow::Error::new(err))
    }
}

impl From<AppError> for LedgerError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::BadRequest(e) => LedgerError::Validation(e.to_string()),
            AppError::ConfigError(e) => LedgerError::Config(e),
            AppError::DatabaseError(e) | AppError::InternalError(e) => {
                LedgerError::Persistence(e)
            }
            AppError::NotFound(e) => LedgerError::NotFound {
                group_id: e.to_string(),
            },
            AppError::Conflict(e) => LedgerError::Duplicate {
                group_id: e.to_string(),
            },
        }
    }
}
