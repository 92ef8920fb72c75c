//! Storage, pricing and metrics services.

pub mod database;
pub mod ledger;
pub mod memory;
pub mod metrics;
pub mod pricing;
pub mod store;

pub use database::LedgerDb;
pub use ledger::{list_accounts, reverse_entry};
pub use memory::MemoryLedgerStore;
pub use metrics::{get_metrics, init_metrics};
pub use pricing::{FixedQuoteProvider, PricingContext, QuoteProvider};
pub use store::{AccountFilter, EntryQuery, LedgerStore};
