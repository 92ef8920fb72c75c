//! Domain models for the ledger engine.

mod account;
mod conv;
mod entry;
mod ledger_type;
mod tolerance;

pub use account::{AccountDetails, AccountType, LedgerAccount, Side};
pub use conv::{
    parse_amount, parse_amount_with_unit, ConvAmounts, CryptoConv, Currency, QuoteResponse,
    MSATS_PER_SAT, SATS_PER_BTC,
};
pub use entry::{short_id_for, LedgerEntry, LedgerLeg, LegRef};
pub use ledger_type::LedgerType;
pub use tolerance::{isclose, AbsTolerance, ToleranceConfig};
