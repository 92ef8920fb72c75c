//! Financial reports computed in-process from ledger entries.

pub mod account_balance;
pub mod aggregate;
pub mod balance_sheet;
pub mod limits;
pub mod printout;
pub mod profit_loss;

pub use account_balance::{account_balance, AccountBalance, BalanceLine};
pub use aggregate::AccountTotals;
pub use balance_sheet::{generate_balance_sheet, AccountLine, BalanceSheet, Section, SpotRates};
pub use limits::{conversion_limits, ConversionLimits, LimitWindow, WindowUsage};
pub use profit_loss::{generate_profit_and_loss, ProfitAndLoss};
