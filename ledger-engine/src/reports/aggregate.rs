//! Per-account folding of entry legs shared by every report.

use crate::models::{ConvAmounts, Currency, LedgerAccount, LedgerEntry, LegRef};
use crate::services::store::EntryQuery;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Signed totals for one account over a set of entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountTotals {
    pub account: LedgerAccount,
    /// Signed native amounts per unit.
    pub native: BTreeMap<Currency, Decimal>,
    /// Signed historical conversions, each leg valued at its own quote.
    pub conv: ConvAmounts,
    pub entry_count: usize,
}

impl AccountTotals {
    pub fn new(account: LedgerAccount) -> Self {
        Self {
            account,
            native: BTreeMap::new(),
            conv: ConvAmounts::default(),
            entry_count: 0,
        }
    }

    pub fn add_leg(&mut self, leg: &LegRef<'_>) {
        *self.native.entry(leg.unit).or_default() += leg.amount_signed();
        self.conv += leg.conv_signed();
        self.entry_count += 1;
    }

    pub fn native_in(&self, unit: Currency) -> Decimal {
        self.native.get(&unit).copied().unwrap_or_default()
    }
}

/// Scan window ending at `as_of`, reaching back `age` when given.
pub fn report_query(as_of: DateTime<Utc>, age: Option<Duration>) -> EntryQuery {
    EntryQuery::until(as_of).since(age.map(|age| as_of - age))
}

/// Fold every leg accepted by `keep` into per-account totals, ordered by account.
///
/// Accounts are keyed by type, name and sub. The contra flag does not split a
/// line; the line is shown as contra when any of its legs is.
pub fn aggregate_legs<F>(entries: &[LedgerEntry], mut keep: F) -> BTreeMap<LedgerAccount, AccountTotals>
where
    F: FnMut(&LegRef<'_>) -> bool,
{
    let mut totals: BTreeMap<LedgerAccount, AccountTotals> = BTreeMap::new();
    for entry in entries {
        for leg in entry.legs() {
            if !keep(&leg) {
                continue;
            }
            let key = leg.account.clone().without_contra();
            let account_totals = totals
                .entry(key.clone())
                .or_insert_with(|| AccountTotals::new(key));
            if leg.account.is_contra() && !account_totals.account.is_contra() {
                account_totals.account = leg.account.clone();
            }
            account_totals.add_leg(&leg);
        }
    }
    totals
}

/// Sum native maps unit by unit, `rhs` scaled by `factor`.
pub fn merge_native(
    into: &mut BTreeMap<Currency, Decimal>,
    rhs: &BTreeMap<Currency, Decimal>,
    factor: Decimal,
) {
    for (unit, amount) in rhs {
        *into.entry(*unit).or_default() += *amount * factor;
    }
}
