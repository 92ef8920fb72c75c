//! Itemized statement for a single account with running balances.

use crate::error::LedgerError;
use crate::models::{ConvAmounts, Currency, LedgerAccount, LedgerEntry, LedgerType, Side};
use crate::services::metrics::REPORT_DURATION;
use crate::services::store::{AccountFilter, EntryQuery, LedgerStore};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// One leg touching the account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceLine {
    pub timestamp: DateTime<Utc>,
    pub group_id: String,
    pub short_id: String,
    pub ledger_type: LedgerType,
    pub description: String,
    pub side: Side,
    /// The concrete account, including its sub.
    pub account: LedgerAccount,
    pub amount: Decimal,
    pub unit: Currency,
    pub amount_signed: Decimal,
    pub conv_signed: ConvAmounts,
    /// Running balance in `unit` after this line.
    pub running_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountBalance {
    pub account: LedgerAccount,
    /// `None` means every sub-account of `account`.
    pub sub: Option<String>,
    pub as_of: DateTime<Utc>,
    pub lines: Vec<BalanceLine>,
    /// Signed native totals per unit.
    pub balances: BTreeMap<Currency, Decimal>,
    /// Each native unit's balance in every display currency, summed from the
    /// conversion carried by each of that unit's lines.
    pub converted_by_unit: BTreeMap<Currency, ConvAmounts>,
    /// Totals in each display currency across all units.
    pub converted: BTreeMap<Currency, Decimal>,
    pub conv_total: ConvAmounts,
}

impl AccountBalance {
    pub fn from_entries(
        entries: &[LedgerEntry],
        account: &LedgerAccount,
        sub: Option<&str>,
        as_of: DateTime<Utc>,
    ) -> Self {
        let filter = AccountFilter::for_account(account, sub);
        let mut balances: BTreeMap<Currency, Decimal> = BTreeMap::new();
        let mut converted_by_unit: BTreeMap<Currency, ConvAmounts> = BTreeMap::new();
        let mut lines = Vec::new();

        for entry in entries {
            for leg in entry.legs() {
                if !filter.matches(leg.account) {
                    continue;
                }
                let amount_signed = leg.amount_signed();
                let conv_signed = leg.conv_signed();
                let running = balances.entry(leg.unit).or_default();
                *running += amount_signed;
                *converted_by_unit.entry(leg.unit).or_default() += conv_signed;

                lines.push(BalanceLine {
                    timestamp: entry.timestamp,
                    group_id: entry.group_id.clone(),
                    short_id: entry.short_id.clone(),
                    ledger_type: entry.ledger_type,
                    description: entry.description.clone(),
                    side: leg.side,
                    account: leg.account.clone(),
                    amount: leg.amount,
                    unit: leg.unit,
                    amount_signed,
                    conv_signed,
                    running_balance: *running,
                });
            }
        }

        let conv_total = converted_by_unit
            .values()
            .fold(ConvAmounts::default(), |acc, conv| acc + *conv);
        let converted = Currency::DISPLAY
            .iter()
            .map(|unit| (*unit, conv_total.value_in(*unit)))
            .collect();

        Self {
            account: account.clone(),
            sub: sub.map(str::to_string),
            as_of,
            lines,
            balances,
            converted_by_unit,
            converted,
            conv_total,
        }
    }

    pub fn balance_in(&self, unit: Currency) -> Decimal {
        self.balances.get(&unit).copied().unwrap_or_default()
    }

    pub fn converted_in(&self, unit: Currency) -> Decimal {
        self.conv_total.value_in(unit)
    }

    /// `native`'s balance expressed in `display`.
    pub fn unit_converted_in(&self, native: Currency, display: Currency) -> Decimal {
        self.converted_by_unit
            .get(&native)
            .map(|conv| conv.value_in(display))
            .unwrap_or_default()
    }
}

/// Every leg touching `account` up to `as_of`, oldest first.
///
/// With `sub` set only that sub-account is included; otherwise all subs of
/// the account name are combined.
#[instrument(skip(store, account), fields(account = %account))]
pub async fn account_balance<S>(
    store: &S,
    account: &LedgerAccount,
    sub: Option<&str>,
    as_of: DateTime<Utc>,
) -> Result<AccountBalance, LedgerError>
where
    S: LedgerStore + ?Sized,
{
    let timer = REPORT_DURATION
        .with_label_values(&["account_balance"])
        .start_timer();

    let query = EntryQuery::until(as_of).with_account(AccountFilter::for_account(account, sub));
    let entries = store.fetch_entries(&query).await?;
    let balance = AccountBalance::from_entries(&entries, account, sub, as_of);

    timer.observe_duration();
    info!(lines = balance.lines.len(), "Account balance generated");
    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CryptoConv, LedgerLeg, QuoteResponse};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn quote(hive_usd: Decimal) -> QuoteResponse {
        QuoteResponse {
            hive_usd,
            hbd_usd: dec!(1),
            btc_usd: dec!(100000),
            hive_hbd: hive_usd,
            fetch_date: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            source: "test".to_string(),
            error: None,
        }
    }

    fn transfer(
        id: &str,
        secs: u32,
        debit: LedgerAccount,
        credit: LedgerAccount,
        amount: Decimal,
        hive_usd: Decimal,
    ) -> LedgerEntry {
        let conv = CryptoConv::from_quote(amount, Currency::Hive, &quote(hive_usd)).unwrap();
        LedgerEntry::new(
            id,
            LedgerType::Deposit,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, secs).unwrap(),
            LedgerLeg::new(debit, amount, Currency::Hive, conv.clone()),
            LedgerLeg::new(credit, amount, Currency::Hive, conv),
        )
        .unwrap()
    }

    #[test]
    fn test_running_balance_and_rescaling() {
        let deposits = LedgerAccount::asset("Customer Deposits Hive", "server");
        let alice = LedgerAccount::liability("Customer Liability", "alice");
        let entries = vec![
            transfer("d1", 1, deposits.clone(), alice.clone(), dec!(100), dec!(0.20)),
            transfer("w1", 2, alice.clone(), deposits.clone(), dec!(30), dec!(0.30)),
        ];

        let balance = AccountBalance::from_entries(&entries, &alice, None, Utc::now());
        assert_eq!(balance.lines.len(), 2);
        assert_eq!(balance.lines[0].running_balance, dec!(100));
        assert_eq!(balance.lines[1].running_balance, dec!(70));
        assert_eq!(balance.lines[1].amount_signed, dec!(-30));
        assert_eq!(balance.balance_in(Currency::Hive), dec!(70));
        // 100 HIVE at 0.20 less 30 HIVE at 0.30, each at its own rate.
        assert_eq!(balance.converted_in(Currency::Usd), dec!(11));
        assert_eq!(balance.converted[&Currency::Usd], dec!(11));
        assert_eq!(balance.converted.len(), Currency::DISPLAY.len());
    }

    #[test]
    fn test_sub_filter() {
        let deposits = LedgerAccount::asset("Customer Deposits Hive", "server");
        let alice = LedgerAccount::liability("Customer Liability", "alice");
        let bob = LedgerAccount::liability("Customer Liability", "bob");
        let entries = vec![
            transfer("d1", 1, deposits.clone(), alice.clone(), dec!(100), dec!(0.25)),
            transfer("d2", 2, deposits.clone(), bob, dec!(5), dec!(0.25)),
        ];

        let all = AccountBalance::from_entries(&entries, &alice, None, Utc::now());
        assert_eq!(all.balance_in(Currency::Hive), dec!(105));

        let only_bob = AccountBalance::from_entries(&entries, &alice, Some("bob"), Utc::now());
        assert_eq!(only_bob.lines.len(), 1);
        assert_eq!(only_bob.balance_in(Currency::Hive), dec!(5));
        assert_eq!(only_bob.sub.as_deref(), Some("bob"));
    }

    #[test]
    fn test_each_unit_rescaled_separately() {
        let treasury = LedgerAccount::asset("Treasury", "");
        let owner = LedgerAccount::equity("Owner Loan", "");
        let hive_in = transfer("h1", 1, treasury.clone(), owner.clone(), dec!(100), dec!(0.25));

        // 10_000 sats at 100k USD/BTC is 10 USD.
        let msats = dec!(10000000);
        let conv = CryptoConv::from_quote(msats, Currency::Msats, &quote(dec!(0.25))).unwrap();
        let sats_in = LedgerEntry::new(
            "l1",
            LedgerType::Deposit,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 2).unwrap(),
            LedgerLeg::new(treasury.clone(), msats, Currency::Msats, conv.clone()),
            LedgerLeg::new(owner, msats, Currency::Msats, conv),
        )
        .unwrap();

        let balance = AccountBalance::from_entries(&[hive_in, sats_in], &treasury, None, Utc::now());
        assert_eq!(balance.balances.len(), 2);
        assert_eq!(balance.converted_by_unit.len(), 2);
        assert_eq!(balance.unit_converted_in(Currency::Hive, Currency::Usd), dec!(25));
        assert_eq!(balance.unit_converted_in(Currency::Msats, Currency::Usd), dec!(10));
        assert_eq!(balance.unit_converted_in(Currency::Msats, Currency::Hive), dec!(40));
        assert_eq!(balance.unit_converted_in(Currency::Hbd, Currency::Usd), Decimal::ZERO);
        assert_eq!(balance.converted_in(Currency::Usd), dec!(35));
    }
}
