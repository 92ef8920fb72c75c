//! Balance sheet with spot-rate translation and a CTA plug.
//!
//! Asset, liability and equity accounts are shown at today's rates. Retained
//! earnings stay at historical USD, and the translation difference between
//! the two is booked to a cumulative translation adjustment line so that
//! `assets == liabilities + equity` holds.

use super::aggregate::{aggregate_legs, merge_native, report_query, AccountTotals};
use crate::error::LedgerError;
use crate::models::{
    isclose, AccountType, ConvAmounts, CryptoConv, Currency, LedgerAccount, LedgerEntry,
    ToleranceConfig,
};
use crate::services::metrics::REPORT_DURATION;
use crate::services::store::LedgerStore;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

pub const RETAINED_EARNINGS: &str = "Retained Earnings";
pub const CTA: &str = "CTA";

/// USD per unit, read off a single conversion snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SpotRates {
    pub hive_usd: Decimal,
    pub hbd_usd: Decimal,
    pub btc_usd: Decimal,
    pub sats_usd: Decimal,
    pub msats_usd: Decimal,
}

fn ratio(usd: Decimal, units: Decimal) -> Decimal {
    if units.is_zero() {
        Decimal::ZERO
    } else {
        usd / units
    }
}

impl SpotRates {
    pub fn from_conv(conv: &CryptoConv) -> Self {
        Self {
            hive_usd: ratio(conv.usd, conv.hive),
            hbd_usd: ratio(conv.usd, conv.hbd),
            btc_usd: ratio(conv.usd, conv.btc),
            sats_usd: ratio(conv.usd, conv.sats),
            msats_usd: ratio(conv.usd, conv.msats),
        }
    }

    /// Rates implied by the newest entry in `entries` (its debit conversion).
    pub fn latest(entries: &[LedgerEntry]) -> Self {
        entries
            .iter()
            .max_by_key(|e| e.timestamp)
            .map(|e| Self::from_conv(&e.debit_conv))
            .unwrap_or_default()
    }

    pub fn usd_per_unit(&self, unit: Currency) -> Decimal {
        match unit {
            Currency::Usd => Decimal::ONE,
            Currency::Hive => self.hive_usd,
            Currency::Hbd => self.hbd_usd,
            Currency::Btc => self.btc_usd,
            Currency::Sats => self.sats_usd,
            Currency::Msats => self.msats_usd,
        }
    }

    /// USD value of a set of native balances.
    pub fn translate(&self, native: &BTreeMap<Currency, Decimal>) -> Decimal {
        native
            .iter()
            .map(|(unit, amount)| *amount * self.usd_per_unit(*unit))
            .sum()
    }
}

/// One account on the sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountLine {
    pub account: LedgerAccount,
    pub native: BTreeMap<Currency, Decimal>,
    /// Signed sum of each leg's own conversion.
    pub historical: ConvAmounts,
    /// Native balances valued at spot.
    pub translated_usd: Decimal,
}

impl AccountLine {
    fn translated(totals: AccountTotals, rates: &SpotRates) -> Self {
        let translated_usd = rates.translate(&totals.native);
        Self {
            account: totals.account,
            native: totals.native,
            historical: totals.conv,
            translated_usd,
        }
    }

    pub fn translation_delta(&self) -> Decimal {
        self.translated_usd - self.historical.usd
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Section {
    pub lines: Vec<AccountLine>,
    pub total_usd: Decimal,
    pub total_historical: ConvAmounts,
}

impl Section {
    fn push(&mut self, line: AccountLine) {
        self.total_usd += line.translated_usd;
        self.total_historical += line.historical;
        self.lines.push(line);
    }

    fn translation_delta(&self) -> Decimal {
        self.lines.iter().map(AccountLine::translation_delta).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceSheet {
    pub as_of: DateTime<Utc>,
    /// Start of the scan window when an age was given.
    pub start: Option<DateTime<Utc>>,
    pub entry_count: usize,
    pub spot_rates: SpotRates,
    pub assets: Section,
    pub liabilities: Section,
    /// Equity accounts plus the retained earnings and CTA lines.
    pub equity: Section,
    /// Revenue less expenses at historical rates.
    pub retained_earnings: ConvAmounts,
    pub cta: Decimal,
    pub total_liabilities_and_equity: Decimal,
    pub is_balanced: bool,
    /// `assets - (liabilities + equity)` in USD.
    pub discrepancy: Decimal,
}

impl BalanceSheet {
    /// Build the sheet from entries already narrowed to the reporting window.
    pub fn from_entries(
        entries: &[LedgerEntry],
        as_of: DateTime<Utc>,
        age: Option<Duration>,
        tolerance: &ToleranceConfig,
    ) -> Self {
        let spot_rates = SpotRates::latest(entries);
        let totals = aggregate_legs(entries, |_| true);

        let mut assets = Section::default();
        let mut liabilities = Section::default();
        let mut equity = Section::default();
        let mut retained = AccountTotals::new(LedgerAccount::equity(RETAINED_EARNINGS, ""));

        for account_totals in totals.into_values() {
            match account_totals.account.account_type() {
                AccountType::Asset => {
                    assets.push(AccountLine::translated(account_totals, &spot_rates))
                }
                AccountType::Liability => {
                    liabilities.push(AccountLine::translated(account_totals, &spot_rates))
                }
                AccountType::Equity => {
                    equity.push(AccountLine::translated(account_totals, &spot_rates))
                }
                AccountType::Revenue => {
                    merge_native(&mut retained.native, &account_totals.native, Decimal::ONE);
                    retained.conv += account_totals.conv;
                    retained.entry_count += account_totals.entry_count;
                }
                AccountType::Expense => {
                    merge_native(
                        &mut retained.native,
                        &account_totals.native,
                        Decimal::NEGATIVE_ONE,
                    );
                    retained.conv = retained.conv - account_totals.conv;
                    retained.entry_count += account_totals.entry_count;
                }
            }
        }

        let cta = assets.translation_delta()
            - liabilities.translation_delta()
            - equity.translation_delta();

        let retained_earnings = retained.conv;
        equity.push(AccountLine {
            account: retained.account,
            native: retained.native,
            historical: retained.conv,
            translated_usd: retained.conv.usd,
        });
        equity.push(AccountLine {
            account: LedgerAccount::equity(CTA, ""),
            native: BTreeMap::new(),
            historical: ConvAmounts::default(),
            translated_usd: cta,
        });

        let total_liabilities_and_equity = liabilities.total_usd + equity.total_usd;
        let discrepancy = assets.total_usd - total_liabilities_and_equity;
        let is_balanced = isclose(
            assets.total_usd,
            total_liabilities_and_equity,
            tolerance.balance_sheet_rel_tol,
            tolerance.abs_tol.usd,
        );

        Self {
            as_of,
            start: age.map(|age| as_of - age),
            entry_count: entries.len(),
            spot_rates,
            assets,
            liabilities,
            equity,
            retained_earnings,
            cta,
            total_liabilities_and_equity,
            is_balanced,
            discrepancy,
        }
    }
}

/// Balance sheet as of `as_of`, optionally limited to the last `age` of entries.
#[instrument(skip(store, tolerance))]
pub async fn generate_balance_sheet<S>(
    store: &S,
    as_of: DateTime<Utc>,
    age: Option<Duration>,
    tolerance: &ToleranceConfig,
) -> Result<BalanceSheet, LedgerError>
where
    S: LedgerStore + ?Sized,
{
    let timer = REPORT_DURATION
        .with_label_values(&["balance_sheet"])
        .start_timer();

    let entries = store.fetch_entries(&report_query(as_of, age)).await?;
    let sheet = BalanceSheet::from_entries(&entries, as_of, age, tolerance);

    timer.observe_duration();

    if sheet.is_balanced {
        info!(
            entries = sheet.entry_count,
            assets_usd = %sheet.assets.total_usd.round_dp(2),
            cta = %sheet.cta.round_dp(2),
            "Balance sheet generated"
        );
    } else {
        warn!(
            entries = sheet.entry_count,
            assets_usd = %sheet.assets.total_usd.round_dp(2),
            liabilities_and_equity_usd = %sheet.total_liabilities_and_equity.round_dp(2),
            discrepancy = %sheet.discrepancy.round_dp(2),
            "Balance sheet does not balance"
        );
    }
    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LedgerLeg, LedgerType, QuoteResponse};
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

    fn hive_entry(
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
    fn test_spot_rates_from_conv() {
        let conv = CryptoConv::from_quote(dec!(100), Currency::Hive, &quote(dec!(0.25))).unwrap();
        let rates = SpotRates::from_conv(&conv);
        assert_eq!(rates.hive_usd, dec!(0.25));
        assert_eq!(rates.hbd_usd, dec!(1));
        assert_eq!(rates.btc_usd, dec!(100000));
        assert_eq!(rates.usd_per_unit(Currency::Usd), Decimal::ONE);

        let zero = SpotRates::from_conv(&CryptoConv::zero(Utc::now(), "test"));
        assert_eq!(zero, SpotRates::default());
    }

    #[test]
    fn test_empty_sheet_is_balanced() {
        let sheet = BalanceSheet::from_entries(&[], Utc::now(), None, &ToleranceConfig::default());
        assert!(sheet.is_balanced);
        assert!(sheet.assets.is_empty());
        assert!(sheet.liabilities.is_empty());
        assert_eq!(sheet.equity.lines.len(), 2);
        assert_eq!(sheet.cta, Decimal::ZERO);
        assert_eq!(sheet.discrepancy, Decimal::ZERO);
    }

    #[test]
    fn test_cta_absorbs_price_move() {
        let treasury = LedgerAccount::asset("Treasury Hive", "");
        let owner = LedgerAccount::equity("Owner Loan", "");
        let entries = vec![
            hive_entry("a", 1, treasury.clone(), owner.clone(), dec!(100), dec!(0.20)),
            // A later, unrelated entry at a higher price sets the spot rate.
            hive_entry(
                "b",
                2,
                LedgerAccount::asset("Customer Deposits Hive", ""),
                LedgerAccount::liability("Customer Liability", "bob"),
                dec!(10),
                dec!(0.30),
            ),
        ];

        let sheet = BalanceSheet::from_entries(
            &entries,
            Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
            None,
            &ToleranceConfig::default(),
        );

        assert_eq!(sheet.spot_rates.hive_usd, dec!(0.30));
        // 100 HIVE: 20 USD historical, 30 USD at spot; the equity account moves too.
        assert_eq!(sheet.assets.total_usd, dec!(33));
        assert_eq!(sheet.cta, Decimal::ZERO);

        let sheet_assets_only = BalanceSheet::from_entries(
            &[
                hive_entry(
                    "c",
                    1,
                    treasury,
                    LedgerAccount::revenue("Fee Income", ""),
                    dec!(100),
                    dec!(0.20),
                ),
                entries[1].clone(),
            ],
            Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
            None,
            &ToleranceConfig::default(),
        );
        assert_eq!(sheet_assets_only.retained_earnings.usd, dec!(20));
        assert_eq!(sheet_assets_only.cta, dec!(10));
        assert!(sheet_assets_only.is_balanced);
        assert_eq!(sheet_assets_only.discrepancy, Decimal::ZERO);
    }
}
