//! Profit and loss over a window, at historical conversion values.

use super::aggregate::{aggregate_legs, merge_native, report_query, AccountTotals};
use crate::error::LedgerError;
use crate::models::{AccountType, ConvAmounts, Currency, LedgerEntry, LegRef, Side};
use crate::services::metrics::REPORT_DURATION;
use crate::services::store::LedgerStore;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitAndLoss {
    pub as_of: DateTime<Utc>,
    pub start: Option<DateTime<Utc>>,
    /// Ordered by account name, then sub.
    pub revenue: Vec<AccountTotals>,
    pub expenses: Vec<AccountTotals>,
    pub total_revenue: ConvAmounts,
    pub total_expenses: ConvAmounts,
    pub net_income: ConvAmounts,
    /// Net income per native unit.
    pub net_income_native: BTreeMap<Currency, Decimal>,
}

fn is_income_leg(leg: &LegRef<'_>) -> bool {
    matches!(
        (leg.account.account_type(), leg.side),
        (AccountType::Revenue, Side::Credit) | (AccountType::Expense, Side::Debit)
    )
}

impl ProfitAndLoss {
    /// Only revenue credits and expense debits count toward the statement.
    pub fn from_entries(
        entries: &[LedgerEntry],
        as_of: DateTime<Utc>,
        age: Option<Duration>,
    ) -> Self {
        let mut revenue = Vec::new();
        let mut expenses = Vec::new();
        let mut total_revenue = ConvAmounts::default();
        let mut total_expenses = ConvAmounts::default();
        let mut net_income_native = BTreeMap::new();

        for totals in aggregate_legs(entries, is_income_leg).into_values() {
            if totals.account.account_type() == AccountType::Revenue {
                total_revenue += totals.conv;
                merge_native(&mut net_income_native, &totals.native, Decimal::ONE);
                revenue.push(totals);
            } else {
                total_expenses += totals.conv;
                merge_native(&mut net_income_native, &totals.native, Decimal::NEGATIVE_ONE);
                expenses.push(totals);
            }
        }

        Self {
            as_of,
            start: age.map(|age| as_of - age),
            revenue,
            expenses,
            total_revenue,
            total_expenses,
            net_income: total_revenue - total_expenses,
            net_income_native,
        }
    }
}

/// Profit and loss as of `as_of`, optionally limited to the last `age` of entries.
#[instrument(skip(store))]
pub async fn generate_profit_and_loss<S>(
    store: &S,
    as_of: DateTime<Utc>,
    age: Option<Duration>,
) -> Result<ProfitAndLoss, LedgerError>
where
    S: LedgerStore + ?Sized,
{
    let timer = REPORT_DURATION
        .with_label_values(&["profit_and_loss"])
        .start_timer();

    let entries = store.fetch_entries(&report_query(as_of, age)).await?;
    let report = ProfitAndLoss::from_entries(&entries, as_of, age);

    timer.observe_duration();
    info!(
        revenue_accounts = report.revenue.len(),
        expense_accounts = report.expenses.len(),
        net_income_usd = %report.net_income.usd.round_dp(2),
        "Profit and loss generated"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CryptoConv, LedgerAccount, LedgerLeg, LedgerType, QuoteResponse};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn quote() -> QuoteResponse {
        QuoteResponse {
            hive_usd: dec!(0.25),
            hbd_usd: dec!(1),
            btc_usd: dec!(100000),
            hive_hbd: dec!(0.25),
            fetch_date: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            source: "test".to_string(),
            error: None,
        }
    }

    fn entry(
        id: &str,
        debit: LedgerAccount,
        credit: LedgerAccount,
        amount: Decimal,
        unit: Currency,
    ) -> LedgerEntry {
        let conv = CryptoConv::from_quote(amount, unit, &quote()).unwrap();
        LedgerEntry::new(
            id,
            LedgerType::FeeIncome,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 1).unwrap(),
            LedgerLeg::new(debit, amount, unit, conv.clone()),
            LedgerLeg::new(credit, amount, unit, conv),
        )
        .unwrap()
    }

    #[test]
    fn test_net_income() {
        let entries = vec![
            entry(
                "fee-1",
                LedgerAccount::asset("Treasury Hive", ""),
                LedgerAccount::revenue("Fee Income Hive", ""),
                dec!(8),
                Currency::Hive,
            ),
            entry(
                "fee-2",
                LedgerAccount::expense("Fee Expenses Lightning", ""),
                LedgerAccount::asset("Treasury Lightning", ""),
                dec!(1000000),
                Currency::Msats,
            ),
        ];
        let pnl = ProfitAndLoss::from_entries(&entries, Utc::now(), None);

        assert_eq!(pnl.revenue.len(), 1);
        assert_eq!(pnl.expenses.len(), 1);
        assert_eq!(pnl.total_revenue.usd, dec!(2));
        // 1_000 sats at 100k USD/BTC
        assert_eq!(pnl.total_expenses.usd, dec!(1));
        assert_eq!(pnl.net_income.usd, dec!(1));
        assert_eq!(pnl.net_income_native[&Currency::Hive], dec!(8));
        assert_eq!(pnl.net_income_native[&Currency::Msats], dec!(-1000000));
    }

    #[test]
    fn test_revenue_debits_are_ignored() {
        let entries = vec![entry(
            "refund-1",
            LedgerAccount::revenue("Fee Income Hive", ""),
            LedgerAccount::asset("Treasury Hive", ""),
            dec!(4),
            Currency::Hive,
        )];
        let pnl = ProfitAndLoss::from_entries(&entries, Utc::now(), None);
        assert!(pnl.revenue.is_empty());
        assert!(pnl.net_income.is_zero());
    }

    #[test]
    fn test_ordered_by_name_then_sub() {
        let entries = vec![
            entry(
                "b",
                LedgerAccount::asset("Treasury Hive", ""),
                LedgerAccount::revenue("Fee Income", "zed"),
                dec!(1),
                Currency::Hive,
            ),
            entry(
                "a",
                LedgerAccount::asset("Treasury Hive", ""),
                LedgerAccount::revenue("Fee Income", "amy"),
                dec!(1),
                Currency::Hive,
            ),
        ];
        let pnl = ProfitAndLoss::from_entries(&entries, Utc::now(), None);
        let subs: Vec<&str> = pnl.revenue.iter().map(|t| t.account.sub()).collect();
        assert_eq!(subs, vec!["amy", "zed"]);
    }
}
