//! Fixed-width text renderings of the reports.

use super::account_balance::AccountBalance;
use super::aggregate::AccountTotals;
use super::balance_sheet::{BalanceSheet, Section};
use super::profit_loss::ProfitAndLoss;
use crate::models::{ConvAmounts, Currency};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

const WIDTH: usize = 100;

fn amount(value: Decimal, unit: Currency) -> String {
    format!("{:.*}", unit.display_dp() as usize, value.round_dp(unit.display_dp()))
}

fn natives(native: &BTreeMap<Currency, Decimal>) -> String {
    native
        .iter()
        .filter(|(_, v)| !v.is_zero())
        .map(|(unit, v)| format!("{} {}", amount(*v, *unit), unit))
        .collect::<Vec<_>>()
        .join(", ")
}

fn rule(f: &mut Formatter<'_>, c: char) -> fmt::Result {
    writeln!(f, "{}", c.to_string().repeat(WIDTH))
}

fn window(start: Option<DateTime<Utc>>, as_of: DateTime<Utc>) -> String {
    match start {
        Some(start) => format!(
            "{} to {}",
            start.format("%Y-%m-%d %H:%M"),
            as_of.format("%Y-%m-%d %H:%M")
        ),
        None => format!("as of {}", as_of.format("%Y-%m-%d %H:%M")),
    }
}

fn section(f: &mut Formatter<'_>, title: &str, section: &Section) -> fmt::Result {
    writeln!(f, "{}", title)?;
    for line in &section.lines {
        let label = if line.account.sub().is_empty() {
            line.account.name().to_string()
        } else {
            format!("{} ({})", line.account.name(), line.account.sub())
        };
        writeln!(
            f,
            "  {:<44} {:>14} USD   {}",
            label,
            amount(line.translated_usd, Currency::Usd),
            natives(&line.native)
        )?;
    }
    writeln!(
        f,
        "  {:<44} {:>14} USD",
        format!("Total {}", title),
        amount(section.total_usd, Currency::Usd)
    )
}

impl Display for BalanceSheet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        rule(f, '=')?;
        writeln!(f, "Balance Sheet {}", window(self.start, self.as_of))?;
        writeln!(
            f,
            "Spot: HIVE {} USD, HBD {} USD, BTC {} USD ({} entries)",
            self.spot_rates.hive_usd.round_dp(4),
            self.spot_rates.hbd_usd.round_dp(4),
            self.spot_rates.btc_usd.round_dp(2),
            self.entry_count
        )?;
        rule(f, '-')?;
        section(f, "Assets", &self.assets)?;
        rule(f, '-')?;
        section(f, "Liabilities", &self.liabilities)?;
        rule(f, '-')?;
        section(f, "Equity", &self.equity)?;
        rule(f, '-')?;
        writeln!(
            f,
            "  {:<44} {:>14} USD",
            "Total Liabilities and Equity",
            amount(self.total_liabilities_and_equity, Currency::Usd)
        )?;
        if self.is_balanced {
            writeln!(f, "Balanced")?;
        } else {
            writeln!(
                f,
                "NOT BALANCED: discrepancy {} USD",
                amount(self.discrepancy, Currency::Usd)
            )?;
        }
        rule(f, '=')
    }
}

fn totals_block(
    f: &mut Formatter<'_>,
    title: &str,
    lines: &[AccountTotals],
    total: &ConvAmounts,
) -> fmt::Result {
    writeln!(f, "{}", title)?;
    let mut current_name = "";
    for line in lines {
        if line.account.name() != current_name {
            current_name = line.account.name();
            writeln!(f, "  {}", current_name)?;
        }
        let sub = if line.account.sub().is_empty() {
            "-"
        } else {
            line.account.sub()
        };
        writeln!(
            f,
            "    {:<40} {:>14} USD {:>14} SATS   {}",
            sub,
            amount(line.conv.usd, Currency::Usd),
            amount(line.conv.sats, Currency::Sats),
            natives(&line.native)
        )?;
    }
    writeln!(
        f,
        "  {:<42} {:>14} USD {:>14} SATS",
        format!("Total {}", title),
        amount(total.usd, Currency::Usd),
        amount(total.sats, Currency::Sats)
    )
}

impl Display for ProfitAndLoss {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        rule(f, '=')?;
        writeln!(f, "Profit and Loss {}", window(self.start, self.as_of))?;
        rule(f, '-')?;
        totals_block(f, "Revenue", &self.revenue, &self.total_revenue)?;
        rule(f, '-')?;
        totals_block(f, "Expenses", &self.expenses, &self.total_expenses)?;
        rule(f, '-')?;
        writeln!(f, "Net Income")?;
        for unit in Currency::DISPLAY {
            writeln!(
                f,
                "  {:>20} {}",
                amount(self.net_income.value_in(unit), unit),
                unit
            )?;
        }
        if !self.net_income_native.is_empty() {
            writeln!(f, "  native: {}", natives(&self.net_income_native))?;
        }
        rule(f, '=')
    }
}

impl Display for AccountBalance {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        rule(f, '=')?;
        match &self.sub {
            Some(sub) => writeln!(
                f,
                "{}: {} - {}",
                self.account.account_type(),
                self.account.name(),
                sub
            )?,
            None => writeln!(f, "{}: {}", self.account.account_type(), self.account.name())?,
        }
        writeln!(f, "{}", window(None, self.as_of))?;
        rule(f, '-')?;
        for line in &self.lines {
            writeln!(
                f,
                "{} {} {:<10} {:<6} {:>18} {:<5} {:>18}  {}",
                line.timestamp.format("%Y-%m-%d %H:%M:%S"),
                line.ledger_type.icon(),
                line.short_id,
                line.side,
                amount(line.amount_signed, line.unit),
                line.unit,
                amount(line.running_balance, line.unit),
                line.description
            )?;
        }
        rule(f, '-')?;
        for (unit, total) in &self.balances {
            writeln!(
                f,
                "  Balance {:>20} {:<5} {:>14} USD",
                amount(*total, *unit),
                unit,
                amount(self.unit_converted_in(*unit, Currency::Usd), Currency::Usd)
            )?;
        }
        for (unit, total) in &self.converted {
            writeln!(f, "  Value   {:>20} {}", amount(*total, *unit), unit)?;
        }
        rule(f, '=')
    }
}
