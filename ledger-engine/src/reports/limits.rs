//! Rolling conversion totals per customer.

use crate::error::LedgerError;
use crate::models::LedgerType;
use crate::services::store::{EntryQuery, LedgerStore};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct LimitWindow {
    pub label: String,
    pub length: Duration,
}

impl LimitWindow {
    pub fn hours(hours: i64) -> Self {
        Self {
            label: format!("{}h", hours),
            length: Duration::hours(hours),
        }
    }

    pub fn days(days: i64) -> Self {
        Self {
            label: format!("{}d", days),
            length: Duration::days(days),
        }
    }

    /// 4 hours, 1 day and 7 days.
    pub fn defaults() -> Vec<Self> {
        vec![Self::hours(4), Self::days(1), Self::days(7)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowUsage {
    pub label: String,
    pub since: DateTime<Utc>,
    pub conversions: usize,
    pub msats: Decimal,
    pub usd: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionLimits {
    pub cust_id: String,
    pub as_of: DateTime<Utc>,
    pub windows: Vec<WindowUsage>,
}

impl ConversionLimits {
    pub fn window(&self, label: &str) -> Option<&WindowUsage> {
        self.windows.iter().find(|w| w.label == label)
    }
}

/// Sum the Hive/Lightning conversions attributed to `cust_id` over each window.
///
/// Windows end at `now`. Reversed conversions are not counted.
#[instrument(skip(store, windows))]
pub async fn conversion_limits<S>(
    store: &S,
    cust_id: &str,
    now: DateTime<Utc>,
    windows: &[LimitWindow],
) -> Result<ConversionLimits, LedgerError>
where
    S: LedgerStore + ?Sized,
{
    let longest = windows
        .iter()
        .map(|w| w.length)
        .max()
        .unwrap_or_else(Duration::zero);

    let conversion_types: Vec<LedgerType> = LedgerType::ALL
        .into_iter()
        .filter(LedgerType::is_conversion)
        .collect();
    let query = EntryQuery::until(now)
        .since(Some(now - longest))
        .with_cust_id(cust_id)
        .with_ledger_types(conversion_types);
    let entries = store.fetch_entries(&query).await?;

    let windows = windows
        .iter()
        .map(|window| {
            let since = now - window.length;
            let mut usage = WindowUsage {
                label: window.label.clone(),
                since,
                conversions: 0,
                msats: Decimal::ZERO,
                usd: Decimal::ZERO,
            };
            for entry in entries.iter().filter(|e| e.timestamp >= since) {
                usage.conversions += 1;
                usage.msats += entry.debit_conv.msats.abs();
                usage.usd += entry.debit_conv.usd.abs();
            }
            usage
        })
        .collect();

    let limits = ConversionLimits {
        cust_id: cust_id.to_string(),
        as_of: now,
        windows,
    };
    debug!(windows = ?limits.windows, "Conversion usage computed");
    Ok(limits)
}
