//! Common test utilities for ledger-engine integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use ledger_engine::models::{
    Currency, LedgerAccount, LedgerEntry, LedgerType, QuoteResponse, ToleranceConfig,
};
use ledger_engine::services::{LedgerDb, MemoryLedgerStore, PricingContext};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,ledger_engine=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Start of every test timeline.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

pub fn at(minutes: i64) -> DateTime<Utc> {
    t0() + Duration::minutes(minutes)
}

/// 0.245 USD/HIVE at 100k USD/BTC, i.e. 245 sats per HIVE.
pub fn quote_at(hive_usd: Decimal, fetch_date: DateTime<Utc>) -> QuoteResponse {
    QuoteResponse {
        hive_usd,
        hbd_usd: dec!(1.0),
        btc_usd: dec!(100000),
        hive_hbd: hive_usd,
        fetch_date,
        source: "test".to_string(),
        error: None,
    }
}

pub fn pricing() -> PricingContext {
    pricing_at(dec!(0.245))
}

pub fn pricing_at(hive_usd: Decimal) -> PricingContext {
    PricingContext::new(quote_at(hive_usd, t0())).unwrap()
}

pub fn tolerance() -> ToleranceConfig {
    ToleranceConfig::default()
}

pub fn store() -> MemoryLedgerStore {
    init_tracing();
    MemoryLedgerStore::new()
}

/// A single-currency entry valued with `pricing`.
#[allow(clippy::too_many_arguments)]
pub fn entry(
    pricing: &PricingContext,
    group_id: &str,
    ledger_type: LedgerType,
    timestamp: DateTime<Utc>,
    debit: LedgerAccount,
    credit: LedgerAccount,
    amount: Decimal,
    unit: Currency,
) -> LedgerEntry {
    LedgerEntry::new(
        group_id,
        ledger_type,
        timestamp,
        pricing.leg(debit, amount, unit).unwrap(),
        pricing.leg(credit, amount, unit).unwrap(),
    )
    .unwrap()
}

/// Customer deposit of HIVE into the server account.
pub fn hive_deposit(
    pricing: &PricingContext,
    group_id: &str,
    cust_id: &str,
    amount: Decimal,
    timestamp: DateTime<Utc>,
) -> LedgerEntry {
    entry(
        pricing,
        group_id,
        LedgerType::Deposit,
        timestamp,
        LedgerAccount::asset("Customer Deposits Hive", "server"),
        LedgerAccount::liability("Customer Liability", cust_id),
        amount,
        Currency::Hive,
    )
    .with_cust_id(cust_id)
    .with_description(format!("Deposit {} HIVE from {}", amount, cust_id))
}

/// Connect to the MongoDB given by `TEST_MONGODB_URI` using a fresh collection.
pub async fn spawn_mongo() -> LedgerDb {
    init_tracing();
    let uri = std::env::var("TEST_MONGODB_URI")
        .expect("TEST_MONGODB_URI must be set to run MongoDB integration tests");
    let collection = format!("ledger_test_{}", Utc::now().timestamp_nanos_opt().unwrap_or(0));
    let db = LedgerDb::connect(&uri, "ledger_engine_test", &collection)
        .await
        .expect("Failed to connect to MongoDB");
    db.initialize_indexes()
        .await
        .expect("Failed to create indexes");
    db
}
