//! ledger-report: print the balance sheet and profit and loss as of now.

use chrono::Utc;
use ledger_engine::config::LedgerConfig;
use ledger_engine::reports::{generate_balance_sheet, generate_profit_and_loss};
use ledger_engine::services::{init_metrics, LedgerDb};
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = LedgerConfig::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        &config.common.service_name,
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    );
    init_metrics();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        database = %config.mongodb.database,
        collection = %config.mongodb.collection,
        report_age_days = ?config.report_age_days,
        "Starting ledger-report"
    );

    let db = LedgerDb::connect(
        &config.mongodb.uri,
        &config.mongodb.database,
        &config.mongodb.collection,
    )
    .await?;
    db.initialize_indexes().await?;

    let as_of = Utc::now();
    let age = config.report_age();

    let sheet = generate_balance_sheet(&db, as_of, age, &config.tolerance).await?;
    println!("{}", sheet);

    let pnl = generate_profit_and_loss(&db, as_of, age).await?;
    println!("{}", pnl);

    Ok(())
}
