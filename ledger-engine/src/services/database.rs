//! MongoDB-backed ledger store.

use super::store::{AccountFilter, EntryQuery, LedgerStore};
use crate::error::LedgerError;
use crate::models::{LedgerAccount, LedgerEntry};
use crate::services::metrics::DB_QUERY_DURATION;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, Bson, DateTime as BsonDateTime, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOptions, IndexOptions, ReplaceOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;
use std::collections::BTreeSet;
use tracing::{info, instrument};

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone)]
pub struct LedgerDb {
    client: MongoClient,
    db: Database,
    collection: String,
}

impl LedgerDb {
    #[instrument(skip(uri), fields(service = "ledger-engine"))]
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self, AppError> {
        info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        info!(database = %database, collection = %collection, "Connected to MongoDB");
        Ok(Self {
            client,
            db,
            collection: collection.to_string(),
        })
    }

    pub fn ledger(&self) -> Collection<LedgerEntry> {
        self.db.collection(&self.collection)
    }

    /// Create the unique `group_id` index plus the scan indexes used by reports.
    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        info!("Creating MongoDB indexes for ledger collection");

        let group_id_index = IndexModel::builder()
            .keys(doc! { "group_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("group_id_unique_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        let timestamp_index = IndexModel::builder()
            .keys(doc! { "timestamp": -1 })
            .options(
                IndexOptions::builder()
                    .name("timestamp_idx".to_string())
                    .build(),
            )
            .build();

        let cust_id_index = IndexModel::builder()
            .keys(doc! { "cust_id": 1, "timestamp": -1 })
            .options(
                IndexOptions::builder()
                    .name("cust_id_timestamp_idx".to_string())
                    .build(),
            )
            .build();

        let debit_index = IndexModel::builder()
            .keys(doc! { "debit.name": 1, "debit.sub": 1 })
            .options(
                IndexOptions::builder()
                    .name("debit_account_idx".to_string())
                    .build(),
            )
            .build();

        let credit_index = IndexModel::builder()
            .keys(doc! { "credit.name": 1, "credit.sub": 1 })
            .options(
                IndexOptions::builder()
                    .name("credit_account_idx".to_string())
                    .build(),
            )
            .build();

        self.ledger()
            .create_indexes(
                [
                    group_id_index,
                    timestamp_index,
                    cust_id_index,
                    debit_index,
                    credit_index,
                ],
                None,
            )
            .await
            .map_err(|e| {
                tracing::error!("Failed to create ledger indexes: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;

        info!("Successfully created ledger indexes");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(())
    }
}

/// Unique index violations surface as write errors on insert and as command
/// errors on upsert races.
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

fn account_side_filter(side: &str, filter: &AccountFilter) -> Document {
    let mut doc = Document::new();
    doc.insert(
        format!("{}.account_type", side),
        filter.account_type.as_str(),
    );
    doc.insert(format!("{}.name", side), filter.name.as_str());
    if let Some(sub) = &filter.sub {
        doc.insert(format!("{}.sub", side), sub.as_str());
    }
    doc
}

/// Translate an [`EntryQuery`] into a MongoDB filter document.
pub fn query_filter(query: &EntryQuery) -> Document {
    let mut filter = Document::new();

    let mut range = Document::new();
    if let Some(start) = query.start {
        range.insert("$gte", BsonDateTime::from_chrono(start));
    }
    if let Some(end) = query.end {
        range.insert("$lte", BsonDateTime::from_chrono(end));
    }
    if !range.is_empty() {
        filter.insert("timestamp", range);
    }

    if !query.include_reversed {
        // Matches both a missing field and an explicit null.
        filter.insert("reversed", Bson::Null);
    }

    if let Some(cust_id) = &query.cust_id {
        filter.insert("cust_id", cust_id.as_str());
    }

    if !query.ledger_types.is_empty() {
        let codes: Vec<&str> = query.ledger_types.iter().map(|t| t.code()).collect();
        filter.insert("ledger_type", doc! { "$in": codes });
    }

    if let Some(account) = &query.account {
        filter.insert(
            "$or",
            vec![
                account_side_filter("debit", account),
                account_side_filter("credit", account),
            ],
        );
    }

    filter
}

#[async_trait]
impl LedgerStore for LedgerDb {
    #[instrument(skip(self, entry), fields(group_id = %entry.group_id))]
    async fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_entry"])
            .start_timer();

        let result = self.ledger().insert_one(entry, None).await;
        timer.observe_duration();

        match result {
            Ok(_) => Ok(()),
            Err(ref e) if is_duplicate_key(e) => Err(LedgerError::Duplicate {
                group_id: entry.group_id.clone(),
            }),
            Err(e) => Err(LedgerError::from(e)),
        }
    }

    #[instrument(skip(self, entry), fields(group_id = %entry.group_id))]
    async fn upsert_entry(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_entry"])
            .start_timer();

        let options = ReplaceOptions::builder().upsert(true).build();
        let result = self
            .ledger()
            .replace_one(doc! { "group_id": entry.group_id.as_str() }, entry, options)
            .await;
        timer.observe_duration();

        match result {
            Ok(_) => Ok(()),
            Err(ref e) if is_duplicate_key(e) => Err(LedgerError::Duplicate {
                group_id: entry.group_id.clone(),
            }),
            Err(e) => Err(LedgerError::from(e)),
        }
    }

    #[instrument(skip(self))]
    async fn find_entry(&self, group_id: &str) -> Result<Option<LedgerEntry>, LedgerError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_entry"])
            .start_timer();

        let entry = self
            .ledger()
            .find_one(doc! { "group_id": group_id }, None)
            .await?;

        timer.observe_duration();
        Ok(entry)
    }

    #[instrument(skip(self, query))]
    async fn fetch_entries(&self, query: &EntryQuery) -> Result<Vec<LedgerEntry>, LedgerError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["fetch_entries"])
            .start_timer();

        let options = FindOptions::builder()
            .sort(doc! { "timestamp": 1, "group_id": 1 })
            .build();

        let cursor = self.ledger().find(query_filter(query), options).await?;
        let entries: Vec<LedgerEntry> = cursor.try_collect().await?;

        timer.observe_duration();
        info!(count = entries.len(), "Fetched ledger entries");
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn mark_reversed(
        &self,
        group_id: &str,
        when: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_reversed"])
            .start_timer();

        let result = self
            .ledger()
            .update_one(
                doc! { "group_id": group_id },
                doc! { "$set": { "reversed": BsonDateTime::from_chrono(when) } },
                None,
            )
            .await?;

        timer.observe_duration();
        Ok(result.matched_count > 0)
    }

    #[instrument(skip(self))]
    async fn distinct_accounts(&self) -> Result<Vec<LedgerAccount>, LedgerError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["distinct_accounts"])
            .start_timer();

        let mut accounts = BTreeSet::new();
        for side in ["debit", "credit"] {
            let mut filter = Document::new();
            filter.insert(side, doc! { "$ne": Bson::Null });
            let values = self.ledger().distinct(side, filter, None).await?;
            for value in values {
                accounts.insert(bson::from_bson::<LedgerAccount>(value)?);
            }
        }

        timer.observe_duration();
        Ok(accounts.into_iter().collect())
    }
}
