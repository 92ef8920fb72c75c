//! In-process ledger store for tests and dry runs.

use super::store::{EntryQuery, LedgerStore};
use crate::error::LedgerError;
use crate::models::{LedgerAccount, LedgerEntry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeSet;

/// Keyed by `group_id`, mirroring the unique index of the MongoDB store.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    entries: DashMap<String, LedgerEntry>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        match self.entries.entry(entry.group_id.clone()) {
            Entry::Occupied(_) => Err(LedgerError::Duplicate {
                group_id: entry.group_id.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(entry.clone());
                Ok(())
            }
        }
    }

    async fn upsert_entry(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        self.entries.insert(entry.group_id.clone(), entry.clone());
        Ok(())
    }

    async fn find_entry(&self, group_id: &str) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self.entries.get(group_id).map(|e| e.value().clone()))
    }

    async fn fetch_entries(&self, query: &EntryQuery) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut entries: Vec<LedgerEntry> = self
            .entries
            .iter()
            .filter(|e| query.matches(e.value()))
            .map(|e| e.value().clone())
            .collect();
        entries.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.group_id.cmp(&b.group_id))
        });
        Ok(entries)
    }

    async fn mark_reversed(
        &self,
        group_id: &str,
        when: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        match self.entries.get_mut(group_id) {
            Some(mut entry) => {
                entry.reversed = Some(when);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn distinct_accounts(&self) -> Result<Vec<LedgerAccount>, LedgerError> {
        let accounts: BTreeSet<LedgerAccount> = self
            .entries
            .iter()
            .flat_map(|e| {
                let entry = e.value();
                [entry.debit.clone(), entry.credit.clone()]
            })
            .flatten()
            .collect();
        Ok(accounts.into_iter().collect())
    }
}
