//! Storage boundary for ledger entries.

use crate::error::LedgerError;
use crate::models::{AccountType, LedgerAccount, LedgerEntry, LedgerType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Selects entries touching one account, optionally narrowed to a sub-account.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountFilter {
    pub account_type: AccountType,
    pub name: String,
    pub sub: Option<String>,
}

impl AccountFilter {
    pub fn for_account(account: &LedgerAccount, sub: Option<&str>) -> Self {
        Self {
            account_type: account.account_type(),
            name: account.name().to_string(),
            sub: sub.map(str::to_string),
        }
    }

    pub fn matches(&self, account: &LedgerAccount) -> bool {
        account.matches(self.account_type, &self.name, self.sub.as_deref())
    }
}

/// Range and attribute filter for entry scans.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryQuery {
    /// Inclusive lower bound on `timestamp`.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `timestamp`.
    pub end: Option<DateTime<Utc>>,
    pub include_reversed: bool,
    pub account: Option<AccountFilter>,
    pub cust_id: Option<String>,
    /// Empty means every ledger type.
    pub ledger_types: Vec<LedgerType>,
}

impl EntryQuery {
    pub fn until(end: DateTime<Utc>) -> Self {
        Self {
            end: Some(end),
            ..Self::default()
        }
    }

    pub fn since(mut self, start: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self
    }

    pub fn with_account(mut self, account: AccountFilter) -> Self {
        self.account = Some(account);
        self
    }

    pub fn with_cust_id(mut self, cust_id: impl Into<String>) -> Self {
        self.cust_id = Some(cust_id.into());
        self
    }

    pub fn with_ledger_types(mut self, ledger_types: Vec<LedgerType>) -> Self {
        self.ledger_types = ledger_types;
        self
    }

    pub fn including_reversed(mut self) -> Self {
        self.include_reversed = true;
        self
    }

    /// In-process evaluation, matching what backends push down.
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if !self.include_reversed && entry.is_reversed() {
            return false;
        }
        if self.start.is_some_and(|start| entry.timestamp < start) {
            return false;
        }
        if self.end.is_some_and(|end| entry.timestamp > end) {
            return false;
        }
        if let Some(cust_id) = &self.cust_id {
            if &entry.cust_id != cust_id {
                return false;
            }
        }
        if !self.ledger_types.is_empty() && !self.ledger_types.contains(&entry.ledger_type) {
            return false;
        }
        if let Some(filter) = &self.account {
            let debit = entry.debit.as_ref().is_some_and(|a| filter.matches(a));
            let credit = entry.credit.as_ref().is_some_and(|a| filter.matches(a));
            if !debit && !credit {
                return false;
            }
        }
        true
    }
}

/// Document store holding the `ledger` collection.
///
/// Writers only insert new entries or update a single entry by `group_id`.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert a new entry; a taken `group_id` yields `LedgerError::Duplicate`.
    async fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), LedgerError>;

    /// Insert or replace the entry with the same `group_id`.
    async fn upsert_entry(&self, entry: &LedgerEntry) -> Result<(), LedgerError>;

    async fn find_entry(&self, group_id: &str) -> Result<Option<LedgerEntry>, LedgerError>;

    /// Entries matching `query`, oldest first.
    async fn fetch_entries(&self, query: &EntryQuery) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Flag one entry as reversed. Returns false when no entry matched.
    async fn mark_reversed(
        &self,
        group_id: &str,
        when: DateTime<Utc>,
    ) -> Result<bool, LedgerError>;

    /// Every distinct account appearing on either side of any entry.
    async fn distinct_accounts(&self) -> Result<Vec<LedgerAccount>, LedgerError>;
}
