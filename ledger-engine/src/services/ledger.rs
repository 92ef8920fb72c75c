//! Ledger operations that span more than one entry.

use super::store::LedgerStore;
use crate::error::LedgerError;
use crate::models::{LedgerAccount, LedgerEntry, ToleranceConfig};
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

/// Cancel a stored entry by appending its equal-and-opposite twin.
///
/// Both the original and the reversal are flagged `reversed`, so reports drop
/// the pair together while the history keeps both documents. A call that
/// stored the twin but failed to flag the original can be retried: the stored
/// twin is reused and the original is flagged.
#[instrument(skip(store, tolerance))]
pub async fn reverse_entry<S>(
    store: &S,
    group_id: &str,
    when: DateTime<Utc>,
    tolerance: &ToleranceConfig,
) -> Result<LedgerEntry, LedgerError>
where
    S: LedgerStore + ?Sized,
{
    let original = store
        .find_entry(group_id)
        .await?
        .ok_or_else(|| LedgerError::NotFound {
            group_id: group_id.to_string(),
        })?;

    if original.is_reversed() {
        return Err(LedgerError::Validation(format!(
            "Ledger entry {} is already reversed",
            group_id
        )));
    }
    if original.reversal_of.is_some() {
        return Err(LedgerError::Validation(format!(
            "Ledger entry {} is itself a reversal",
            group_id
        )));
    }

    let mut reversal = original.reversal(when)?;
    reversal.reversed = Some(when);
    match reversal.save(store, tolerance).await {
        Ok(()) => {}
        Err(LedgerError::Duplicate { group_id: taken }) => {
            reversal = match store.find_entry(&taken).await? {
                Some(stored) if stored.reversal_of.as_deref() == Some(group_id) => {
                    warn!(
                        reversal_group_id = %stored.group_id,
                        "Reversal already stored, flagging original"
                    );
                    stored
                }
                _ => return Err(LedgerError::Duplicate { group_id: taken }),
            };
        }
        Err(e) => return Err(e),
    }

    let flagged_at = reversal.reversed.unwrap_or(when);
    if !store.mark_reversed(&original.group_id, flagged_at).await? {
        return Err(LedgerError::NotFound {
            group_id: original.group_id.clone(),
        });
    }

    info!(
        reversal_group_id = %reversal.group_id,
        "Ledger entry reversed"
    );
    Ok(reversal)
}

/// Accounts are implicit: discover them from the entries themselves.
pub async fn list_accounts<S>(store: &S) -> Result<Vec<LedgerAccount>, LedgerError>
where
    S: LedgerStore + ?Sized,
{
    store.distinct_accounts().await
}
