//! Ledger entry model for double-entry accounting.

use super::account::{LedgerAccount, Side};
use super::conv::{ConvAmounts, CryptoConv, Currency};
use super::ledger_type::LedgerType;
use super::tolerance::{isclose, ToleranceConfig};
use crate::error::LedgerError;
use crate::services::metrics::{ENTRIES_SAVED_TOTAL, ERRORS_TOTAL};
use crate::services::store::LedgerStore;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{error, info, instrument, warn};

/// One side of an entry before it is attached to a [`LedgerEntry`].
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerLeg {
    pub account: LedgerAccount,
    pub amount: Decimal,
    pub unit: Currency,
    pub conv: CryptoConv,
}

impl LedgerLeg {
    pub fn new(account: LedgerAccount, amount: Decimal, unit: Currency, conv: CryptoConv) -> Self {
        Self {
            account,
            amount,
            unit,
            conv,
        }
    }
}

/// Borrowed view of one leg of a stored entry, with its sign resolved.
#[derive(Debug, Clone, Copy)]
pub struct LegRef<'a> {
    pub side: Side,
    pub account: &'a LedgerAccount,
    pub amount: Decimal,
    pub unit: Currency,
    pub conv: &'a CryptoConv,
    pub sign: Decimal,
}

impl LegRef<'_> {
    pub fn amount_signed(&self) -> Decimal {
        self.amount * self.sign
    }

    pub fn conv_signed(&self) -> ConvAmounts {
        self.conv.signed(self.sign).amounts()
    }
}

/// A double-entry transaction record: one debit leg and one credit leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub group_id: String,
    pub short_id: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
    pub ledger_type: LedgerType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub user_memo: String,
    #[serde(default)]
    pub cust_id: String,

    #[serde(default)]
    pub debit: Option<LedgerAccount>,
    pub debit_amount: Decimal,
    pub debit_unit: Currency,
    pub debit_conv: CryptoConv,

    #[serde(default)]
    pub credit: Option<LedgerAccount>,
    pub credit_amount: Decimal,
    pub credit_unit: Currency,
    pub credit_conv: CryptoConv,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Set when this entry has been cancelled by a reversal pair.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub reversed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reversal_of: Option<String>,
}

// Helper module for optional DateTime<Utc> as BSON DateTime
mod opt_chrono_datetime_as_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(dt) => bson::DateTime::from_chrono(*dt).serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<bson::DateTime> = Option::deserialize(deserializer)?;
        Ok(opt.map(|dt| dt.to_chrono()))
    }
}

/// Short reference derived from a group id, embedded in memos.
pub fn short_id_for(group_id: &str) -> String {
    let digest = Sha256::digest(group_id.as_bytes());
    hex::encode(&digest[..5])
}

fn validate_amount(side: Side, amount: Decimal) -> Result<(), LedgerError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(LedgerError::Validation(format!(
            "{} amount must not be negative: {}",
            side, amount
        )));
    }
    Ok(())
}

impl LedgerEntry {
    /// Build a complete two-legged entry.
    pub fn new(
        group_id: impl Into<String>,
        ledger_type: LedgerType,
        timestamp: DateTime<Utc>,
        debit: LedgerLeg,
        credit: LedgerLeg,
    ) -> Result<Self, LedgerError> {
        let mut entry = Self::draft(group_id, ledger_type, timestamp, debit.conv.clone())?;
        entry.set_debit(debit)?;
        entry.set_credit(credit)?;
        Ok(entry)
    }

    /// An entry with no accounts yet; legs are attached with `set_debit`/`set_credit`.
    pub fn draft(
        group_id: impl Into<String>,
        ledger_type: LedgerType,
        timestamp: DateTime<Utc>,
        placeholder: CryptoConv,
    ) -> Result<Self, LedgerError> {
        let group_id = group_id.into();
        if group_id.trim().is_empty() {
            return Err(LedgerError::Validation(
                "group_id must not be empty".to_string(),
            ));
        }
        let zero = CryptoConv::zero(placeholder.fetch_date, &placeholder.source);
        Ok(Self {
            short_id: short_id_for(&group_id),
            group_id,
            timestamp,
            ledger_type,
            description: String::new(),
            user_memo: String::new(),
            cust_id: String::new(),
            debit: None,
            debit_amount: Decimal::ZERO,
            debit_unit: Currency::Msats,
            debit_conv: zero.clone(),
            credit: None,
            credit_amount: Decimal::ZERO,
            credit_unit: Currency::Msats,
            credit_conv: zero,
            metadata: None,
            reversed: None,
            reversal_of: None,
        })
    }

    pub fn set_debit(&mut self, leg: LedgerLeg) -> Result<(), LedgerError> {
        validate_amount(Side::Debit, leg.amount)?;
        self.debit = Some(leg.account);
        self.debit_amount = leg.amount;
        self.debit_unit = leg.unit;
        self.debit_conv = leg.conv;
        Ok(())
    }

    pub fn set_credit(&mut self, leg: LedgerLeg) -> Result<(), LedgerError> {
        validate_amount(Side::Credit, leg.amount)?;
        self.credit = Some(leg.account);
        self.credit_amount = leg.amount;
        self.credit_unit = leg.unit;
        self.credit_conv = leg.conv;
        Ok(())
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_user_memo(mut self, memo: impl Into<String>) -> Self {
        self.user_memo = memo.into();
        self
    }

    pub fn with_cust_id(mut self, cust_id: impl Into<String>) -> Self {
        self.cust_id = cust_id.into();
        self
    }

    pub fn with_short_id(mut self, short_id: impl Into<String>) -> Self {
        self.short_id = short_id.into();
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    // -------------------------------------------------------------------------
    // Signed amounts
    // -------------------------------------------------------------------------

    fn sign_for(account: Option<&LedgerAccount>, side: Side) -> Decimal {
        match account {
            Some(a) if a.normal_side() == side => Decimal::ONE,
            Some(_) => Decimal::NEGATIVE_ONE,
            None => Decimal::ZERO,
        }
    }

    /// +1 when the debit account is debit-normal, -1 otherwise, 0 when unset.
    pub fn debit_sign(&self) -> Decimal {
        Self::sign_for(self.debit.as_ref(), Side::Debit)
    }

    /// +1 when the credit account is credit-normal, -1 otherwise, 0 when unset.
    pub fn credit_sign(&self) -> Decimal {
        Self::sign_for(self.credit.as_ref(), Side::Credit)
    }

    pub fn debit_amount_signed(&self) -> Decimal {
        self.debit_amount * self.debit_sign()
    }

    pub fn credit_amount_signed(&self) -> Decimal {
        self.credit_amount * self.credit_sign()
    }

    pub fn debit_conv_signed(&self) -> CryptoConv {
        self.debit_conv.signed(self.debit_sign())
    }

    pub fn credit_conv_signed(&self) -> CryptoConv {
        self.credit_conv.signed(self.credit_sign())
    }

    /// Legs whose account is set, debit first.
    pub fn legs(&self) -> Vec<LegRef<'_>> {
        let mut legs = Vec::with_capacity(2);
        if let Some(account) = &self.debit {
            legs.push(LegRef {
                side: Side::Debit,
                account,
                amount: self.debit_amount,
                unit: self.debit_unit,
                conv: &self.debit_conv,
                sign: self.debit_sign(),
            });
        }
        if let Some(account) = &self.credit {
            legs.push(LegRef {
                side: Side::Credit,
                account,
                amount: self.credit_amount,
                unit: self.credit_unit,
                conv: &self.credit_conv,
                sign: self.credit_sign(),
            });
        }
        legs
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed.is_some()
    }

    // -------------------------------------------------------------------------
    // Balance and completeness
    // -------------------------------------------------------------------------

    /// Either leg's amount matches the other leg's conversion in that unit.
    pub fn amounts_balanced(&self, tolerance: &ToleranceConfig) -> bool {
        let debit_check = isclose(
            self.debit_amount,
            self.credit_conv.value_in(self.debit_unit),
            tolerance.rel_tol,
            tolerance.abs_tol.for_unit(self.debit_unit),
        );
        let credit_check = isclose(
            self.credit_amount,
            self.debit_conv.value_in(self.credit_unit),
            tolerance.rel_tol,
            tolerance.abs_tol.for_unit(self.credit_unit),
        );
        debit_check || credit_check
    }

    pub fn msats_gap(&self) -> Decimal {
        (self.debit_conv.msats - self.credit_conv.msats).abs()
    }

    pub fn credit_debit_balance_str(&self) -> String {
        format!(
            "debit {} msats / credit {} msats (gap {})",
            self.debit_conv.msats.round_dp(0),
            self.credit_conv.msats.round_dp(0),
            self.msats_gap().round_dp(0)
        )
    }

    /// Why this entry may not be persisted, if anything.
    ///
    /// Amount/conversion drift only produces a warning; an msats gap beyond
    /// `msats_balance_tol` is a failure.
    pub fn check_completed(&self, tolerance: &ToleranceConfig) -> Result<(), String> {
        if self.debit.is_none() {
            return Err("debit account is not set".to_string());
        }
        if self.credit.is_none() {
            return Err("credit account is not set".to_string());
        }

        if !self.amounts_balanced(tolerance) {
            warn!(
                group_id = %self.group_id,
                debit_amount = %self.debit_amount,
                debit_unit = %self.debit_unit,
                credit_amount = %self.credit_amount,
                credit_unit = %self.credit_unit,
                "Debit and credit amounts do not match their conversions"
            );
        }

        if self.msats_gap() > tolerance.msats_balance_tol {
            let reason = format!(
                "debit and credit conversions differ: {}",
                self.credit_debit_balance_str()
            );
            error!(group_id = %self.group_id, "{}", reason);
            return Err(reason);
        }

        Ok(())
    }

    pub fn is_completed_with(&self, tolerance: &ToleranceConfig) -> bool {
        self.check_completed(tolerance).is_ok()
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed_with(&ToleranceConfig::default())
    }

    fn ensure_completed(&self, tolerance: &ToleranceConfig) -> Result<(), LedgerError> {
        self.check_completed(tolerance).map_err(|reason| {
            ENTRIES_SAVED_TOTAL
                .with_label_values(&["not_completed"])
                .inc();
            ERRORS_TOTAL.with_label_values(&["not_completed"]).inc();
            LedgerError::NotCompleted {
                group_id: self.group_id.clone(),
                reason,
            }
        })
    }

    fn log_context(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("<unserializable entry: {}>", e))
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Insert this entry. Fails with `Duplicate` when the group id is taken.
    #[instrument(skip(self, store, tolerance), fields(group_id = %self.group_id, ledger_type = %self.ledger_type))]
    pub async fn save<S>(&self, store: &S, tolerance: &ToleranceConfig) -> Result<(), LedgerError>
    where
        S: LedgerStore + ?Sized,
    {
        self.ensure_completed(tolerance)?;

        match store.insert_entry(self).await {
            Ok(()) => {
                ENTRIES_SAVED_TOTAL.with_label_values(&["ok"]).inc();
                info!(
                    short_id = %self.short_id,
                    debit = ?self.debit.as_ref().map(|a| a.to_string()),
                    credit = ?self.credit.as_ref().map(|a| a.to_string()),
                    "Ledger entry saved"
                );
                Ok(())
            }
            Err(e) => Err(self.record_failure(e, "insert")),
        }
    }

    /// Insert or replace the stored entry with this group id.
    #[instrument(skip(self, store, tolerance), fields(group_id = %self.group_id, ledger_type = %self.ledger_type))]
    pub async fn upsert<S>(&self, store: &S, tolerance: &ToleranceConfig) -> Result<(), LedgerError>
    where
        S: LedgerStore + ?Sized,
    {
        self.ensure_completed(tolerance)?;

        match store.upsert_entry(self).await {
            Ok(()) => {
                ENTRIES_SAVED_TOTAL.with_label_values(&["upserted"]).inc();
                info!(short_id = %self.short_id, "Ledger entry upserted");
                Ok(())
            }
            Err(e) => Err(self.record_failure(e, "upsert")),
        }
    }

    fn record_failure(&self, err: LedgerError, operation: &str) -> LedgerError {
        ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();
        match err {
            LedgerError::Duplicate { .. } => {
                ENTRIES_SAVED_TOTAL.with_label_values(&["duplicate"]).inc();
                warn!(operation, "Ledger entry already exists");
                err
            }
            LedgerError::Persistence(source) => {
                ENTRIES_SAVED_TOTAL.with_label_values(&["error"]).inc();
                error!(operation, error = %source, entry = %self.log_context(), "Failed to persist ledger entry");
                LedgerError::Persistence(source)
            }
            other => {
                ENTRIES_SAVED_TOTAL.with_label_values(&["error"]).inc();
                error!(operation, error = %other, entry = %self.log_context(), "Failed to persist ledger entry");
                LedgerError::Persistence(anyhow::anyhow!(
                    "Failed to {} ledger entry {}: {}",
                    operation,
                    self.group_id,
                    other
                ))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Reversal
    // -------------------------------------------------------------------------

    /// The equal-and-opposite entry cancelling this one.
    pub fn reversal(&self, timestamp: DateTime<Utc>) -> Result<Self, LedgerError> {
        let (Some(debit), Some(credit)) = (self.debit.clone(), self.credit.clone()) else {
            return Err(LedgerError::Validation(format!(
                "Cannot reverse incomplete entry {}",
                self.group_id
            )));
        };

        let mut reversal = Self::new(
            format!("{}_reversal", self.group_id),
            LedgerType::Reversal,
            timestamp,
            LedgerLeg::new(
                credit,
                self.credit_amount,
                self.credit_unit,
                self.credit_conv.clone(),
            ),
            LedgerLeg::new(
                debit,
                self.debit_amount,
                self.debit_unit,
                self.debit_conv.clone(),
            ),
        )?
        .with_description(format!("Reversal of {}: {}", self.short_id, self.description))
        .with_cust_id(self.cust_id.clone());
        reversal.reversal_of = Some(self.group_id.clone());
        Ok(reversal)
    }
}
