//! Account model for the double-entry ledger.
//!
//! Accounts are not stored on their own: they are implied by the
//! `(account_type, name, sub)` tuples that appear on ledger entries.

use serde::{Deserialize, Serialize};

/// Account types following standard accounting categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountType {
    pub const ALL: [AccountType; 5] = [
        AccountType::Asset,
        AccountType::Liability,
        AccountType::Equity,
        AccountType::Revenue,
        AccountType::Expense,
    ];

    /// Get string representation for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }

    /// Asset/Expense balances grow with debits; Liability/Equity/Revenue with credits.
    pub fn normal_side(self) -> Side {
        match self {
            Self::Asset | Self::Expense => Side::Debit,
            Self::Liability | Self::Equity | Self::Revenue => Side::Credit,
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = crate::error::LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asset" => Ok(Self::Asset),
            "liability" => Ok(Self::Liability),
            "equity" => Ok(Self::Equity),
            "revenue" => Ok(Self::Revenue),
            "expense" => Ok(Self::Expense),
            other => Err(crate::error::LedgerError::Validation(format!(
                "Unknown account type '{}'",
                other
            ))),
        }
    }
}

/// Leg side (debit or credit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Debit,
    Credit,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fields shared by every account variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountDetails {
    pub name: String,
    #[serde(default)]
    pub sub: String,
    /// Reported as an offset against its normal-side peers. Display only.
    #[serde(default)]
    pub contra: bool,
}

/// A ledger account, tagged by its account type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "account_type", rename_all = "lowercase")]
pub enum LedgerAccount {
    Asset(AccountDetails),
    Liability(AccountDetails),
    Equity(AccountDetails),
    Revenue(AccountDetails),
    Expense(AccountDetails),
}

impl LedgerAccount {
    pub fn new(account_type: AccountType, name: impl Into<String>, sub: impl Into<String>) -> Self {
        let details = AccountDetails {
            name: name.into(),
            sub: sub.into(),
            contra: false,
        };
        match account_type {
            AccountType::Asset => Self::Asset(details),
            AccountType::Liability => Self::Liability(details),
            AccountType::Equity => Self::Equity(details),
            AccountType::Revenue => Self::Revenue(details),
            AccountType::Expense => Self::Expense(details),
        }
    }

    pub fn asset(name: impl Into<String>, sub: impl Into<String>) -> Self {
        Self::new(AccountType::Asset, name, sub)
    }

    pub fn liability(name: impl Into<String>, sub: impl Into<String>) -> Self {
        Self::new(AccountType::Liability, name, sub)
    }

    pub fn equity(name: impl Into<String>, sub: impl Into<String>) -> Self {
        Self::new(AccountType::Equity, name, sub)
    }

    pub fn revenue(name: impl Into<String>, sub: impl Into<String>) -> Self {
        Self::new(AccountType::Revenue, name, sub)
    }

    pub fn expense(name: impl Into<String>, sub: impl Into<String>) -> Self {
        Self::new(AccountType::Expense, name, sub)
    }

    /// Mark this account as a contra account.
    pub fn into_contra(mut self) -> Self {
        self.details_mut().contra = true;
        self
    }

    /// The same account with the contra flag cleared, used as a grouping key.
    pub fn without_contra(mut self) -> Self {
        self.details_mut().contra = false;
        self
    }

    pub fn details(&self) -> &AccountDetails {
        match self {
            Self::Asset(d)
            | Self::Liability(d)
            | Self::Equity(d)
            | Self::Revenue(d)
            | Self::Expense(d) => d,
        }
    }

    fn details_mut(&mut self) -> &mut AccountDetails {
        match self {
            Self::Asset(d)
            | Self::Liability(d)
            | Self::Equity(d)
            | Self::Revenue(d)
            | Self::Expense(d) => d,
        }
    }

    pub fn account_type(&self) -> AccountType {
        match self {
            Self::Asset(_) => AccountType::Asset,
            Self::Liability(_) => AccountType::Liability,
            Self::Equity(_) => AccountType::Equity,
            Self::Revenue(_) => AccountType::Revenue,
            Self::Expense(_) => AccountType::Expense,
        }
    }

    pub fn normal_side(&self) -> Side {
        self.account_type().normal_side()
    }

    pub fn name(&self) -> &str {
        &self.details().name
    }

    pub fn sub(&self) -> &str {
        &self.details().sub
    }

    pub fn is_contra(&self) -> bool {
        self.details().contra
    }

    /// Same type and name, and same sub when `sub` is given.
    pub fn matches(&self, account_type: AccountType, name: &str, sub: Option<&str>) -> bool {
        self.account_type() == account_type
            && self.name() == name
            && sub.map_or(true, |s| self.sub() == s)
    }
}

impl std::fmt::Display for LedgerAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let contra = if self.is_contra() { " (contra)" } else { "" };
        if self.sub().is_empty() {
            write!(f, "{}: {}{}", self.account_type(), self.name(), contra)
        } else {
            write!(
                f,
                "{}: {} - {}{}",
                self.account_type(),
                self.name(),
                self.sub(),
                contra
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_sides() {
        assert_eq!(AccountType::Asset.normal_side(), Side::Debit);
        assert_eq!(AccountType::Expense.normal_side(), Side::Debit);
        assert_eq!(AccountType::Liability.normal_side(), Side::Credit);
        assert_eq!(AccountType::Equity.normal_side(), Side::Credit);
        assert_eq!(AccountType::Revenue.normal_side(), Side::Credit);
    }

    #[test]
    fn test_serialized_shape() {
        let account = LedgerAccount::asset("Treasury Hive", "v4vapp").into_contra();
        let value = serde_json::to_value(&account).unwrap();
        assert_eq!(value["account_type"], "asset");
        assert_eq!(value["name"], "Treasury Hive");
        assert_eq!(value["sub"], "v4vapp");
        assert_eq!(value["contra"], true);

        let back: LedgerAccount = serde_json::from_value(value).unwrap();
        assert_eq!(back, account);
    }

    #[test]
    fn test_missing_sub_and_contra_default() {
        let account: LedgerAccount = serde_json::from_value(serde_json::json!({
            "account_type": "liability",
            "name": "Customer Liability"
        }))
        .unwrap();
        assert_eq!(account, LedgerAccount::liability("Customer Liability", ""));
        assert!(!account.is_contra());
    }

    #[test]
    fn test_matches_with_optional_sub() {
        let account = LedgerAccount::asset("Customer Deposits", "alice");
        assert!(account.matches(AccountType::Asset, "Customer Deposits", None));
        assert!(account.matches(AccountType::Asset, "Customer Deposits", Some("alice")));
        assert!(!account.matches(AccountType::Asset, "Customer Deposits", Some("bob")));
        assert!(!account.matches(AccountType::Liability, "Customer Deposits", None));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            LedgerAccount::revenue("Fee Income", "").to_string(),
            "revenue: Fee Income"
        );
        assert_eq!(
            LedgerAccount::asset("Treasury Lightning", "node").to_string(),
            "asset: Treasury Lightning - node"
        );
    }
}
