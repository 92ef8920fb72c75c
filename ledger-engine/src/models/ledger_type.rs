//! Transaction categories recorded on each ledger entry.

use serde::{Deserialize, Serialize};

/// Closed set of ledger transaction categories.
///
/// Stored as a short code (at most 10 characters) to keep documents small.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LedgerType {
    #[serde(rename = "unkn")]
    Unknown,
    #[serde(rename = "funding")]
    Funding,
    #[serde(rename = "deposit")]
    Deposit,
    #[serde(rename = "withdraw")]
    Withdrawal,
    #[serde(rename = "h_conv_l")]
    ConvHiveToLightning,
    #[serde(rename = "h_contra_l")]
    ContraHiveToLightning,
    #[serde(rename = "l_conv_h")]
    ConvLightningToHive,
    #[serde(rename = "l_contra_h")]
    ContraLightningToHive,
    #[serde(rename = "fee_inc")]
    FeeIncome,
    #[serde(rename = "fee_exp")]
    FeeExpense,
    #[serde(rename = "fee_chg")]
    FeeCharge,
    #[serde(rename = "treas_tx")]
    TreasuryTransfer,
    #[serde(rename = "exc_conv")]
    ExchangeConversion,
    #[serde(rename = "limit_or")]
    LimitOrderCreate,
    #[serde(rename = "fill_or")]
    FillOrder,
    #[serde(rename = "cj_notif")]
    CustomJsonNotification,
    #[serde(rename = "reversal")]
    Reversal,
    #[serde(rename = "adjust")]
    Adjustment,
}

impl LedgerType {
    pub const ALL: [LedgerType; 18] = [
        LedgerType::Unknown,
        LedgerType::Funding,
        LedgerType::Deposit,
        LedgerType::Withdrawal,
        LedgerType::ConvHiveToLightning,
        LedgerType::ContraHiveToLightning,
        LedgerType::ConvLightningToHive,
        LedgerType::ContraLightningToHive,
        LedgerType::FeeIncome,
        LedgerType::FeeExpense,
        LedgerType::FeeCharge,
        LedgerType::TreasuryTransfer,
        LedgerType::ExchangeConversion,
        LedgerType::LimitOrderCreate,
        LedgerType::FillOrder,
        LedgerType::CustomJsonNotification,
        LedgerType::Reversal,
        LedgerType::Adjustment,
    ];

    /// Storage code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unknown => "unkn",
            Self::Funding => "funding",
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdraw",
            Self::ConvHiveToLightning => "h_conv_l",
            Self::ContraHiveToLightning => "h_contra_l",
            Self::ConvLightningToHive => "l_conv_h",
            Self::ContraLightningToHive => "l_contra_h",
            Self::FeeIncome => "fee_inc",
            Self::FeeExpense => "fee_exp",
            Self::FeeCharge => "fee_chg",
            Self::TreasuryTransfer => "treas_tx",
            Self::ExchangeConversion => "exc_conv",
            Self::LimitOrderCreate => "limit_or",
            Self::FillOrder => "fill_or",
            Self::CustomJsonNotification => "cj_notif",
            Self::Reversal => "reversal",
            Self::Adjustment => "adjust",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }

    /// Human-readable label used in reports.
    pub fn printout(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Funding => "Funding",
            Self::Deposit => "Deposit",
            Self::Withdrawal => "Withdrawal",
            Self::ConvHiveToLightning => "Hive to Lightning conversion",
            Self::ContraHiveToLightning => "Hive to Lightning contra",
            Self::ConvLightningToHive => "Lightning to Hive conversion",
            Self::ContraLightningToHive => "Lightning to Hive contra",
            Self::FeeIncome => "Fee income",
            Self::FeeExpense => "Fee expense",
            Self::FeeCharge => "Fee charge",
            Self::TreasuryTransfer => "Treasury transfer",
            Self::ExchangeConversion => "Exchange conversion",
            Self::LimitOrderCreate => "Limit order create",
            Self::FillOrder => "Order fill",
            Self::CustomJsonNotification => "Custom JSON notification",
            Self::Reversal => "Reversal",
            Self::Adjustment => "Adjustment",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Unknown => "❓",
            Self::Funding => "🏦",
            Self::Deposit => "📥",
            Self::Withdrawal => "📤",
            Self::ConvHiveToLightning | Self::ConvLightningToHive => "🔄",
            Self::ContraHiveToLightning | Self::ContraLightningToHive => "↔️",
            Self::FeeIncome => "💰",
            Self::FeeExpense => "💸",
            Self::FeeCharge => "🧾",
            Self::TreasuryTransfer => "🏛️",
            Self::ExchangeConversion => "💱",
            Self::LimitOrderCreate => "📝",
            Self::FillOrder => "✅",
            Self::CustomJsonNotification => "🔔",
            Self::Reversal => "⏪",
            Self::Adjustment => "🛠️",
        }
    }

    /// Conversions between Hive and Lightning, which count towards customer limits.
    pub fn is_conversion(&self) -> bool {
        matches!(
            self,
            Self::ConvHiveToLightning | Self::ConvLightningToHive
        )
    }
}

impl std::fmt::Display for LedgerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
