//! Currencies, price quotes and multi-currency conversion snapshots.

use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;

pub const SATS_PER_BTC: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);
pub const MSATS_PER_SAT: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);

/// Units an amount can be denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Hive,
    Hbd,
    Usd,
    Btc,
    Sats,
    Msats,
}

impl Currency {
    pub const ALL: [Currency; 6] = [
        Currency::Hive,
        Currency::Hbd,
        Currency::Usd,
        Currency::Btc,
        Currency::Sats,
        Currency::Msats,
    ];

    /// Currencies shown in account balance drill-downs.
    pub const DISPLAY: [Currency; 5] = [
        Currency::Sats,
        Currency::Hive,
        Currency::Hbd,
        Currency::Usd,
        Currency::Msats,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hive => "HIVE",
            Self::Hbd => "HBD",
            Self::Usd => "USD",
            Self::Btc => "BTC",
            Self::Sats => "SATS",
            Self::Msats => "MSATS",
        }
    }

    /// Decimal places used when printing amounts in this unit.
    pub fn display_dp(&self) -> u32 {
        match self {
            Self::Hive | Self::Hbd => 3,
            Self::Usd => 2,
            Self::Btc => 8,
            Self::Sats | Self::Msats => 0,
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Currency {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIVE" => Ok(Self::Hive),
            "HBD" => Ok(Self::Hbd),
            "USD" => Ok(Self::Usd),
            "BTC" => Ok(Self::Btc),
            "SATS" | "SAT" => Ok(Self::Sats),
            "MSATS" | "MSAT" => Ok(Self::Msats),
            other => Err(LedgerError::Validation(format!(
                "Unknown currency '{}'",
                other
            ))),
        }
    }
}

/// Parse a user-supplied amount string such as `"100.000"`.
pub fn parse_amount(raw: &str) -> Result<Decimal, LedgerError> {
    Decimal::from_str(raw.trim())
        .map_err(|e| LedgerError::Validation(format!("Invalid amount '{}': {}", raw, e)))
}

/// Parse a Hive-style amount string such as `"25.000 HIVE"`.
pub fn parse_amount_with_unit(raw: &str) -> Result<(Decimal, Currency), LedgerError> {
    let mut parts = raw.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(amount), Some(unit), None) => Ok((parse_amount(amount)?, unit.parse()?)),
        _ => Err(LedgerError::Validation(format!(
            "Expected '<amount> <unit>', got '{}'",
            raw
        ))),
    }
}

/// Market rates from a single quote fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub hive_usd: Decimal,
    pub hbd_usd: Decimal,
    pub btc_usd: Decimal,
    pub hive_hbd: Decimal,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub fetch_date: DateTime<Utc>,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QuoteResponse {
    /// Reject quotes that carry an error or a non-positive rate.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if let Some(err) = &self.error {
            return Err(LedgerError::Quote(format!(
                "Quote from {} reported an error: {}",
                self.source, err
            )));
        }
        for (name, rate) in [
            ("hive_usd", self.hive_usd),
            ("hbd_usd", self.hbd_usd),
            ("btc_usd", self.btc_usd),
        ] {
            if rate <= Decimal::ZERO {
                return Err(LedgerError::Quote(format!(
                    "Quote from {} has non-positive {}: {}",
                    self.source, name, rate
                )));
            }
        }
        Ok(())
    }

    /// USD value of one unit of `unit`.
    pub fn usd_per_unit(&self, unit: Currency) -> Decimal {
        match unit {
            Currency::Hive => self.hive_usd,
            Currency::Hbd => self.hbd_usd,
            Currency::Usd => Decimal::ONE,
            Currency::Btc => self.btc_usd,
            Currency::Sats => self.btc_usd / SATS_PER_BTC,
            Currency::Msats => self.btc_usd / (SATS_PER_BTC * MSATS_PER_SAT),
        }
    }

    /// Satoshis per HIVE implied by this quote.
    pub fn sats_hive(&self) -> Decimal {
        if self.btc_usd.is_zero() {
            return Decimal::ZERO;
        }
        (self.hive_usd / self.btc_usd * SATS_PER_BTC).round_dp(4)
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.fetch_date
    }
}

/// One value expressed in every supported currency at `fetch_date`.
///
/// Instances are snapshots: nothing in the crate mutates one after it has been
/// built, sign changes go through [`CryptoConv::signed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoConv {
    pub hive: Decimal,
    pub hbd: Decimal,
    pub usd: Decimal,
    pub sats: Decimal,
    pub msats: Decimal,
    pub btc: Decimal,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub fetch_date: DateTime<Utc>,
    pub source: String,
}

impl CryptoConv {
    /// Value `amount` of `unit` in every currency using a single quote.
    pub fn from_quote(
        amount: Decimal,
        unit: Currency,
        quote: &QuoteResponse,
    ) -> Result<Self, LedgerError> {
        quote.validate()?;

        let usd = amount * quote.usd_per_unit(unit);
        let btc = usd / quote.btc_usd;
        let sats = btc * SATS_PER_BTC;

        let mut conv = Self {
            hive: (usd / quote.hive_usd).round_dp(6),
            hbd: (usd / quote.hbd_usd).round_dp(6),
            usd: usd.round_dp(6),
            sats: sats.round_dp(3),
            msats: (sats * MSATS_PER_SAT).round_dp(0),
            btc: btc.round_dp(11),
            fetch_date: quote.fetch_date,
            source: quote.source.clone(),
        };

        // The native unit keeps the exact input amount.
        match unit {
            Currency::Hive => conv.hive = amount,
            Currency::Hbd => conv.hbd = amount,
            Currency::Usd => conv.usd = amount,
            Currency::Btc => conv.btc = amount,
            Currency::Sats => {
                conv.sats = amount;
                conv.msats = amount * MSATS_PER_SAT;
            }
            Currency::Msats => {
                conv.msats = amount;
                conv.sats = amount / MSATS_PER_SAT;
            }
        }

        Ok(conv)
    }

    /// A zero-valued snapshot, used for placeholder legs.
    pub fn zero(fetch_date: DateTime<Utc>, source: &str) -> Self {
        Self {
            hive: Decimal::ZERO,
            hbd: Decimal::ZERO,
            usd: Decimal::ZERO,
            sats: Decimal::ZERO,
            msats: Decimal::ZERO,
            btc: Decimal::ZERO,
            fetch_date,
            source: source.to_string(),
        }
    }

    /// The amount of this value denominated in `unit`.
    pub fn value_in(&self, unit: Currency) -> Decimal {
        match unit {
            Currency::Hive => self.hive,
            Currency::Hbd => self.hbd,
            Currency::Usd => self.usd,
            Currency::Btc => self.btc,
            Currency::Sats => self.sats,
            Currency::Msats => self.msats,
        }
    }

    /// A new snapshot with every amount multiplied by `sign`.
    pub fn signed(&self, sign: Decimal) -> Self {
        Self {
            hive: self.hive * sign,
            hbd: self.hbd * sign,
            usd: self.usd * sign,
            sats: self.sats * sign,
            msats: self.msats * sign,
            btc: self.btc * sign,
            fetch_date: self.fetch_date,
            source: self.source.clone(),
        }
    }

    pub fn amounts(&self) -> ConvAmounts {
        ConvAmounts {
            hive: self.hive,
            hbd: self.hbd,
            usd: self.usd,
            sats: self.sats,
            msats: self.msats,
            btc: self.btc,
        }
    }
}

/// Summable multi-currency amounts without quote provenance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvAmounts {
    pub hive: Decimal,
    pub hbd: Decimal,
    pub usd: Decimal,
    pub sats: Decimal,
    pub msats: Decimal,
    pub btc: Decimal,
}

impl ConvAmounts {
    pub fn value_in(&self, unit: Currency) -> Decimal {
        match unit {
            Currency::Hive => self.hive,
            Currency::Hbd => self.hbd,
            Currency::Usd => self.usd,
            Currency::Btc => self.btc,
            Currency::Sats => self.sats,
            Currency::Msats => self.msats,
        }
    }

    pub fn is_zero(&self) -> bool {
        Currency::ALL.iter().all(|c| self.value_in(*c).is_zero())
    }
}

impl Add for ConvAmounts {
    type Output = ConvAmounts;

    fn add(self, rhs: ConvAmounts) -> ConvAmounts {
        ConvAmounts {
            hive: self.hive + rhs.hive,
            hbd: self.hbd + rhs.hbd,
            usd: self.usd + rhs.usd,
            sats: self.sats + rhs.sats,
            msats: self.msats + rhs.msats,
            btc: self.btc + rhs.btc,
        }
    }
}

impl AddAssign for ConvAmounts {
    fn add_assign(&mut self, rhs: ConvAmounts) {
        *self = *self + rhs;
    }
}

impl Neg for ConvAmounts {
    type Output = ConvAmounts;

    fn neg(self) -> ConvAmounts {
        ConvAmounts {
            hive: -self.hive,
            hbd: -self.hbd,
            usd: -self.usd,
            sats: -self.sats,
            msats: -self.msats,
            btc: -self.btc,
        }
    }
}

impl Sub for ConvAmounts {
    type Output = ConvAmounts;

    fn sub(self, rhs: ConvAmounts) -> ConvAmounts {
        self + (-rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn quote() -> QuoteResponse {
        QuoteResponse {
            hive_usd: dec!(0.25),
            hbd_usd: dec!(1.0),
            btc_usd: dec!(100000),
            hive_hbd: dec!(0.25),
            fetch_date: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            source: "test".to_string(),
            error: None,
        }
    }

    #[test]
    fn test_currency_parse_is_case_insensitive() {
        assert_eq!("hive".parse::<Currency>().unwrap(), Currency::Hive);
        assert_eq!(" Msats ".parse::<Currency>().unwrap(), Currency::Msats);
        assert!(matches!(
            "DOGE".parse::<Currency>(),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_parse_amount_with_unit() {
        let (amount, unit) = parse_amount_with_unit("25.000 HIVE").unwrap();
        assert_eq!(amount, dec!(25.000));
        assert_eq!(unit, Currency::Hive);
        assert!(parse_amount_with_unit("25.000").is_err());
        assert!(parse_amount_with_unit("abc HIVE").is_err());
    }

    #[test]
    fn test_from_quote_hive() {
        let conv = CryptoConv::from_quote(dec!(100), Currency::Hive, &quote()).unwrap();
        assert_eq!(conv.hive, dec!(100));
        assert_eq!(conv.usd, dec!(25));
        assert_eq!(conv.hbd, dec!(25));
        // 25 USD at 100k USD/BTC = 25_000 sats
        assert_eq!(conv.sats, dec!(25000));
        assert_eq!(conv.msats, dec!(25000000));
        assert_eq!(conv.btc, dec!(0.00025));
        assert_eq!(conv.source, "test");
    }

    #[test]
    fn test_from_quote_msats_keeps_native_amount() {
        let conv = CryptoConv::from_quote(dec!(1234567), Currency::Msats, &quote()).unwrap();
        assert_eq!(conv.msats, dec!(1234567));
        assert_eq!(conv.sats, dec!(1234.567));
    }

    #[test]
    fn test_from_quote_rejects_error_quote() {
        let mut q = quote();
        q.error = Some("rate limited".to_string());
        assert!(matches!(
            CryptoConv::from_quote(dec!(1), Currency::Hive, &q),
            Err(LedgerError::Quote(_))
        ));

        let mut q = quote();
        q.btc_usd = Decimal::ZERO;
        assert!(CryptoConv::from_quote(dec!(1), Currency::Hive, &q).is_err());
    }

    #[test]
    fn test_signed_produces_new_instance() {
        let conv = CryptoConv::from_quote(dec!(10), Currency::Hbd, &quote()).unwrap();
        let negative = conv.signed(dec!(-1));
        assert_eq!(negative.hbd, dec!(-10));
        assert_eq!(negative.usd, dec!(-10));
        assert_eq!(conv.hbd, dec!(10));
        assert_eq!(negative.signed(dec!(-1)), conv);
    }

    #[test]
    fn test_sats_hive() {
        assert_eq!(quote().sats_hive(), dec!(250));
    }

    #[test]
    fn test_conv_amounts_arithmetic() {
        let a = CryptoConv::from_quote(dec!(4), Currency::Hive, &quote())
            .unwrap()
            .amounts();
        let b = CryptoConv::from_quote(dec!(1), Currency::Hbd, &quote())
            .unwrap()
            .amounts();
        let sum = a + b;
        assert_eq!(sum.usd, dec!(2));
        assert_eq!((sum - b), a);
        assert!((a - a).is_zero());
    }
}
