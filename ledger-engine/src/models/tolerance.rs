//! Tolerances for cross-leg conversion checks.
//!
//! Each leg of an entry carries its own conversion, often taken from quotes
//! fetched moments apart, so exact equality between legs is not expected.

use super::conv::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Absolute tolerance per currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsTolerance {
    pub hive: Decimal,
    pub hbd: Decimal,
    pub usd: Decimal,
    pub btc: Decimal,
    pub sats: Decimal,
    pub msats: Decimal,
}

impl Default for AbsTolerance {
    fn default() -> Self {
        Self {
            hive: Decimal::new(1, 3),
            hbd: Decimal::new(1, 3),
            usd: Decimal::new(1, 2),
            btc: Decimal::new(1, 8),
            sats: Decimal::ONE,
            msats: Decimal::TEN,
        }
    }
}

impl AbsTolerance {
    pub fn for_unit(&self, unit: Currency) -> Decimal {
        match unit {
            Currency::Hive => self.hive,
            Currency::Hbd => self.hbd,
            Currency::Usd => self.usd,
            Currency::Btc => self.btc,
            Currency::Sats => self.sats,
            Currency::Msats => self.msats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceConfig {
    /// Relative tolerance for the amount/conversion cross-check.
    pub rel_tol: Decimal,
    pub abs_tol: AbsTolerance,
    /// Largest msats gap between the two legs' conversions for a completed entry.
    pub msats_balance_tol: Decimal,
    /// Relative tolerance for the balance sheet identity.
    pub balance_sheet_rel_tol: Decimal,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            rel_tol: Decimal::new(1, 2),
            abs_tol: AbsTolerance::default(),
            msats_balance_tol: Decimal::TEN,
            balance_sheet_rel_tol: Decimal::new(1, 2),
        }
    }
}

/// `math.isclose` semantics: `|a - b| <= max(rel_tol * max(|a|, |b|), abs_tol)`.
pub fn isclose(a: Decimal, b: Decimal, rel_tol: Decimal, abs_tol: Decimal) -> bool {
    if a == b {
        return true;
    }
    let diff = (a - b).abs();
    let scale = a.abs().max(b.abs());
    diff <= (rel_tol * scale).max(abs_tol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_isclose_absolute() {
        assert!(isclose(dec!(100), dec!(109), dec!(0), dec!(10)));
        assert!(!isclose(dec!(100), dec!(111), dec!(0), dec!(10)));
    }

    #[test]
    fn test_isclose_relative() {
        assert!(isclose(dec!(1000), dec!(1009), dec!(0.01), dec!(0)));
        assert!(!isclose(dec!(1000), dec!(1020), dec!(0.01), dec!(0)));
    }

    #[test]
    fn test_isclose_zero() {
        assert!(isclose(Decimal::ZERO, Decimal::ZERO, dec!(0), dec!(0)));
        assert!(!isclose(Decimal::ZERO, dec!(0.1), dec!(0.5), dec!(0)));
    }

    #[test]
    fn test_default_table() {
        let tol = ToleranceConfig::default();
        assert_eq!(tol.abs_tol.for_unit(Currency::Hive), dec!(0.001));
        assert_eq!(tol.abs_tol.for_unit(Currency::Msats), dec!(10));
        assert!(tol.abs_tol.for_unit(Currency::Hive) < tol.abs_tol.for_unit(Currency::Msats));
        assert_eq!(tol.msats_balance_tol, dec!(10));
    }
}
