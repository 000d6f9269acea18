use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

use crate::errors::{LedgerError, Result};

/// number of fraction digits carried by every currency amount (paise)
pub const CURRENCY_SCALE: u32 = 2;

/// Money type with exactly 2 decimal places (rupees and paise)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::from_parts(0, 0, 0, false, CURRENCY_SCALE));
    pub const PAISA: Money = Money(Decimal::from_parts(1, 0, 0, false, CURRENCY_SCALE));

    /// create from decimal, rejecting anything finer than one paisa
    pub fn from_decimal(d: Decimal) -> Result<Self> {
        let normalized = d.normalize();
        if normalized.scale() > CURRENCY_SCALE {
            return Err(LedgerError::Validation {
                field: "amount".to_string(),
                message: format!("{} has more than {} fraction digits", d, CURRENCY_SCALE),
            });
        }
        Ok(Money::rescaled(normalized))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self> {
        let d = Decimal::from_str(s.trim()).map_err(|e| LedgerError::Validation {
            field: "amount".to_string(),
            message: format!("'{}' is not a decimal amount: {}", s, e),
        })?;
        Money::from_decimal(d)
    }

    /// create from whole rupees
    pub fn from_major(amount: i64) -> Self {
        Money::rescaled(Decimal::from(amount))
    }

    /// create from paise
    pub fn from_minor(paise: i64) -> Self {
        Money(Decimal::new(paise, CURRENCY_SCALE))
    }

    fn rescaled(mut d: Decimal) -> Self {
        d.rescale(CURRENCY_SCALE);
        Money(d)
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// whole rupees, truncated
    pub fn rupees(&self) -> Decimal {
        self.0.trunc()
    }

    /// paise part (0..=99) of the absolute amount
    pub fn paise(&self) -> u32 {
        (self.0.abs().fract() * Decimal::ONE_HUNDRED)
            .trunc()
            .to_u32()
            .unwrap_or(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// strictly less than zero
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// split into `parts` shares truncated to whole paise; the last share
    /// absorbs the remainder so the shares always sum back to `self`
    pub fn split_even(&self, parts: u32) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }
        let share = Money::rescaled(
            (self.0 / Decimal::from(parts))
                .round_dp_with_strategy(CURRENCY_SCALE, rust_decimal::RoundingStrategy::ToZero),
        );
        let mut shares = vec![share; parts as usize];
        let allocated = share.0 * Decimal::from(parts - 1);
        if let Some(last) = shares.last_mut() {
            *last = Money::rescaled(self.0 - allocated);
        }
        shares
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Money::from_str_exact(s)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = LedgerError;

    fn try_from(d: Decimal) -> Result<Self> {
        Money::from_decimal(d)
    }
}

impl From<Money> for Decimal {
    fn from(m: Money) -> Self {
        m.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + *x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_keeps_two_places() {
        let m = Money::from_major(9_000);
        assert_eq!(m.to_string(), "9000.00");
        assert_eq!(Money::from_minor(123_450).to_string(), "1234.50");
    }

    #[test]
    fn test_sub_paisa_input_rejected() {
        let err = Money::from_str_exact("100.005").unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));

        // trailing zeros beyond two places are fine
        let m = Money::from_str_exact("100.500").unwrap();
        assert_eq!(m, Money::from_minor(10_050));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(Money::from_str_exact("ten").is_err());
    }

    #[test]
    fn test_rupees_and_paise() {
        let m = Money::from_str_exact("1234.05").unwrap();
        assert_eq!(m.rupees(), dec!(1234));
        assert_eq!(m.paise(), 5);
        assert_eq!(Money::from_major(7).paise(), 0);
    }

    #[test]
    fn test_split_even_exact() {
        let shares = Money::from_major(9_000).split_even(3);
        assert_eq!(shares, vec![Money::from_major(3_000); 3]);
    }

    #[test]
    fn test_split_even_remainder_on_last() {
        let shares = Money::from_major(10_000).split_even(3);
        assert_eq!(shares[0], Money::from_minor(333_333));
        assert_eq!(shares[1], Money::from_minor(333_333));
        assert_eq!(shares[2], Money::from_minor(333_334));
        assert_eq!(shares.iter().sum::<Money>(), Money::from_major(10_000));
    }

    #[test]
    fn test_split_even_truncates_so_last_is_largest() {
        // 200 / 3 = 66.666.. -> 66.66, 66.66, 66.68
        let shares = Money::from_major(200).split_even(3);
        assert_eq!(shares[0], Money::from_minor(6_666));
        assert_eq!(shares[2], Money::from_minor(6_668));
        assert!(shares[2] >= shares[0]);
    }

    #[test]
    fn test_serde_round_trip_as_string() {
        let m = Money::from_minor(333_334);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "\"3333.34\"");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);

        let bad: std::result::Result<Money, _> = serde_json::from_str("\"1.234\"");
        assert!(bad.is_err());
    }
}
