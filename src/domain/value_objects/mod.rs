//! Value Objects for the storefront

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Coupon code value object. Codes compare case-insensitively, so they are
/// stored trimmed and uppercased.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CouponCode(String);

impl CouponCode {
    pub const MAX_LEN: usize = 32;

    pub fn new(value: impl AsRef<str>) -> Result<Self, CouponCodeError> {
        let value = value.as_ref().trim().to_uppercase();
        if value.is_empty() { return Err(CouponCodeError::Empty); }
        if value.len() > Self::MAX_LEN { return Err(CouponCodeError::TooLong); }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(CouponCodeError::InvalidCharacter);
        }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<String> for CouponCode {
    type Error = CouponCodeError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<CouponCode> for String {
    fn from(code: CouponCode) -> Self { code.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponCodeError {
    #[error("Coupon code is empty")]
    Empty,
    #[error("Coupon code is too long")]
    TooLong,
    #[error("Coupon code may only contain letters, digits, '-' and '_'")]
    InvalidCharacter,
}

/// Percentage discount, bounded to [0, 100].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct DiscountPercent(u8);

impl DiscountPercent {
    pub const NONE: Self = Self(0);

    pub fn new(value: i32) -> Result<Self, DiscountError> {
        u8::try_from(value).ok().filter(|v| *v <= 100).map(Self).ok_or(DiscountError::OutOfRange(value))
    }
    pub fn value(&self) -> u8 { self.0 }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
}

impl TryFrom<i32> for DiscountPercent {
    type Error = DiscountError;
    fn try_from(value: i32) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<DiscountPercent> for i32 {
    fn from(p: DiscountPercent) -> Self { i32::from(p.0) }
}

impl fmt::Display for DiscountPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}%", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscountError {
    #[error("Discount must be between 0 and 100, got {0}")]
    OutOfRange(i32),
}

/// Money value object: an amount of US cents. Never negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct Money(i64);

impl Money {
    pub const ZERO: Self = Self(0);

    pub const fn from_cents(cents: i64) -> Self { Self(if cents < 0 { 0 } else { cents }) }
    pub const fn cents(&self) -> i64 { self.0 }
    pub fn add(&self, other: Money) -> Money { Money(self.0.saturating_add(other.0)) }
    pub fn saturating_sub(&self, other: Money) -> Money { Money::from_cents(self.0.saturating_sub(other.0)) }

    /// `percent` of this amount, rounded half away from zero to whole cents.
    pub fn percentage(&self, percent: DiscountPercent) -> Money {
        let share = Decimal::from(self.0) * Decimal::from(percent.value()) / Decimal::ONE_HUNDRED;
        let rounded = share.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        Money::from_cents(rounded.to_i64().unwrap_or(i64::MAX))
    }
}

impl From<i64> for Money {
    fn from(cents: i64) -> Self { Self::from_cents(cents) }
}

impl From<Money> for i64 {
    fn from(money: Money) -> Self { money.0 }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coupon_code_normalized() {
        let code = CouponCode::new("  summer-10 ").unwrap();
        assert_eq!(code.as_str(), "SUMMER-10");
        assert_eq!(CouponCode::new("   "), Err(CouponCodeError::Empty));
        assert_eq!(CouponCode::new("TEN OFF"), Err(CouponCodeError::InvalidCharacter));
        assert_eq!(CouponCode::new("X".repeat(33)), Err(CouponCodeError::TooLong));
    }

    #[test]
    fn test_discount_bounds() {
        assert!(DiscountPercent::new(0).is_ok());
        assert!(DiscountPercent::new(100).is_ok());
        assert_eq!(DiscountPercent::new(101), Err(DiscountError::OutOfRange(101)));
        assert_eq!(DiscountPercent::new(-5), Err(DiscountError::OutOfRange(-5)));
    }

    #[test]
    fn test_money_percentage_rounds_half_away() {
        let price = Money::from_cents(1450);
        // 1450 * 15% = 217.5
        assert_eq!(price.percentage(DiscountPercent::new(15).unwrap()).cents(), 218);
        assert_eq!(price.percentage(DiscountPercent::new(100).unwrap()), price);
        assert_eq!(price.percentage(DiscountPercent::NONE), Money::ZERO);
    }

    #[test]
    fn test_money_never_negative() {
        assert_eq!(Money::from_cents(-10), Money::ZERO);
        assert_eq!(Money::from_cents(100).saturating_sub(Money::from_cents(300)), Money::ZERO);
        assert_eq!(Money::from_cents(1905).to_string(), "$19.05");
    }
}
