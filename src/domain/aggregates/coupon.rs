//! Coupon Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::{CouponEvent, DomainEvent};
use crate::domain::value_objects::{CouponCode, DiscountPercent, Money};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: Uuid,
    pub code: CouponCode,
    pub discount: DiscountPercent,
    pub description: Option<String>,
    pub is_active: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub min_amount: Option<Money>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) events: Vec<DomainEvent>,
}

/// Fields accepted when an administrator creates a coupon.
#[derive(Clone, Debug)]
pub struct NewCoupon {
    pub code: CouponCode,
    pub discount: DiscountPercent,
    pub description: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub min_amount: Option<Money>,
}

/// Partial update. The outer `Option` is "leave unchanged"; the inner one
/// clears a nullable field.
#[derive(Clone, Debug, Default)]
pub struct CouponChanges {
    pub code: Option<CouponCode>,
    pub discount: Option<DiscountPercent>,
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub valid_from: Option<Option<DateTime<Utc>>>,
    pub valid_until: Option<Option<DateTime<Utc>>>,
    pub max_uses: Option<Option<i32>>,
    pub min_amount: Option<Option<Money>>,
}

/// What a successful validation hands back to the preview step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCoupon {
    pub id: Uuid,
    pub code: CouponCode,
    pub discount: DiscountPercent,
    pub description: Option<String>,
}

impl Coupon {
    pub fn create(new: NewCoupon) -> Result<Self, CouponError> {
        if matches!(new.max_uses, Some(n) if n < 0) { return Err(CouponError::InvalidMaxUses); }
        if let (Some(from), Some(until)) = (new.valid_from, new.valid_until) {
            if until < from { return Err(CouponError::InvalidWindow); }
        }
        let now = Utc::now();
        let mut coupon = Self {
            id: Uuid::new_v4(), code: new.code, discount: new.discount, description: new.description,
            is_active: true, valid_from: new.valid_from, valid_until: new.valid_until, max_uses: new.max_uses,
            used_count: 0, min_amount: new.min_amount, created_at: now, updated_at: now, events: vec![],
        };
        coupon.raise_event(DomainEvent::Coupon(CouponEvent::Created { coupon_id: coupon.id, code: coupon.code.clone() }));
        Ok(coupon)
    }

    /// Checks run in a fixed order and the first failure wins.
    pub fn check(&self, order_amount: Money, now: DateTime<Utc>) -> Result<AppliedCoupon, CouponRejection> {
        if !self.is_active { return Err(CouponRejection::Inactive); }
        if matches!(self.valid_until, Some(until) if until < now) { return Err(CouponRejection::Expired); }
        // A cap of 0 means unlimited.
        if matches!(self.max_uses, Some(max) if max > 0 && self.used_count >= max) { return Err(CouponRejection::UsageLimitReached); }
        if let Some(min) = self.min_amount {
            if order_amount < min { return Err(CouponRejection::BelowMinimum(min)); }
        }
        if matches!(self.valid_from, Some(from) if from > now) { return Err(CouponRejection::NotYetValid); }
        Ok(self.applied())
    }

    pub fn applied(&self) -> AppliedCoupon {
        AppliedCoupon { id: self.id, code: self.code.clone(), discount: self.discount, description: self.description.clone() }
    }

    /// Rejected changes leave the coupon untouched.
    pub fn apply_changes(&mut self, changes: CouponChanges) -> Result<(), CouponError> {
        if matches!(changes.max_uses, Some(Some(n)) if n < 0) { return Err(CouponError::InvalidMaxUses); }
        let valid_from = changes.valid_from.unwrap_or(self.valid_from);
        let valid_until = changes.valid_until.unwrap_or(self.valid_until);
        if let (Some(from), Some(until)) = (valid_from, valid_until) {
            if until < from { return Err(CouponError::InvalidWindow); }
        }

        if let Some(code) = changes.code { self.code = code; }
        if let Some(discount) = changes.discount { self.discount = discount; }
        if let Some(description) = changes.description { self.description = description; }
        if let Some(active) = changes.is_active { self.is_active = active; }
        if let Some(max) = changes.max_uses { self.max_uses = max; }
        if let Some(min) = changes.min_amount { self.min_amount = min; }
        self.valid_from = valid_from;
        self.valid_until = valid_until;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

/// Why a coupon cannot be applied. The messages are shown to customers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("Invalid coupon code")]
    Unknown,
    #[error("This coupon is not active")]
    Inactive,
    #[error("This coupon has expired")]
    Expired,
    #[error("This coupon has reached its usage limit")]
    UsageLimitReached,
    #[error("Minimum order amount of {0} required")]
    BelowMinimum(Money),
    #[error("This coupon is not yet valid")]
    NotYetValid,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    #[error("Coupon code already exists")]
    DuplicateCode,
    #[error("Maximum uses cannot be negative")]
    InvalidMaxUses,
    #[error("Coupon validity ends before it starts")]
    InvalidWindow,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(code: &str, percent: i32) -> Coupon {
        Coupon::create(NewCoupon {
            code: CouponCode::new(code).unwrap(), discount: DiscountPercent::new(percent).unwrap(),
            description: None, valid_from: None, valid_until: None, max_uses: None, min_amount: None,
        }).unwrap()
    }

    #[test]
    fn test_valid_coupon() {
        let c = coupon("save10", 10);
        let applied = c.check(Money::from_cents(1400), Utc::now()).unwrap();
        assert_eq!(applied.code.as_str(), "SAVE10");
        assert_eq!(applied.discount.value(), 10);
    }

    #[test]
    fn test_rejections() {
        let now = Utc::now();
        let mut c = coupon("X", 10);
        c.is_active = false;
        assert_eq!(c.check(Money::from_cents(1400), now), Err(CouponRejection::Inactive));

        let mut c = coupon("X", 10);
        c.valid_until = Some(now - Duration::days(1));
        assert_eq!(c.check(Money::from_cents(1400), now), Err(CouponRejection::Expired));

        let mut c = coupon("X", 10);
        c.max_uses = Some(3);
        c.used_count = 3;
        assert_eq!(c.check(Money::from_cents(1400), now), Err(CouponRejection::UsageLimitReached));

        let mut c = coupon("X", 10);
        c.min_amount = Some(Money::from_cents(2000));
        let err = c.check(Money::from_cents(1400), now).unwrap_err();
        assert_eq!(err.to_string(), "Minimum order amount of $20.00 required");

        let mut c = coupon("X", 10);
        c.valid_from = Some(now + Duration::days(1));
        assert_eq!(c.check(Money::from_cents(1400), now), Err(CouponRejection::NotYetValid));
    }

    #[test]
    fn test_first_failure_wins() {
        let now = Utc::now();
        let mut c = coupon("X", 10);
        c.is_active = false;
        c.valid_until = Some(now - Duration::days(1));
        assert_eq!(c.check(Money::ZERO, now), Err(CouponRejection::Inactive));
    }

    #[test]
    fn test_zero_max_uses_is_unlimited() {
        let mut c = coupon("X", 10);
        c.max_uses = Some(0);
        c.used_count = 42;
        assert!(c.check(Money::from_cents(1400), Utc::now()).is_ok());
    }

    #[test]
    fn test_changes_clear_nullable_fields() {
        let mut c = coupon("X", 10);
        c.max_uses = Some(5);
        c.apply_changes(CouponChanges { max_uses: Some(None), is_active: Some(false), ..Default::default() }).unwrap();
        assert_eq!(c.max_uses, None);
        assert!(!c.is_active);
    }

    #[test]
    fn test_rejected_changes_leave_coupon_untouched() {
        let now = Utc::now();
        let mut c = coupon("X", 10);
        c.valid_until = Some(now);
        let err = c.apply_changes(CouponChanges {
            code: Some(CouponCode::new("Y").unwrap()),
            is_active: Some(false),
            valid_from: Some(Some(now + Duration::days(1))),
            ..Default::default()
        });
        assert_eq!(err, Err(CouponError::InvalidWindow));
        assert_eq!(c.code.as_str(), "X");
        assert!(c.is_active);
        assert_eq!(c.valid_from, None);

        let err = c.apply_changes(CouponChanges { discount: Some(DiscountPercent::new(50).unwrap()), max_uses: Some(Some(-1)), ..Default::default() });
        assert_eq!(err, Err(CouponError::InvalidMaxUses));
        assert_eq!(c.discount.value(), 10);
    }

    #[test]
    fn test_create_raises_event() {
        let mut c = coupon("X", 10);
        assert_eq!(c.take_events().len(), 1);
        assert!(c.take_events().is_empty());
    }
}
