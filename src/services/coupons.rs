use chrono::Utc;
use uuid::Uuid;

use crate::domain::aggregates::{AppliedCoupon, Coupon, CouponChanges, CouponError, CouponRejection, NewCoupon};
use crate::domain::value_objects::{CouponCode, Money};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Resolves a customer-entered code against an order amount.
pub async fn validate_coupon(state: &AppState, code: &str, order_amount: Money) -> Result<AppliedCoupon> {
    let code = CouponCode::new(code).map_err(|_| CouponRejection::Unknown)?;
    let coupon = state.store.find_coupon_by_code(&code).await?.ok_or(CouponRejection::Unknown)?;
    Ok(coupon.check(order_amount, Utc::now())?)
}

pub async fn list_coupons(state: &AppState) -> Result<Vec<Coupon>> {
    state.store.list_coupons().await
}

pub async fn create_coupon(state: &AppState, new: NewCoupon) -> Result<Coupon> {
    if state.store.find_coupon_by_code(&new.code).await?.is_some() {
        return Err(CouponError::DuplicateCode.into());
    }
    let mut coupon = Coupon::create(new)?;
    state.store.insert_coupon(&coupon).await?;
    tracing::info!(coupon_id = %coupon.id, code = %coupon.code, "Coupon created");
    state.events.publish_all(coupon.take_events()).await;
    Ok(coupon)
}

pub async fn update_coupon(state: &AppState, id: Uuid, changes: CouponChanges) -> Result<Coupon> {
    let mut coupon = state
        .store
        .get_coupon(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Coupon not found".into()))?;
    if let Some(code) = &changes.code {
        if let Some(other) = state.store.find_coupon_by_code(code).await? {
            if other.id != id {
                return Err(CouponError::DuplicateCode.into());
            }
        }
    }
    coupon.apply_changes(changes)?;
    state.store.update_coupon(&coupon).await?;
    Ok(coupon)
}

pub async fn delete_coupon(state: &AppState, id: Uuid) -> Result<()> {
    if !state.store.delete_coupon(id).await? {
        return Err(AppError::NotFound("Coupon not found".into()));
    }
    tracing::info!(coupon_id = %id, "Coupon deleted");
    Ok(())
}
