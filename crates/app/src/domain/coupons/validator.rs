//! Coupon Validator
//!
//! Rules are checked in a fixed order and the first failure wins. Nothing
//! here touches storage; callers load the coupon and the redemption count.

use jiff::Timestamp;
use thiserror::Error;

use crate::domain::coupons::records::CouponRecord;

/// Why a coupon cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("coupon is not active")]
    Inactive,

    #[error("coupon is not valid yet")]
    NotYetValid,

    #[error("coupon has expired")]
    Expired,

    #[error("coupon usage limit reached")]
    UsageLimitReached,

    #[error("coupon already used the maximum number of times by this user")]
    UserUsageLimitReached,

    #[error("minimum purchase of {minimum} not met (subtotal {subtotal})")]
    MinimumPurchaseNotMet { minimum: u64, subtotal: u64 },
}

/// Context a coupon is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouponCheck {
    pub now: Timestamp,
    pub subtotal: u64,

    /// Redemptions by the acting user; `None` for guests, which skips the
    /// per-user limit.
    pub user_redemptions: Option<u64>,
}

/// Checks `coupon` against `check`.
///
/// # Errors
///
/// Returns the first rule the coupon fails.
pub fn validate_coupon(coupon: &CouponRecord, check: &CouponCheck) -> Result<(), CouponRejection> {
    if !coupon.is_active {
        return Err(CouponRejection::Inactive);
    }

    if coupon.starts_at.is_some_and(|start| check.now < start) {
        return Err(CouponRejection::NotYetValid);
    }

    if coupon
        .expires_at
        .is_some_and(|expires_at| check.now > expires_at)
    {
        return Err(CouponRejection::Expired);
    }

    if coupon
        .usage_limit
        .is_some_and(|limit| coupon.used_count >= limit)
    {
        return Err(CouponRejection::UsageLimitReached);
    }

    if let (Some(limit), Some(redemptions)) = (coupon.usage_limit_per_user, check.user_redemptions)
        && redemptions >= limit
    {
        return Err(CouponRejection::UserUsageLimitReached);
    }

    if let Some(minimum) = coupon.min_purchase_amount
        && check.subtotal < minimum
    {
        return Err(CouponRejection::MinimumPurchaseNotMet {
            minimum,
            subtotal: check.subtotal,
        });
    }

    Ok(())
}
