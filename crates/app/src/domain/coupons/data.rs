//! Coupon Data

use jiff::Timestamp;

use crate::domain::coupons::records::{CouponDiscount, CouponUuid};

/// New Coupon Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewCoupon {
    pub uuid: CouponUuid,
    pub code: String,
    pub discount: CouponDiscount,
    pub min_purchase_amount: Option<u64>,
    pub usage_limit: Option<u64>,
    pub usage_limit_per_user: Option<u64>,
    pub is_active: bool,
    pub starts_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
}

impl NewCoupon {
    /// An active, unrestricted coupon with the given code and discount.
    #[must_use]
    pub fn new(code: impl Into<String>, discount: CouponDiscount) -> Self {
        Self {
            uuid: CouponUuid::new(),
            code: code.into(),
            discount,
            min_purchase_amount: None,
            usage_limit: None,
            usage_limit_per_user: None,
            is_active: true,
            starts_at: None,
            expires_at: None,
        }
    }
}
