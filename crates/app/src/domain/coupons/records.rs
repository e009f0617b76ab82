//! Coupon Records

use jiff::Timestamp;
use rust_decimal::Decimal;

use crate::uuids::TypedUuid;

/// Coupon UUID
pub type CouponUuid = TypedUuid<CouponRecord>;

/// How a coupon reduces the subtotal.
#[derive(Debug, Clone, PartialEq)]
pub enum CouponDiscount {
    /// Fixed amount off, in minor units.
    FixedAmount { amount: u64 },

    /// Percent off (`15` means 15%), optionally capped.
    Percentage {
        percentage: Decimal,
        max_discount: Option<u64>,
    },

    /// A stored kind this service does not know how to apply. Worth nothing.
    Unsupported { kind: String },
}

impl CouponDiscount {
    /// Kind column value.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::FixedAmount { .. } => "fixed",
            Self::Percentage { .. } => "percentage",
            Self::Unsupported { kind } => kind,
        }
    }
}

/// Coupon Record
#[derive(Debug, Clone, PartialEq)]
pub struct CouponRecord {
    pub uuid: CouponUuid,
    pub code: String,
    pub discount: CouponDiscount,
    pub min_purchase_amount: Option<u64>,
    pub usage_limit: Option<u64>,
    pub usage_limit_per_user: Option<u64>,
    pub used_count: u64,
    pub is_active: bool,
    pub starts_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Canonical form of a coupon code as typed by a shopper.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
