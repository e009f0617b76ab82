//! Carts service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::domain::{catalog::StockError, coupons::CouponRejection, orders::errors::CheckoutError};

#[derive(Debug, Error)]
pub enum CartsServiceError {
    #[error("cart has expired")]
    CartExpired,

    #[error("cart belongs to someone else")]
    UnauthorizedCartAccess,

    #[error("cart not found")]
    NotFound,

    #[error("cart item not found")]
    CartItemNotFound,

    #[error("product not found")]
    ProductNotFound,

    #[error("product is not available")]
    ProductInactive,

    #[error("insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: u32,
        available: u32,
    },

    #[error("quantity {quantity} is outside 1..={max}")]
    InvalidQuantity { quantity: u32, max: u32 },

    #[error("coupon not found")]
    CouponNotFound,

    #[error("coupon is not active")]
    CouponInactive,

    #[error("coupon is expired or not yet valid")]
    CouponExpired,

    #[error("coupon usage limit reached")]
    CouponUsageLimitReached,

    #[error("minimum purchase of {minimum} not met (subtotal {subtotal})")]
    MinimumPurchaseNotMet { minimum: u64, subtotal: u64 },

    #[error("cart is empty")]
    EmptyCart,

    #[error("checkout failed")]
    Checkout(#[source] CheckoutError),

    #[error("cart already exists")]
    AlreadyExists,

    #[error("related resource not found")]
    InvalidReference,

    #[error("missing required data")]
    MissingRequiredData,

    #[error("invalid data")]
    InvalidData,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for CartsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            Some(ErrorKind::NotNullViolation) => Self::MissingRequiredData,
            Some(ErrorKind::CheckViolation) => Self::InvalidData,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}

impl From<StockError> for CartsServiceError {
    fn from(error: StockError) -> Self {
        match error {
            StockError::ProductNotFound | StockError::VariantNotFound => Self::ProductNotFound,
            StockError::ProductInactive => Self::ProductInactive,
            StockError::InsufficientStock {
                product,
                requested,
                available,
            } => Self::InsufficientStock {
                product,
                requested,
                available,
            },
            StockError::Sql(error) => error.into(),
        }
    }
}

impl From<CouponRejection> for CartsServiceError {
    fn from(rejection: CouponRejection) -> Self {
        match rejection {
            CouponRejection::Inactive => Self::CouponInactive,
            CouponRejection::NotYetValid | CouponRejection::Expired => Self::CouponExpired,
            CouponRejection::UsageLimitReached | CouponRejection::UserUsageLimitReached => {
                Self::CouponUsageLimitReached
            }
            CouponRejection::MinimumPurchaseNotMet { minimum, subtotal } => {
                Self::MinimumPurchaseNotMet { minimum, subtotal }
            }
        }
    }
}

impl From<CheckoutError> for CartsServiceError {
    fn from(error: CheckoutError) -> Self {
        match error {
            CheckoutError::EmptyCart => Self::EmptyCart,
            error => Self::Checkout(error),
        }
    }
}
