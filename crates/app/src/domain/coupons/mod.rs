//! Coupons

pub mod data;
pub mod records;
pub(crate) mod repository;
pub mod validator;

pub use validator::{CouponCheck, CouponRejection, validate_coupon};
