//! Storefront Domain Concerns

pub mod actors;
pub mod carts;
pub mod catalog;
pub(crate) mod columns;
pub mod coupons;
pub mod orders;
