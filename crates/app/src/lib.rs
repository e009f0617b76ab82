//! Cart, coupon and checkout services for the storefront.

pub mod context;
pub mod database;
pub mod domain;
pub mod events;
pub mod payments;
pub mod settings;

#[cfg(test)]
mod test;

pub mod uuids;
