//! Carts

pub mod calculator;
pub mod data;
pub mod errors;
pub(crate) mod guards;
pub mod records;
pub(crate) mod repositories;
pub mod service;

pub use errors::CartsServiceError;
pub use service::*;
