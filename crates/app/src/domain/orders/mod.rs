//! Orders

pub mod data;
pub mod errors;
pub mod numbers;
pub mod records;
pub(crate) mod repository;
pub mod service;

pub use errors::CheckoutError;
pub use service::*;
