//! Catalog
//!
//! The slice of the product catalog that checkout reads and locks.

pub mod data;
pub mod records;
pub(crate) mod repository;
pub mod stock;

pub use stock::StockError;
