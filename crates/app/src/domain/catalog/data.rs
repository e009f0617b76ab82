//! Catalog Data

use crate::domain::catalog::records::{ProductUuid, VariantUuid};

/// New Product Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub uuid: ProductUuid,
    pub name: String,
    pub sku: String,
    pub price: u64,
    pub stock: u32,
    pub is_active: bool,
}

/// New Variant Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewVariant {
    pub uuid: VariantUuid,
    pub product_uuid: ProductUuid,
    pub name: String,
    pub sku: String,
    pub price: u64,
    pub stock: u32,
}
