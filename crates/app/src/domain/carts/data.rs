//! Cart Data

use crate::domain::{
    carts::records::CartItemUuid,
    catalog::records::{ProductUuid, VariantUuid},
};

/// New Cart Item Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewCartItem {
    pub uuid: CartItemUuid,
    pub product_uuid: ProductUuid,
    pub variant_uuid: Option<VariantUuid>,
    pub quantity: u32,
}

impl NewCartItem {
    #[must_use]
    pub fn new(
        product_uuid: ProductUuid,
        variant_uuid: Option<VariantUuid>,
        quantity: u32,
    ) -> Self {
        Self {
            uuid: CartItemUuid::new(),
            product_uuid,
            variant_uuid,
            quantity,
        }
    }
}
