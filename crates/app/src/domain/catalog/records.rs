//! Catalog Records

use jiff::Timestamp;

use crate::uuids::TypedUuid;

/// Product UUID
pub type ProductUuid = TypedUuid<ProductRecord>;

/// Product Record
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub uuid: ProductUuid,
    pub name: String,
    pub sku: String,
    pub price: u64,
    pub stock: u32,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Variant UUID
pub type VariantUuid = TypedUuid<VariantRecord>;

/// Variant Record
///
/// Variants carry their own price and stock but no activation flag; the
/// parent product's flag governs them.
#[derive(Debug, Clone)]
pub struct VariantRecord {
    pub uuid: VariantUuid,
    pub product_uuid: ProductUuid,
    pub name: String,
    pub sku: String,
    pub price: u64,
    pub stock: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// The stock row a cart line draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockRef {
    Product(ProductUuid),
    Variant(VariantUuid),
}

impl StockRef {
    /// The variant's row when a variant is given, else the product's.
    #[must_use]
    pub fn of(product: ProductUuid, variant: Option<VariantUuid>) -> Self {
        variant.map_or(Self::Product(product), Self::Variant)
    }
}

/// A validated product, optionally narrowed to one of its variants.
#[derive(Debug, Clone)]
pub struct SellableItem {
    pub product: ProductRecord,
    pub variant: Option<VariantRecord>,
}

impl SellableItem {
    /// Price a new cart line captures.
    #[must_use]
    pub fn unit_price(&self) -> u64 {
        self.variant
            .as_ref()
            .map_or(self.product.price, |variant| variant.price)
    }

    #[must_use]
    pub fn sku(&self) -> &str {
        self.variant
            .as_ref()
            .map_or(self.product.sku.as_str(), |variant| variant.sku.as_str())
    }

    /// Name shown on orders: `product` or `product - variant`.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.variant {
            Some(variant) => format!("{} - {}", self.product.name, variant.name),
            None => self.product.name.clone(),
        }
    }

    #[must_use]
    pub fn stock_ref(&self) -> StockRef {
        StockRef::of(
            self.product.uuid,
            self.variant.as_ref().map(|variant| variant.uuid),
        )
    }
}
