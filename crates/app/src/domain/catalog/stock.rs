//! Stock Validator
//!
//! Checks that an item exists, is sellable and has enough stock. Every
//! operation runs inside the caller's transaction so a lock taken by
//! [`StockValidator::validate_stock`] lasts until that transaction ends.

use sqlx::{Postgres, Transaction};
use thiserror::Error;

use crate::domain::catalog::{
    records::{ProductRecord, ProductUuid, SellableItem, StockRef, VariantRecord, VariantUuid},
    repository::PgCatalogRepository,
};

#[derive(Debug, Error)]
pub enum StockError {
    #[error("product not found")]
    ProductNotFound,

    #[error("product is not active")]
    ProductInactive,

    #[error("variant not found")]
    VariantNotFound,

    #[error("insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: u32,
        available: u32,
    },

    #[error("storage error")]
    Sql(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Default)]
pub struct StockValidator {
    repository: PgCatalogRepository,
}

impl StockValidator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            repository: PgCatalogRepository::new(),
        }
    }

    /// The product, when it exists and is active.
    pub async fn validate_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<ProductRecord, StockError> {
        let product = self
            .repository
            .get_product(tx, product)
            .await?
            .ok_or(StockError::ProductNotFound)?;

        if !product.is_active {
            return Err(StockError::ProductInactive);
        }

        Ok(product)
    }

    /// The variant, when it exists and its parent product is active.
    pub async fn validate_variant(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        variant: VariantUuid,
    ) -> Result<(ProductRecord, VariantRecord), StockError> {
        let variant = self
            .repository
            .get_variant(tx, variant)
            .await?
            .ok_or(StockError::VariantNotFound)?;

        let product = self.validate_product(tx, variant.product_uuid).await?;

        Ok((product, variant))
    }

    /// Validates a product and, when given, one of its variants.
    pub async fn resolve(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        variant: Option<VariantUuid>,
    ) -> Result<SellableItem, StockError> {
        let Some(variant) = variant else {
            let product = self.validate_product(tx, product).await?;

            return Ok(SellableItem {
                product,
                variant: None,
            });
        };

        let (parent, variant) = self.validate_variant(tx, variant).await?;

        if parent.uuid != product {
            return Err(StockError::VariantNotFound);
        }

        Ok(SellableItem {
            product: parent,
            variant: Some(variant),
        })
    }

    /// Locks the item's stock row and checks `quantity` against it. Returns
    /// the available stock on success.
    pub async fn validate_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: &SellableItem,
        quantity: u32,
    ) -> Result<u32, StockError> {
        let available = self.lock_stock(tx, item.stock_ref()).await?;

        if quantity > available {
            return Err(StockError::InsufficientStock {
                product: item.display_name(),
                requested: quantity,
                available,
            });
        }

        Ok(available)
    }

    /// Current stock without a lock; `0` for a missing row.
    pub async fn available_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        stock: StockRef,
    ) -> Result<u32, StockError> {
        Ok(self.repository.get_stock(tx, stock).await?.unwrap_or(0))
    }

    /// Current stock under a row lock; `0` for a missing row.
    pub async fn lock_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        stock: StockRef,
    ) -> Result<u32, StockError> {
        Ok(self.repository.lock_stock(tx, stock).await?.unwrap_or(0))
    }
}
