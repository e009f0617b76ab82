//! Catalog Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};
use uuid::Uuid;

use crate::domain::{
    catalog::records::{ProductRecord, ProductUuid, StockRef, VariantRecord, VariantUuid},
    columns::{try_get_amount, try_get_count, try_i32_from_u32},
};

const GET_PRODUCT_SQL: &str = include_str!("sql/get_product.sql");
const GET_VARIANT_SQL: &str = include_str!("sql/get_variant.sql");
const GET_PRODUCT_STOCK_SQL: &str = include_str!("sql/get_product_stock.sql");
const GET_VARIANT_STOCK_SQL: &str = include_str!("sql/get_variant_stock.sql");
const LOCK_PRODUCT_STOCK_SQL: &str = include_str!("sql/lock_product_stock.sql");
const LOCK_VARIANT_STOCK_SQL: &str = include_str!("sql/lock_variant_stock.sql");
const DECREMENT_PRODUCT_STOCK_SQL: &str = include_str!("sql/decrement_product_stock.sql");
const DECREMENT_VARIANT_STOCK_SQL: &str = include_str!("sql/decrement_variant_stock.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCatalogRepository;

impl PgCatalogRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<Option<ProductRecord>, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(GET_PRODUCT_SQL)
            .bind(product.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn get_variant(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        variant: VariantUuid,
    ) -> Result<Option<VariantRecord>, sqlx::Error> {
        query_as::<Postgres, VariantRecord>(GET_VARIANT_SQL)
            .bind(variant.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    /// Reads a stock level without locking. `None` when the row is missing.
    pub(crate) async fn get_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        stock: StockRef,
    ) -> Result<Option<u32>, sqlx::Error> {
        let (sql, uuid) = match stock {
            StockRef::Product(product) => (GET_PRODUCT_STOCK_SQL, product.into_uuid()),
            StockRef::Variant(variant) => (GET_VARIANT_STOCK_SQL, variant.into_uuid()),
        };

        fetch_stock(tx, sql, uuid).await
    }

    /// Reads a stock level and holds a row lock on it until the transaction
    /// ends.
    pub(crate) async fn lock_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        stock: StockRef,
    ) -> Result<Option<u32>, sqlx::Error> {
        let (sql, uuid) = match stock {
            StockRef::Product(product) => (LOCK_PRODUCT_STOCK_SQL, product.into_uuid()),
            StockRef::Variant(variant) => (LOCK_VARIANT_STOCK_SQL, variant.into_uuid()),
        };

        fetch_stock(tx, sql, uuid).await
    }

    /// Decrements stock only when enough remains. Returns the affected row
    /// count, so `0` means the decrement was refused.
    pub(crate) async fn decrement_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        stock: StockRef,
        quantity: u32,
    ) -> Result<u64, sqlx::Error> {
        let (sql, uuid) = match stock {
            StockRef::Product(product) => (DECREMENT_PRODUCT_STOCK_SQL, product.into_uuid()),
            StockRef::Variant(variant) => (DECREMENT_VARIANT_STOCK_SQL, variant.into_uuid()),
        };

        let rows_affected = query(sql)
            .bind(uuid)
            .bind(try_i32_from_u32(quantity, "stock")?)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    #[cfg(test)]
    pub(crate) async fn create_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: crate::domain::catalog::data::NewProduct,
    ) -> Result<ProductRecord, sqlx::Error> {
        use crate::domain::columns::try_i64_from_u64;

        query_as::<Postgres, ProductRecord>(include_str!("sql/create_product.sql"))
            .bind(product.uuid.into_uuid())
            .bind(product.name)
            .bind(product.sku)
            .bind(try_i64_from_u64(product.price, "price")?)
            .bind(try_i32_from_u32(product.stock, "stock")?)
            .bind(product.is_active)
            .fetch_one(&mut **tx)
            .await
    }

    #[cfg(test)]
    pub(crate) async fn create_variant(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        variant: crate::domain::catalog::data::NewVariant,
    ) -> Result<VariantRecord, sqlx::Error> {
        use crate::domain::columns::try_i64_from_u64;

        query_as::<Postgres, VariantRecord>(include_str!("sql/create_variant.sql"))
            .bind(variant.uuid.into_uuid())
            .bind(variant.product_uuid.into_uuid())
            .bind(variant.name)
            .bind(variant.sku)
            .bind(try_i64_from_u64(variant.price, "price")?)
            .bind(try_i32_from_u32(variant.stock, "stock")?)
            .fetch_one(&mut **tx)
            .await
    }
}

async fn fetch_stock(
    tx: &mut Transaction<'_, Postgres>,
    sql: &'static str,
    uuid: Uuid,
) -> Result<Option<u32>, sqlx::Error> {
    let stock: Option<i32> = query_scalar(sql)
        .bind(uuid)
        .fetch_optional(&mut **tx)
        .await?;

    stock
        .map(u32::try_from)
        .transpose()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "stock".to_string(),
            source: Box::new(e),
        })
}

impl<'r> FromRow<'r, PgRow> for ProductRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: ProductUuid::from_uuid(row.try_get("uuid")?),
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            price: try_get_amount(row, "price")?,
            stock: try_get_count(row, "stock")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for VariantRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: VariantUuid::from_uuid(row.try_get("uuid")?),
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            price: try_get_amount(row, "price")?,
            stock: try_get_count(row, "stock")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
