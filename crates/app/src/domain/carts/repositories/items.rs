//! Cart Items Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::{
    carts::{
        data::NewCartItem,
        records::{CartItemRecord, CartItemUuid, CartUuid},
    },
    catalog::records::{ProductUuid, VariantUuid},
    columns::{try_get_amount, try_get_count, try_i32_from_u32, try_i64_from_u64},
};

const LIST_CART_ITEMS_SQL: &str = include_str!("../sql/list_cart_items.sql");
const FIND_CART_ITEM_SQL: &str = include_str!("../sql/find_cart_item.sql");
const FIND_CART_LINE_SQL: &str = include_str!("../sql/find_cart_line.sql");
const CREATE_CART_ITEM_SQL: &str = include_str!("../sql/create_cart_item.sql");
const UPDATE_CART_ITEM_QUANTITY_SQL: &str = include_str!("../sql/update_cart_item_quantity.sql");
const DELETE_CART_ITEM_SQL: &str = include_str!("../sql/delete_cart_item.sql");
const DELETE_CART_ITEMS_SQL: &str = include_str!("../sql/delete_cart_items.sql");
const MOVE_CART_ITEM_SQL: &str = include_str!("../sql/move_cart_item.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartItemsRepository;

impl PgCartItemsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn list_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<Vec<CartItemRecord>, sqlx::Error> {
        query_as::<Postgres, CartItemRecord>(LIST_CART_ITEMS_SQL)
            .bind(cart.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn find_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        item: CartItemUuid,
    ) -> Result<Option<CartItemRecord>, sqlx::Error> {
        query_as::<Postgres, CartItemRecord>(FIND_CART_ITEM_SQL)
            .bind(item.into_uuid())
            .bind(cart.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    /// The line for a (product, variant) pair; a missing variant matches
    /// only lines without one.
    pub(crate) async fn find_line(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        product: ProductUuid,
        variant: Option<VariantUuid>,
    ) -> Result<Option<CartItemRecord>, sqlx::Error> {
        query_as::<Postgres, CartItemRecord>(FIND_CART_LINE_SQL)
            .bind(cart.into_uuid())
            .bind(product.into_uuid())
            .bind(variant.map(VariantUuid::into_uuid))
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn create_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        item: &NewCartItem,
        unit_price: u64,
    ) -> Result<CartItemRecord, sqlx::Error> {
        query_as::<Postgres, CartItemRecord>(CREATE_CART_ITEM_SQL)
            .bind(item.uuid.into_uuid())
            .bind(cart.into_uuid())
            .bind(item.product_uuid.into_uuid())
            .bind(item.variant_uuid.map(VariantUuid::into_uuid))
            .bind(try_i32_from_u32(item.quantity, "quantity")?)
            .bind(try_i64_from_u64(unit_price, "unit_price")?)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn update_quantity(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        item: CartItemUuid,
        quantity: u32,
    ) -> Result<CartItemRecord, sqlx::Error> {
        query_as::<Postgres, CartItemRecord>(UPDATE_CART_ITEM_QUANTITY_SQL)
            .bind(item.into_uuid())
            .bind(cart.into_uuid())
            .bind(try_i32_from_u32(quantity, "quantity")?)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn delete_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        item: CartItemUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_CART_ITEM_SQL)
            .bind(item.into_uuid())
            .bind(cart.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn delete_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_CART_ITEMS_SQL)
            .bind(cart.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn move_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: CartItemUuid,
        to: CartUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(MOVE_CART_ITEM_SQL)
            .bind(item.into_uuid())
            .bind(to.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for CartItemRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CartItemUuid::from_uuid(row.try_get("uuid")?),
            cart_uuid: CartUuid::from_uuid(row.try_get("cart_uuid")?),
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            variant_uuid: row
                .try_get::<Option<uuid::Uuid>, _>("variant_uuid")?
                .map(VariantUuid::from_uuid),
            quantity: try_get_count(row, "quantity")?,
            unit_price: try_get_amount(row, "unit_price")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
