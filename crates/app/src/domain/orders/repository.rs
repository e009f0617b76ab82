//! Orders Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, types::Json};

use crate::domain::{
    actors::UserUuid,
    carts::records::CartUuid,
    catalog::records::{ProductUuid, VariantUuid},
    columns::{try_get_amount, try_get_count, try_i32_from_u32, try_i64_from_u64},
    orders::{
        data::{NewOrder, NewOrderItem},
        records::{
            Address, OrderItemRecord, OrderItemUuid, OrderRecord, OrderStatus, OrderUuid,
            PaymentStatus,
        },
    },
};

const CREATE_ORDER_SQL: &str = include_str!("sql/create_order.sql");
const CREATE_ORDER_ITEM_SQL: &str = include_str!("sql/create_order_item.sql");
const FIND_ORDER_BY_NUMBER_SQL: &str = include_str!("sql/find_order_by_number.sql");
const LIST_ORDER_ITEMS_SQL: &str = include_str!("sql/list_order_items.sql");
const UPDATE_PAYMENT_STATUS_SQL: &str = include_str!("sql/update_payment_status.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgOrdersRepository;

impl PgOrdersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Inserts the order under `number`. Returns `None` when the number is
    /// already taken.
    pub(crate) async fn create_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &NewOrder,
        number: &str,
    ) -> Result<Option<OrderRecord>, sqlx::Error> {
        query_as::<Postgres, OrderRecord>(CREATE_ORDER_SQL)
            .bind(order.uuid.into_uuid())
            .bind(number)
            .bind(order.cart_uuid.into_uuid())
            .bind(order.user_uuid.map(UserUuid::into_uuid))
            .bind(try_i64_from_u64(order.subtotal, "subtotal")?)
            .bind(try_i64_from_u64(order.discount, "discount")?)
            .bind(try_i64_from_u64(order.tax, "tax")?)
            .bind(try_i64_from_u64(order.shipping, "shipping")?)
            .bind(try_i64_from_u64(order.total, "total")?)
            .bind(order.coupon_code.as_deref())
            .bind(order.checkout.payment_method.as_str())
            .bind(order.checkout.shipping_method.as_str())
            .bind(Json(&order.checkout.shipping_address))
            .bind(order.checkout.billing_address.as_ref().map(Json))
            .bind(order.checkout.customer_note.as_deref())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn create_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: &NewOrderItem,
    ) -> Result<OrderItemRecord, sqlx::Error> {
        query_as::<Postgres, OrderItemRecord>(CREATE_ORDER_ITEM_SQL)
            .bind(item.uuid.into_uuid())
            .bind(item.order_uuid.into_uuid())
            .bind(item.product_uuid.into_uuid())
            .bind(item.variant_uuid.map(VariantUuid::into_uuid))
            .bind(item.name.as_str())
            .bind(item.sku.as_str())
            .bind(try_i32_from_u32(item.quantity, "quantity")?)
            .bind(try_i64_from_u64(item.unit_price, "unit_price")?)
            .bind(try_i64_from_u64(item.subtotal, "subtotal")?)
            .bind(try_i64_from_u64(item.tax, "tax")?)
            .bind(try_i64_from_u64(item.total, "total")?)
            .fetch_one(&mut **tx)
            .await
    }

    /// Order header only; `items` is left empty.
    pub(crate) async fn find_by_number(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        number: &str,
    ) -> Result<Option<OrderRecord>, sqlx::Error> {
        query_as::<Postgres, OrderRecord>(FIND_ORDER_BY_NUMBER_SQL)
            .bind(number)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn list_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Vec<OrderItemRecord>, sqlx::Error> {
        query_as::<Postgres, OrderItemRecord>(LIST_ORDER_ITEMS_SQL)
            .bind(order.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn update_payment_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        status: PaymentStatus,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(UPDATE_PAYMENT_STATUS_SQL)
            .bind(order.into_uuid())
            .bind(status.as_str())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

fn decode_status<T>(row: &PgRow, col: &str) -> sqlx::Result<T>
where
    T: std::str::FromStr<Err = crate::domain::orders::records::UnknownStatus>,
{
    let value: String = row.try_get(col)?;

    value.parse().map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

impl<'r> FromRow<'r, PgRow> for OrderRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: OrderUuid::from_uuid(row.try_get("uuid")?),
            number: row.try_get("number")?,
            cart_uuid: CartUuid::from_uuid(row.try_get("cart_uuid")?),
            user_uuid: row
                .try_get::<Option<uuid::Uuid>, _>("user_uuid")?
                .map(UserUuid::from_uuid),
            status: decode_status::<OrderStatus>(row, "status")?,
            payment_status: decode_status::<PaymentStatus>(row, "payment_status")?,
            subtotal: try_get_amount(row, "subtotal")?,
            discount: try_get_amount(row, "discount")?,
            tax: try_get_amount(row, "tax")?,
            shipping: try_get_amount(row, "shipping")?,
            total: try_get_amount(row, "total")?,
            coupon_code: row.try_get("coupon_code")?,
            payment_method: row.try_get("payment_method")?,
            shipping_method: row.try_get("shipping_method")?,
            shipping_address: row.try_get::<Json<Address>, _>("shipping_address")?.0,
            billing_address: row
                .try_get::<Option<Json<Address>>, _>("billing_address")?
                .map(|address| address.0),
            customer_note: row.try_get("customer_note")?,
            items: Vec::new(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for OrderItemRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: OrderItemUuid::from_uuid(row.try_get("uuid")?),
            order_uuid: OrderUuid::from_uuid(row.try_get("order_uuid")?),
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            variant_uuid: row
                .try_get::<Option<uuid::Uuid>, _>("variant_uuid")?
                .map(VariantUuid::from_uuid),
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            quantity: try_get_count(row, "quantity")?,
            unit_price: try_get_amount(row, "unit_price")?,
            subtotal: try_get_amount(row, "subtotal")?,
            tax: try_get_amount(row, "tax")?,
            total: try_get_amount(row, "total")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}
