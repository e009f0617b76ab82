//! Cart and order response bodies.

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storefront_app::domain::{
    carts::{
        calculator::CartTotals,
        records::{CartItemRecord, CartSummary},
    },
    orders::records::{OrderItemRecord, OrderRecord},
};

/// Cart Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CartResponse {
    /// The cart, absent until the first item is added
    pub uuid: Option<Uuid>,

    /// The applied coupon code
    pub coupon_code: Option<String>,

    /// When a guest cart expires
    pub expires_at: Option<String>,

    /// The lines in the cart
    pub items: Vec<CartItemResponse>,

    /// Totals in minor units
    pub totals: CartTotalsResponse,
}

impl CartResponse {
    /// An actor without a cart sees an empty one.
    pub(crate) fn empty() -> Self {
        Self {
            uuid: None,
            coupon_code: None,
            expires_at: None,
            items: Vec::new(),
            totals: CartTotals::default().into(),
        }
    }
}

impl From<CartSummary> for CartResponse {
    fn from(summary: CartSummary) -> Self {
        let CartSummary { cart, totals } = summary;

        Self {
            uuid: Some(cart.uuid.into()),
            coupon_code: cart.coupon_code,
            expires_at: cart.expires_at.as_ref().map(ToString::to_string),
            items: cart.items.into_iter().map(CartItemResponse::from).collect(),
            totals: totals.into(),
        }
    }
}

/// Cart Item Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CartItemResponse {
    pub uuid: Uuid,
    pub product_uuid: Uuid,
    pub variant_uuid: Option<Uuid>,
    pub quantity: u32,

    /// Price captured when the line was added
    pub unit_price: u64,

    /// `unit_price` times `quantity`
    pub subtotal: u64,
}

impl From<CartItemRecord> for CartItemResponse {
    fn from(item: CartItemRecord) -> Self {
        Self {
            uuid: item.uuid.into(),
            product_uuid: item.product_uuid.into(),
            variant_uuid: item.variant_uuid.map(Into::into),
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal: item.unit_price.saturating_mul(u64::from(item.quantity)),
        }
    }
}

/// Cart Totals Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CartTotalsResponse {
    pub subtotal: u64,
    pub discount: u64,
    pub tax: u64,
    pub shipping: u64,
    pub total: u64,

    /// Sum of line quantities
    pub item_count: u64,
}

impl From<CartTotals> for CartTotalsResponse {
    fn from(totals: CartTotals) -> Self {
        Self {
            subtotal: totals.subtotal,
            discount: totals.discount,
            tax: totals.tax,
            shipping: totals.shipping,
            total: totals.total,
            item_count: totals.item_count,
        }
    }
}

/// Order Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct OrderResponse {
    pub uuid: Uuid,

    /// Human-readable order number, `ORD-YYYYMMDD-XXXXXXXX`
    pub number: String,
    pub status: String,
    pub payment_status: String,
    pub subtotal: u64,
    pub discount: u64,
    pub tax: u64,
    pub shipping: u64,
    pub total: u64,
    pub coupon_code: Option<String>,
    pub payment_method: String,
    pub shipping_method: String,
    pub items: Vec<OrderItemResponse>,
    pub created_at: String,
}

impl From<OrderRecord> for OrderResponse {
    fn from(order: OrderRecord) -> Self {
        Self {
            uuid: order.uuid.into(),
            number: order.number,
            status: order.status.to_string(),
            payment_status: order.payment_status.to_string(),
            subtotal: order.subtotal,
            discount: order.discount,
            tax: order.tax,
            shipping: order.shipping,
            total: order.total,
            coupon_code: order.coupon_code,
            payment_method: order.payment_method,
            shipping_method: order.shipping_method,
            items: order
                .items
                .into_iter()
                .map(OrderItemResponse::from)
                .collect(),
            created_at: order.created_at.to_string(),
        }
    }
}

/// Order Item Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct OrderItemResponse {
    pub product_uuid: Uuid,
    pub variant_uuid: Option<Uuid>,

    /// Product name at the time of purchase
    pub name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: u64,
    pub subtotal: u64,
    pub tax: u64,
    pub total: u64,
}

impl From<OrderItemRecord> for OrderItemResponse {
    fn from(item: OrderItemRecord) -> Self {
        Self {
            product_uuid: item.product_uuid.into(),
            variant_uuid: item.variant_uuid.map(Into::into),
            name: item.name,
            sku: item.sku,
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal: item.subtotal,
            tax: item.tax,
            total: item.total,
        }
    }
}
