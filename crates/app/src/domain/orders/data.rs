//! Order Data

use crate::domain::{
    actors::UserUuid,
    carts::records::CartUuid,
    catalog::records::{ProductUuid, VariantUuid},
    orders::records::{Address, OrderItemUuid, OrderUuid},
};

/// What the shopper supplies at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCheckout {
    pub payment_method: String,
    pub shipping_method: String,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub customer_note: Option<String>,
}

/// Order header to insert; the number is supplied per attempt.
#[derive(Debug, Clone)]
pub(crate) struct NewOrder {
    pub uuid: OrderUuid,
    pub cart_uuid: CartUuid,
    pub user_uuid: Option<UserUuid>,
    pub subtotal: u64,
    pub discount: u64,
    pub tax: u64,
    pub shipping: u64,
    pub total: u64,
    pub coupon_code: Option<String>,
    pub checkout: NewCheckout,
}

#[derive(Debug, Clone)]
pub(crate) struct NewOrderItem {
    pub uuid: OrderItemUuid,
    pub order_uuid: OrderUuid,
    pub product_uuid: ProductUuid,
    pub variant_uuid: Option<VariantUuid>,
    pub name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: u64,
    pub subtotal: u64,
    pub tax: u64,
    pub total: u64,
}
