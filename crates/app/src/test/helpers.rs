//! Test Helpers

use sqlx::query;

use crate::{
    domain::{
        actors::{Actor, SessionToken, UserUuid},
        carts::{
            CartsService, CartsServiceError,
            data::NewCartItem,
            records::{CartItemRecord, CartRecord, CartUuid},
        },
        catalog::{
            data::{NewProduct, NewVariant},
            records::{ProductRecord, ProductUuid, VariantRecord, VariantUuid},
            repository::PgCatalogRepository,
        },
        coupons::{data::NewCoupon, records::CouponRecord, repository::PgCouponsRepository},
        orders::{data::NewCheckout, records::Address},
    },
    test::TestContext,
};

pub(crate) fn guest(token: &str) -> Actor {
    Actor::Guest(SessionToken::new(token))
}

pub(crate) fn user() -> Actor {
    Actor::User(UserUuid::new())
}

pub(crate) async fn create_named_product(
    ctx: &TestContext,
    name: &str,
    price: u64,
    stock: u32,
    is_active: bool,
) -> Result<ProductRecord, sqlx::Error> {
    let uuid = ProductUuid::new();
    let mut tx = ctx.db.pool().begin().await?;

    let product = PgCatalogRepository::new()
        .create_product(
            &mut tx,
            NewProduct {
                uuid,
                name: name.to_string(),
                sku: format!("SKU-{}", uuid.into_uuid().simple()),
                price,
                stock,
                is_active,
            },
        )
        .await?;

    tx.commit().await?;

    Ok(product)
}

pub(crate) async fn create_product(
    ctx: &TestContext,
    price: u64,
    stock: u32,
) -> Result<ProductRecord, sqlx::Error> {
    create_named_product(ctx, "Product", price, stock, true).await
}

pub(crate) async fn create_inactive_product(
    ctx: &TestContext,
    price: u64,
    stock: u32,
) -> Result<ProductRecord, sqlx::Error> {
    create_named_product(ctx, "Retired Product", price, stock, false).await
}

pub(crate) async fn create_variant(
    ctx: &TestContext,
    product: &ProductRecord,
    price: u64,
    stock: u32,
) -> Result<VariantRecord, sqlx::Error> {
    let uuid = VariantUuid::new();
    let mut tx = ctx.db.pool().begin().await?;

    let variant = PgCatalogRepository::new()
        .create_variant(
            &mut tx,
            NewVariant {
                uuid,
                product_uuid: product.uuid,
                name: "Large".to_string(),
                sku: format!("{}-L", product.sku),
                price,
                stock,
            },
        )
        .await?;

    tx.commit().await?;

    Ok(variant)
}

pub(crate) async fn create_coupon(
    ctx: &TestContext,
    coupon: NewCoupon,
) -> Result<CouponRecord, sqlx::Error> {
    let mut tx = ctx.db.pool().begin().await?;

    let coupon = PgCouponsRepository::new()
        .create_coupon(&mut tx, coupon)
        .await?;

    tx.commit().await?;

    Ok(coupon)
}

pub(crate) async fn add_item(
    ctx: &TestContext,
    cart: CartUuid,
    actor: &Actor,
    product: ProductUuid,
    quantity: u32,
) -> Result<CartItemRecord, CartsServiceError> {
    ctx.carts
        .add_item(cart, actor, NewCartItem::new(product, None, quantity))
        .await
}

/// A cart for `actor` holding `quantity` of `product`.
pub(crate) async fn cart_with(
    ctx: &TestContext,
    actor: &Actor,
    product: &ProductRecord,
    quantity: u32,
) -> Result<CartRecord, CartsServiceError> {
    let cart = ctx.carts.get_or_create_cart(actor).await?;

    add_item(ctx, cart.uuid, actor, product.uuid, quantity).await?;

    ctx.carts.get_cart(cart.uuid).await
}

/// Moves the cart's expiry into the past.
pub(crate) async fn expire_cart(ctx: &TestContext, cart: CartUuid) -> Result<(), sqlx::Error> {
    query("UPDATE carts SET expires_at = now() - INTERVAL '1 minute' WHERE uuid = $1")
        .bind(cart.into_uuid())
        .execute(ctx.db.pool())
        .await?;

    Ok(())
}

pub(crate) async fn product_stock(
    ctx: &TestContext,
    product: ProductUuid,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar("SELECT stock FROM products WHERE uuid = $1")
        .bind(product.into_uuid())
        .fetch_one(ctx.db.pool())
        .await
}

pub(crate) async fn variant_stock(
    ctx: &TestContext,
    variant: VariantUuid,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar("SELECT stock FROM product_variants WHERE uuid = $1")
        .bind(variant.into_uuid())
        .fetch_one(ctx.db.pool())
        .await
}

pub(crate) async fn count_orders(ctx: &TestContext) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(ctx.db.pool())
        .await
}

pub(crate) async fn coupon_used_count(ctx: &TestContext, code: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT used_count FROM coupons WHERE code = $1")
        .bind(code)
        .fetch_one(ctx.db.pool())
        .await
}

pub(crate) async fn count_redemptions(ctx: &TestContext) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM coupon_redemptions")
        .fetch_one(ctx.db.pool())
        .await
}

pub(crate) async fn count_carts(ctx: &TestContext) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM carts")
        .fetch_one(ctx.db.pool())
        .await
}

pub(crate) fn address() -> Address {
    Address {
        name: "Grace Hopper".to_string(),
        line1: "1 Harbour Road".to_string(),
        line2: None,
        city: "Arlington".to_string(),
        region: Some("VA".to_string()),
        postal_code: "22201".to_string(),
        country: "US".to_string(),
        phone: None,
    }
}

pub(crate) fn new_checkout() -> NewCheckout {
    NewCheckout {
        payment_method: "cash_on_delivery".to_string(),
        shipping_method: "standard".to_string(),
        shipping_address: address(),
        billing_address: None,
        customer_note: None,
    }
}
