//! Checkout service.
//!
//! Turns a cart into an order in a single transaction. Stock rows are locked
//! in a fixed order so concurrent multi-line checkouts cannot deadlock. Any
//! failure rolls everything back, including the order number.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use async_trait::async_trait;
use jiff::{Timestamp, tz::TimeZone};
use mockall::automock;
use smallvec::SmallVec;
use sqlx::{Postgres, Transaction};
use tracing::{info, warn};

use crate::{
    database::Db,
    domain::{
        carts::{
            calculator::CartCalculator,
            records::{CartItemRecord, CartRecord},
            repositories::{PgCartItemsRepository, PgCartsRepository},
        },
        catalog::{
            records::{SellableItem, StockRef},
            repository::PgCatalogRepository,
        },
        coupons::repository::PgCouponsRepository,
        orders::{
            data::{NewCheckout, NewOrder, NewOrderItem},
            errors::CheckoutError,
            numbers::{MAX_ORDER_NUMBER_ATTEMPTS, generate_order_number},
            records::{OrderItemUuid, OrderRecord, OrderUuid, PaymentStatus},
            repository::PgOrdersRepository,
        },
    },
    events::{CartEvent, EventSink},
    settings::CheckoutSettings,
};

/// A cart line resolved against the catalog, ready to be frozen.
struct CheckoutLine {
    item: CartItemRecord,
    sellable: SellableItem,
}

#[derive(Clone)]
pub struct PgCheckoutService {
    db: Db,
    calculator: CartCalculator,
    events: Arc<dyn EventSink>,
    carts_repository: PgCartsRepository,
    items_repository: PgCartItemsRepository,
    catalog_repository: PgCatalogRepository,
    coupons_repository: PgCouponsRepository,
    orders_repository: PgOrdersRepository,
}

impl PgCheckoutService {
    #[must_use]
    pub fn new(db: Db, settings: &CheckoutSettings, events: Arc<dyn EventSink>) -> Self {
        Self {
            db,
            calculator: CartCalculator::new(settings),
            events,
            carts_repository: PgCartsRepository::new(),
            items_repository: PgCartItemsRepository::new(),
            catalog_repository: PgCatalogRepository::new(),
            coupons_repository: PgCouponsRepository::new(),
            orders_repository: PgOrdersRepository::new(),
        }
    }

    async fn commit(
        &self,
        cart: &CartRecord,
        mut checkout: NewCheckout,
    ) -> Result<OrderRecord, CheckoutError> {
        checkout
            .billing_address
            .get_or_insert_with(|| checkout.shipping_address.clone());

        let mut tx = self.db.begin().await?;

        let items = self.items_repository.list_items(&mut tx, cart.uuid).await?;

        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let lines = self.resolve_lines(&mut tx, items).await?;

        let coupon = match cart.coupon_code.as_deref() {
            Some(code) => self.coupons_repository.lock_by_code(&mut tx, code).await?,
            None => None,
        };

        let cart_items: Vec<CartItemRecord> = lines.iter().map(|line| line.item.clone()).collect();
        let subtotal = self.calculator.subtotal(&cart_items);
        let discount = coupon
            .as_ref()
            .map_or(0, |coupon| self.calculator.discount(subtotal, &coupon.discount));
        let totals = self.calculator.summarise(&cart_items, discount);

        let new_order = NewOrder {
            uuid: OrderUuid::new(),
            cart_uuid: cart.uuid,
            user_uuid: cart.owner.user_uuid(),
            subtotal: totals.subtotal,
            discount: totals.discount,
            tax: totals.tax,
            shipping: totals.shipping,
            total: totals.total,
            coupon_code: coupon.as_ref().map(|coupon| coupon.code.clone()),
            checkout,
        };

        let mut order = self.insert_order(&mut tx, &new_order).await?;

        for line in &lines {
            let line_totals = self
                .calculator
                .line_totals(line.item.unit_price, line.item.quantity);

            let item = self
                .orders_repository
                .create_item(
                    &mut tx,
                    &NewOrderItem {
                        uuid: OrderItemUuid::new(),
                        order_uuid: order.uuid,
                        product_uuid: line.item.product_uuid,
                        variant_uuid: line.item.variant_uuid,
                        name: line.sellable.display_name(),
                        sku: line.sellable.sku().to_string(),
                        quantity: line.item.quantity,
                        unit_price: line.item.unit_price,
                        subtotal: line_totals.subtotal,
                        tax: line_totals.tax,
                        total: line_totals.total,
                    },
                )
                .await?;

            order.items.push(item);
        }

        self.reserve_stock(&mut tx, &lines).await?;

        if let Some(coupon) = &coupon {
            let incremented = self
                .coupons_repository
                .increment_usage(&mut tx, coupon.uuid)
                .await?;

            if incremented == 0 {
                return Err(CheckoutError::CouponUsageLimitReached);
            }

            if let Some(user) = cart.owner.user_uuid() {
                self.coupons_repository
                    .create_redemption(&mut tx, coupon.uuid, user, order.uuid)
                    .await?;
            }
        }

        self.items_repository
            .delete_items(&mut tx, cart.uuid)
            .await?;
        self.carts_repository
            .update_coupon(&mut tx, cart.uuid, None, 0)
            .await?;

        tx.commit().await?;

        Ok(order)
    }

    async fn resolve_lines(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        items: Vec<CartItemRecord>,
    ) -> Result<Vec<CheckoutLine>, CheckoutError> {
        let mut lines = Vec::with_capacity(items.len());

        for item in items {
            let product = self
                .catalog_repository
                .get_product(tx, item.product_uuid)
                .await?
                .ok_or(CheckoutError::ProductNotFound)?;

            let variant = match item.variant_uuid {
                Some(variant) => Some(
                    self.catalog_repository
                        .get_variant(tx, variant)
                        .await?
                        .ok_or(CheckoutError::ProductNotFound)?,
                ),
                None => None,
            };

            lines.push(CheckoutLine {
                item,
                sellable: SellableItem { product, variant },
            });
        }

        Ok(lines)
    }

    async fn insert_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &NewOrder,
    ) -> Result<OrderRecord, CheckoutError> {
        let today = Timestamp::now().to_zoned(TimeZone::UTC).date();

        for attempt in 1..=MAX_ORDER_NUMBER_ATTEMPTS {
            let number = generate_order_number(&mut rand::thread_rng(), today);

            if let Some(created) = self
                .orders_repository
                .create_order(tx, order, &number)
                .await?
            {
                return Ok(created);
            }

            warn!(attempt, %number, "order number collision");
        }

        Err(CheckoutError::OrderNumberExhausted)
    }

    /// Locks and decrements every stock row, ordered by (product, variant).
    async fn reserve_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        lines: &[CheckoutLine],
    ) -> Result<(), CheckoutError> {
        let mut ordered: SmallVec<[&CheckoutLine; 8]> = lines.iter().collect();

        ordered.sort_by_key(|line| (line.item.product_uuid, line.item.variant_uuid));

        for line in ordered {
            let stock: StockRef = line.item.stock_ref();
            let requested = line.item.quantity;

            let available = self
                .catalog_repository
                .lock_stock(tx, stock)
                .await?
                .unwrap_or(0);

            let insufficient = || CheckoutError::InsufficientStock {
                product: line.sellable.display_name(),
                requested,
                available,
            };

            if available < requested {
                return Err(insufficient());
            }

            let decremented = self
                .catalog_repository
                .decrement_stock(tx, stock, requested)
                .await?;

            if decremented == 0 {
                return Err(insufficient());
            }
        }

        Ok(())
    }
}

impl Debug for PgCheckoutService {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PgCheckoutService")
            .field("db", &self.db)
            .field("calculator", &self.calculator)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CheckoutService for PgCheckoutService {
    #[tracing::instrument(
        name = "checkout.service.process_checkout",
        skip(self, cart, checkout),
        fields(cart_uuid = %cart.uuid, owner = %cart.owner),
        err
    )]
    async fn process_checkout(
        &self,
        cart: &CartRecord,
        checkout: NewCheckout,
    ) -> Result<OrderRecord, CheckoutError> {
        match self.commit(cart, checkout).await {
            Ok(order) => {
                info!(order_number = %order.number, total = order.total, "checkout committed");

                self.events.emit(CartEvent::CheckoutSucceeded {
                    cart: cart.uuid,
                    order: order.uuid,
                    number: order.number.clone(),
                    total: order.total,
                });

                Ok(order)
            }
            Err(error) => {
                self.events.emit(CartEvent::CheckoutFailed {
                    cart: cart.uuid,
                    reason: error.to_string(),
                });

                Err(error)
            }
        }
    }

    async fn get_order(&self, number: &str) -> Result<OrderRecord, CheckoutError> {
        let mut tx = self.db.begin().await?;

        let mut order = self
            .orders_repository
            .find_by_number(&mut tx, number)
            .await?
            .ok_or(CheckoutError::NotFound)?;

        order.items = self
            .orders_repository
            .list_items(&mut tx, order.uuid)
            .await?;

        tx.commit().await?;

        Ok(order)
    }

    #[tracing::instrument(
        name = "checkout.service.record_payment_status",
        skip(self),
        fields(order_uuid = %order, status = %status),
        err
    )]
    async fn record_payment_status(
        &self,
        order: OrderUuid,
        status: PaymentStatus,
    ) -> Result<(), CheckoutError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self
            .orders_repository
            .update_payment_status(&mut tx, order, status)
            .await?;

        if rows_affected == 0 {
            return Err(CheckoutError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait CheckoutService: Send + Sync {
    /// Commits `cart` as an order, decrementing stock and consuming the
    /// coupon. Emits `CheckoutSucceeded` or `CheckoutFailed` afterwards.
    async fn process_checkout(
        &self,
        cart: &CartRecord,
        checkout: NewCheckout,
    ) -> Result<OrderRecord, CheckoutError>;

    /// Retrieve an order with its line items.
    async fn get_order(&self, number: &str) -> Result<OrderRecord, CheckoutError>;

    /// Store the outcome reported by the payment gateway.
    async fn record_payment_status(
        &self,
        order: OrderUuid,
        status: PaymentStatus,
    ) -> Result<(), CheckoutError>;
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashSet;
    use testresult::TestResult;
    use tokio::task::JoinSet;

    use crate::{
        domain::{
            actors::{Actor, UserUuid},
            carts::{CartsService, data::NewCartItem},
            coupons::{data::NewCoupon, records::CouponDiscount},
            orders::records::{OrderStatus, PaymentStatus},
        },
        test::{
            TestContext,
            helpers::{
                add_item, cart_with, count_orders, count_redemptions, coupon_used_count,
                create_coupon, create_product, create_variant, guest, new_checkout,
                product_stock, variant_stock,
            },
        },
    };

    use super::*;

    #[tokio::test]
    async fn checkout_freezes_cart_into_order() -> TestResult {
        let ctx = TestContext::new().await;
        let actor = guest("abc");
        let mug = create_product(&ctx, 100_00, 5).await?;
        let poster = create_product(&ctx, 50_00, 5).await?;
        let cart = cart_with(&ctx, &actor, &mug, 2).await?;

        add_item(&ctx, cart.uuid, &actor, poster.uuid, 1).await?;

        let cart = ctx.carts.get_cart(cart.uuid).await?;
        let order = ctx.checkout.process_checkout(&cart, new_checkout()).await?;

        assert_eq!(order.subtotal, 250_00);
        assert_eq!(order.discount, 0);
        assert_eq!(order.tax, 25_00);
        assert_eq!(order.shipping, 0);
        assert_eq!(order.total, 275_00);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert!(order.user_uuid.is_none());
        assert_eq!(order.items.len(), 2);
        assert!(order.number.starts_with("ORD-"));
        assert_eq!(order.number.len(), "ORD-YYYYMMDD-XXXXXXXX".len());

        assert_eq!(product_stock(&ctx, mug.uuid).await?, 3);
        assert_eq!(product_stock(&ctx, poster.uuid).await?, 4);
        assert!(ctx.carts.get_cart(cart.uuid).await?.is_empty());
        assert_eq!(ctx.events.names().last(), Some(&"checkout_succeeded"));

        Ok(())
    }

    #[tokio::test]
    async fn order_items_snapshot_catalog_data() -> TestResult {
        let ctx = TestContext::new().await;
        let actor = guest("abc");
        let product = create_product(&ctx, 10_00, 5).await?;
        let cart = cart_with(&ctx, &actor, &product, 3).await?;

        let order = ctx.checkout.process_checkout(&cart, new_checkout()).await?;
        let item = order.items.first().ok_or("order has no items")?;

        assert_eq!(item.name, product.name);
        assert_eq!(item.sku, product.sku);
        assert_eq!(item.unit_price, 10_00);
        assert_eq!(item.quantity, 3);
        assert_eq!(item.subtotal, 30_00);
        assert_eq!(item.tax, 3_00);
        assert_eq!(item.total, 33_00);

        Ok(())
    }

    #[tokio::test]
    async fn variant_lines_draw_variant_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let actor = guest("abc");
        let product = create_product(&ctx, 10_00, 5).await?;
        let variant = create_variant(&ctx, &product, 12_00, 4).await?;
        let cart = ctx.carts.get_or_create_cart(&actor).await?;

        ctx.carts
            .add_item(
                cart.uuid,
                &actor,
                NewCartItem::new(product.uuid, Some(variant.uuid), 3),
            )
            .await?;

        let cart = ctx.carts.get_cart(cart.uuid).await?;
        let order = ctx.checkout.process_checkout(&cart, new_checkout()).await?;

        assert_eq!(order.subtotal, 36_00);
        assert_eq!(variant_stock(&ctx, variant.uuid).await?, 1);
        assert_eq!(product_stock(&ctx, product.uuid).await?, 5);

        Ok(())
    }

    #[tokio::test]
    async fn coupon_is_consumed_and_redeemed_by_user() -> TestResult {
        let ctx = TestContext::new().await;
        let user_uuid = UserUuid::new();
        let actor = Actor::User(user_uuid);
        let product = create_product(&ctx, 125_00, 5).await?;
        let cart = cart_with(&ctx, &actor, &product, 2).await?;

        create_coupon(
            &ctx,
            NewCoupon::new("SAVE20", CouponDiscount::FixedAmount { amount: 20_00 }),
        )
        .await?;

        ctx.carts.apply_coupon(cart.uuid, &actor, "SAVE20").await?;

        let cart = ctx.carts.get_cart(cart.uuid).await?;
        let order = ctx.checkout.process_checkout(&cart, new_checkout()).await?;

        assert_eq!(order.subtotal, 250_00);
        assert_eq!(order.discount, 20_00);
        assert_eq!(order.tax, 23_00);
        assert_eq!(order.total, 253_00);
        assert_eq!(order.coupon_code.as_deref(), Some("SAVE20"));
        assert_eq!(order.user_uuid, Some(user_uuid));
        assert_eq!(coupon_used_count(&ctx, "SAVE20").await?, 1);
        assert_eq!(count_redemptions(&ctx).await?, 1);

        let cart = ctx.carts.get_cart(cart.uuid).await?;

        assert!(cart.coupon_code.is_none());
        assert_eq!(cart.discount_amount, 0);

        Ok(())
    }

    #[tokio::test]
    async fn guest_coupon_use_is_counted_without_redemption() -> TestResult {
        let ctx = TestContext::new().await;
        let actor = guest("abc");
        let product = create_product(&ctx, 10_00, 5).await?;
        let cart = cart_with(&ctx, &actor, &product, 1).await?;

        create_coupon(
            &ctx,
            NewCoupon::new("ONE", CouponDiscount::FixedAmount { amount: 1_00 }),
        )
        .await?;

        ctx.carts.apply_coupon(cart.uuid, &actor, "ONE").await?;

        let cart = ctx.carts.get_cart(cart.uuid).await?;

        ctx.checkout.process_checkout(&cart, new_checkout()).await?;

        assert_eq!(coupon_used_count(&ctx, "ONE").await?, 1);
        assert_eq!(count_redemptions(&ctx).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn insufficient_stock_rolls_back_everything() -> TestResult {
        let ctx = TestContext::new().await;
        let actor = guest("abc");
        let product = create_product(&ctx, 10_00, 5).await?;
        let cart = cart_with(&ctx, &actor, &product, 5).await?;

        sqlx::query("UPDATE products SET stock = 2 WHERE uuid = $1")
            .bind(product.uuid.into_uuid())
            .execute(ctx.db.pool())
            .await?;

        let result = ctx.checkout.process_checkout(&cart, new_checkout()).await;

        assert!(matches!(
            result,
            Err(CheckoutError::InsufficientStock {
                requested: 5,
                available: 2,
                ..
            })
        ));
        assert_eq!(count_orders(&ctx).await?, 0);
        assert_eq!(product_stock(&ctx, product.uuid).await?, 2);
        assert_eq!(ctx.carts.get_cart(cart.uuid).await?.items.len(), 1);
        assert_eq!(ctx.events.names().last(), Some(&"checkout_failed"));

        Ok(())
    }

    #[tokio::test]
    async fn one_failing_line_keeps_other_lines_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let actor = guest("abc");
        let plenty = create_product(&ctx, 10_00, 10).await?;
        let scarce = create_product(&ctx, 10_00, 3).await?;
        let cart = cart_with(&ctx, &actor, &plenty, 4).await?;

        add_item(&ctx, cart.uuid, &actor, scarce.uuid, 3).await?;

        sqlx::query("UPDATE products SET stock = 1 WHERE uuid = $1")
            .bind(scarce.uuid.into_uuid())
            .execute(ctx.db.pool())
            .await?;

        let cart = ctx.carts.get_cart(cart.uuid).await?;
        let result = ctx.checkout.process_checkout(&cart, new_checkout()).await;

        assert!(matches!(result, Err(CheckoutError::InsufficientStock { .. })));
        assert_eq!(product_stock(&ctx, plenty.uuid).await?, 10);

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_checkouts_sell_last_unit_once() -> TestResult {
        let ctx = TestContext::new().await;
        let product = create_product(&ctx, 10_00, 2).await?;
        let first = cart_with(&ctx, &guest("first"), &product, 1).await?;
        let second = cart_with(&ctx, &guest("second"), &product, 1).await?;

        sqlx::query("UPDATE products SET stock = 1 WHERE uuid = $1")
            .bind(product.uuid.into_uuid())
            .execute(ctx.db.pool())
            .await?;

        let (a, b) = tokio::join!(
            ctx.checkout.process_checkout(&first, new_checkout()),
            ctx.checkout.process_checkout(&second, new_checkout()),
        );

        assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
        assert_eq!(count_orders(&ctx).await?, 1);
        assert_eq!(product_stock(&ctx, product.uuid).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn coupon_usage_limit_is_enforced_at_commit() -> TestResult {
        let ctx = TestContext::new().await;
        let product = create_product(&ctx, 10_00, 10).await?;
        let first_actor = guest("first");
        let second_actor = guest("second");
        let first = cart_with(&ctx, &first_actor, &product, 1).await?;
        let second = cart_with(&ctx, &second_actor, &product, 1).await?;

        create_coupon(
            &ctx,
            NewCoupon {
                usage_limit: Some(1),
                ..NewCoupon::new("ONCE", CouponDiscount::FixedAmount { amount: 1_00 })
            },
        )
        .await?;

        ctx.carts
            .apply_coupon(first.uuid, &first_actor, "ONCE")
            .await?;
        ctx.carts
            .apply_coupon(second.uuid, &second_actor, "ONCE")
            .await?;

        let first = ctx.carts.get_cart(first.uuid).await?;
        let second = ctx.carts.get_cart(second.uuid).await?;

        ctx.checkout
            .process_checkout(&first, new_checkout())
            .await?;

        let result = ctx.checkout.process_checkout(&second, new_checkout()).await;

        assert!(matches!(result, Err(CheckoutError::CouponUsageLimitReached)));
        assert_eq!(coupon_used_count(&ctx, "ONCE").await?, 1);
        assert_eq!(product_stock(&ctx, product.uuid).await?, 9);
        assert_eq!(count_orders(&ctx).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn empty_cart_cannot_be_checked_out() -> TestResult {
        let ctx = TestContext::new().await;
        let cart = ctx.carts.get_or_create_cart(&guest("abc")).await?;

        let result = ctx.checkout.process_checkout(&cart, new_checkout()).await;

        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert_eq!(ctx.events.names().last(), Some(&"checkout_failed"));

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_checkouts_get_distinct_order_numbers() -> TestResult {
        let ctx = TestContext::new().await;
        let product = create_product(&ctx, 1_00, 100).await?;
        let mut checkouts = JoinSet::new();

        for session in 0..40 {
            let cart = cart_with(&ctx, &guest(&format!("session-{session}")), &product, 1).await?;
            let checkout = ctx.checkout.clone();

            checkouts.spawn(async move { checkout.process_checkout(&cart, new_checkout()).await });
        }

        let mut numbers = FxHashSet::default();

        while let Some(order) = checkouts.join_next().await {
            numbers.insert(order??.number);
        }

        assert_eq!(numbers.len(), 40);
        assert_eq!(count_orders(&ctx).await?, 40);
        assert_eq!(product_stock(&ctx, product.uuid).await?, 60);

        Ok(())
    }

    #[tokio::test]
    async fn get_order_returns_items_and_addresses() -> TestResult {
        let ctx = TestContext::new().await;
        let product = create_product(&ctx, 1_00, 10).await?;
        let cart = cart_with(&ctx, &guest("abc"), &product, 2).await?;
        let checkout = new_checkout();

        let placed = ctx
            .checkout
            .process_checkout(&cart, checkout.clone())
            .await?;
        let fetched = ctx.checkout.get_order(&placed.number).await?;

        assert_eq!(fetched.uuid, placed.uuid);
        assert_eq!(fetched.items.len(), 1);
        assert_eq!(fetched.shipping_address, checkout.shipping_address);
        assert_eq!(
            fetched.billing_address.as_ref(),
            Some(&checkout.shipping_address)
        );
        assert!(matches!(
            ctx.checkout.get_order("ORD-20260101-AAAAAAAA").await,
            Err(CheckoutError::NotFound)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn payment_status_is_recorded() -> TestResult {
        let ctx = TestContext::new().await;
        let product = create_product(&ctx, 1_00, 10).await?;
        let cart = cart_with(&ctx, &guest("abc"), &product, 1).await?;
        let order = ctx.checkout.process_checkout(&cart, new_checkout()).await?;

        ctx.checkout
            .record_payment_status(order.uuid, PaymentStatus::Paid)
            .await?;

        let missing = ctx
            .checkout
            .record_payment_status(OrderUuid::new(), PaymentStatus::Paid)
            .await;

        let paid = ctx.checkout.get_order(&order.number).await?;

        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert!(matches!(missing, Err(CheckoutError::NotFound)));

        Ok(())
    }
}
