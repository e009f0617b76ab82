//! Carts service.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use rustc_hash::FxHashMap;
use sqlx::{Postgres, Transaction};
use tracing::info;

use crate::{
    database::Db,
    domain::{
        actors::{Actor, SessionToken, UserUuid},
        carts::{
            calculator::CartCalculator,
            data::NewCartItem,
            errors::CartsServiceError,
            guards::{ensure_not_expired, guard_mutation},
            records::{CartItemRecord, CartItemUuid, CartOwner, CartRecord, CartSummary, CartUuid},
            repositories::{PgCartItemsRepository, PgCartsRepository},
        },
        catalog::{
            records::{ProductUuid, VariantUuid},
            stock::StockValidator,
        },
        coupons::{
            CouponCheck,
            records::{CouponRecord, normalize_code},
            repository::PgCouponsRepository,
            validate_coupon,
        },
        orders::{CheckoutService, data::NewCheckout, records::OrderRecord},
    },
    events::{CartEvent, EventSink},
    settings::CheckoutSettings,
};

#[derive(Clone)]
pub struct PgCartsService {
    db: Db,
    settings: CheckoutSettings,
    calculator: CartCalculator,
    events: Arc<dyn EventSink>,
    checkout: Arc<dyn CheckoutService>,
    carts_repository: PgCartsRepository,
    items_repository: PgCartItemsRepository,
    coupons_repository: PgCouponsRepository,
    stock: StockValidator,
}

impl PgCartsService {
    #[must_use]
    pub fn new(
        db: Db,
        settings: CheckoutSettings,
        events: Arc<dyn EventSink>,
        checkout: Arc<dyn CheckoutService>,
    ) -> Self {
        Self {
            db,
            calculator: CartCalculator::new(&settings),
            settings,
            events,
            checkout,
            carts_repository: PgCartsRepository::new(),
            items_repository: PgCartItemsRepository::new(),
            coupons_repository: PgCouponsRepository::new(),
            stock: StockValidator::new(),
        }
    }

    fn ensure_quantity(&self, quantity: u32) -> Result<(), CartsServiceError> {
        if quantity == 0 || quantity > self.settings.max_quantity {
            return Err(CartsServiceError::InvalidQuantity {
                quantity,
                max: self.settings.max_quantity,
            });
        }

        Ok(())
    }

    async fn load_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<CartRecord, CartsServiceError> {
        let mut record = self
            .carts_repository
            .find_by_uuid(tx, cart)
            .await?
            .ok_or(CartsServiceError::NotFound)?;

        record.items = self.items_repository.list_items(tx, cart).await?;

        Ok(record)
    }

    /// Loads a cart and runs the mutation guards against it.
    async fn load_guarded(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        actor: &Actor,
    ) -> Result<CartRecord, CartsServiceError> {
        let record = self.load_cart(tx, cart).await?;

        guard_mutation(&record, actor, Timestamp::now())?;

        Ok(record)
    }

    /// Finds the owner's cart or inserts one. An expired guest cart is
    /// deleted and replaced. The flag is `true` when the cart was created by
    /// this call.
    async fn find_or_create(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner: &CartOwner,
    ) -> Result<(CartRecord, bool), CartsServiceError> {
        if let Some(mut cart) = self.carts_repository.find_by_owner(tx, owner).await? {
            if !cart.is_expired_at(Timestamp::now()) {
                cart.items = self.items_repository.list_items(tx, cart.uuid).await?;

                return Ok((cart, false));
            }

            self.carts_repository.delete_cart(tx, cart.uuid).await?;

            info!(cart_uuid = %cart.uuid, "expired cart replaced");
        }

        let created = self
            .carts_repository
            .create_cart(
                tx,
                CartUuid::new(),
                owner,
                self.settings.guest_cart_lifetime_days,
            )
            .await?;

        match created {
            Some(cart) => Ok((cart, true)),
            // A concurrent request created it first.
            None => {
                let cart = self
                    .carts_repository
                    .find_by_owner(tx, owner)
                    .await?
                    .ok_or(CartsServiceError::NotFound)?;

                Ok((cart, false))
            }
        }
    }

    /// Redemptions of `coupon` by the cart's user; `None` for guests.
    async fn user_redemptions(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: &CouponRecord,
        owner: &CartOwner,
    ) -> Result<Option<u64>, CartsServiceError> {
        let Some(user) = owner.user_uuid() else {
            return Ok(None);
        };

        let redemptions = self
            .coupons_repository
            .count_user_redemptions(tx, coupon.uuid, user)
            .await?;

        Ok(Some(redemptions))
    }

    /// Re-checks the applied coupon against the cart's current lines and
    /// persists the new discount. A coupon the cart no longer qualifies for
    /// is removed, in which case this returns `true`.
    async fn refresh_discount(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: &CartRecord,
    ) -> Result<bool, CartsServiceError> {
        let Some(code) = cart.coupon_code.as_deref() else {
            return Ok(false);
        };

        let items = self.items_repository.list_items(tx, cart.uuid).await?;
        let subtotal = self.calculator.subtotal(&items);

        let rejection = match self.coupons_repository.find_by_code(tx, code).await? {
            Some(coupon) => {
                let check = CouponCheck {
                    now: Timestamp::now(),
                    subtotal,
                    user_redemptions: self.user_redemptions(tx, &coupon, &cart.owner).await?,
                };

                match validate_coupon(&coupon, &check) {
                    Ok(()) => {
                        let discount = self.calculator.discount(subtotal, &coupon.discount);

                        self.carts_repository
                            .update_coupon(tx, cart.uuid, Some(code), discount)
                            .await?;

                        return Ok(false);
                    }
                    Err(rejection) => rejection.to_string(),
                }
            }
            None => "coupon no longer exists".to_owned(),
        };

        self.carts_repository
            .update_coupon(tx, cart.uuid, None, 0)
            .await?;

        info!(cart_uuid = %cart.uuid, coupon = code, %rejection, "coupon removed from cart");

        Ok(true)
    }

    fn emit_coupon_removed(&self, cart: CartUuid, removed: bool) {
        if removed {
            self.events.emit(CartEvent::CouponRemoved { cart });
        }
    }

    fn summarise(&self, cart: CartRecord) -> CartSummary {
        let totals = self.calculator.summarise(&cart.items, cart.discount_amount);

        CartSummary { cart, totals }
    }

    /// Folds the guest's lines into the user's cart. Lines are visited in
    /// (product, variant) order so stock locks are taken in the same order
    /// as checkout.
    async fn merge_lines(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        mut guest_items: Vec<CartItemRecord>,
        user_cart: &CartRecord,
    ) -> Result<(), CartsServiceError> {
        let existing: FxHashMap<(ProductUuid, Option<VariantUuid>), &CartItemRecord> = user_cart
            .items
            .iter()
            .map(|item| ((item.product_uuid, item.variant_uuid), item))
            .collect();

        guest_items.sort_by_key(|item| (item.product_uuid, item.variant_uuid));

        for guest_item in guest_items {
            let Some(user_item) = existing.get(&(guest_item.product_uuid, guest_item.variant_uuid))
            else {
                self.items_repository
                    .move_item(tx, guest_item.uuid, user_cart.uuid)
                    .await?;

                continue;
            };

            let desired = user_item
                .quantity
                .saturating_add(guest_item.quantity)
                .min(self.settings.max_quantity);

            let available = self.stock.lock_stock(tx, guest_item.stock_ref()).await?;

            let merged = desired.min(available);

            if merged == 0 {
                self.items_repository
                    .delete_item(tx, user_cart.uuid, user_item.uuid)
                    .await?;
            } else if merged != user_item.quantity {
                self.items_repository
                    .update_quantity(tx, user_cart.uuid, user_item.uuid, merged)
                    .await?;
            }
        }

        Ok(())
    }
}

impl Debug for PgCartsService {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PgCartsService")
            .field("db", &self.db)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CartsService for PgCartsService {
    async fn find_cart(&self, actor: &Actor) -> Result<Option<CartRecord>, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = match self.carts_repository.find_by_owner(&mut tx, actor).await? {
            Some(mut cart) => {
                cart.items = self.items_repository.list_items(&mut tx, cart.uuid).await?;

                Some(cart)
            }
            None => None,
        };

        tx.commit().await?;

        Ok(cart)
    }

    #[tracing::instrument(
        name = "carts.service.get_or_create_cart",
        skip(self, actor),
        fields(actor = %actor),
        err
    )]
    async fn get_or_create_cart(&self, actor: &Actor) -> Result<CartRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let (cart, created) = self.find_or_create(&mut tx, actor).await?;

        tx.commit().await?;

        if created {
            info!(cart_uuid = %cart.uuid, "cart created");

            self.events.emit(CartEvent::CartCreated {
                cart: cart.uuid,
                owner: cart.owner.clone(),
            });
        }

        Ok(cart)
    }

    async fn get_cart(&self, cart: CartUuid) -> Result<CartRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self.load_cart(&mut tx, cart).await?;

        tx.commit().await?;

        Ok(cart)
    }

    async fn get_summary(&self, cart: CartUuid) -> Result<CartSummary, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self.load_cart(&mut tx, cart).await?;

        tx.commit().await?;

        ensure_not_expired(&cart, Timestamp::now())?;

        Ok(self.summarise(cart))
    }

    #[tracing::instrument(
        name = "carts.service.add_item",
        skip(self, actor, item),
        fields(
            cart_uuid = %cart,
            product_uuid = %item.product_uuid,
            quantity = item.quantity
        ),
        err
    )]
    async fn add_item(
        &self,
        cart: CartUuid,
        actor: &Actor,
        item: NewCartItem,
    ) -> Result<CartItemRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let record = self.load_guarded(&mut tx, cart, actor).await?;

        self.ensure_quantity(item.quantity)?;

        let sellable = self
            .stock
            .resolve(&mut tx, item.product_uuid, item.variant_uuid)
            .await?;

        let existing = self
            .items_repository
            .find_line(&mut tx, cart, item.product_uuid, item.variant_uuid)
            .await?;

        let line = match existing {
            Some(existing) => {
                let quantity = existing.quantity.saturating_add(item.quantity);

                self.ensure_quantity(quantity)?;
                self.stock
                    .validate_stock(&mut tx, &sellable, quantity)
                    .await?;

                self.items_repository
                    .update_quantity(&mut tx, cart, existing.uuid, quantity)
                    .await?
            }
            None => {
                self.stock
                    .validate_stock(&mut tx, &sellable, item.quantity)
                    .await?;

                self.items_repository
                    .create_item(&mut tx, cart, &item, sellable.unit_price())
                    .await?
            }
        };

        let coupon_removed = self.refresh_discount(&mut tx, &record).await?;

        tx.commit().await?;

        info!(item_uuid = %line.uuid, line_quantity = line.quantity, "item added to cart");

        self.events.emit(CartEvent::ItemAdded {
            cart,
            item: line.uuid,
            product: line.product_uuid,
            variant: line.variant_uuid,
            quantity: item.quantity,
        });
        self.emit_coupon_removed(cart, coupon_removed);

        Ok(line)
    }

    #[tracing::instrument(
        name = "carts.service.update_quantity",
        skip(self, actor),
        fields(cart_uuid = %cart, item_uuid = %item),
        err
    )]
    async fn update_quantity(
        &self,
        cart: CartUuid,
        actor: &Actor,
        item: CartItemUuid,
        quantity: u32,
    ) -> Result<CartItemRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let record = self.load_guarded(&mut tx, cart, actor).await?;

        self.ensure_quantity(quantity)?;

        let existing = self
            .items_repository
            .find_item(&mut tx, cart, item)
            .await?
            .ok_or(CartsServiceError::CartItemNotFound)?;

        let sellable = self
            .stock
            .resolve(&mut tx, existing.product_uuid, existing.variant_uuid)
            .await?;

        self.stock
            .validate_stock(&mut tx, &sellable, quantity)
            .await?;

        let line = self
            .items_repository
            .update_quantity(&mut tx, cart, item, quantity)
            .await?;

        let coupon_removed = self.refresh_discount(&mut tx, &record).await?;

        tx.commit().await?;

        self.events.emit(CartEvent::ItemUpdated {
            cart,
            item,
            quantity,
        });
        self.emit_coupon_removed(cart, coupon_removed);

        Ok(line)
    }

    #[tracing::instrument(
        name = "carts.service.remove_item",
        skip(self, actor),
        fields(cart_uuid = %cart, item_uuid = %item),
        err
    )]
    async fn remove_item(
        &self,
        cart: CartUuid,
        actor: &Actor,
        item: CartItemUuid,
    ) -> Result<(), CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let record = self.load_guarded(&mut tx, cart, actor).await?;

        let rows_affected = self
            .items_repository
            .delete_item(&mut tx, cart, item)
            .await?;

        if rows_affected == 0 {
            return Err(CartsServiceError::CartItemNotFound);
        }

        let coupon_removed = self.refresh_discount(&mut tx, &record).await?;

        tx.commit().await?;

        self.events.emit(CartEvent::ItemRemoved { cart, item });
        self.emit_coupon_removed(cart, coupon_removed);

        Ok(())
    }

    #[tracing::instrument(
        name = "carts.service.clear_cart",
        skip(self, actor),
        fields(cart_uuid = %cart),
        err
    )]
    async fn clear_cart(&self, cart: CartUuid, actor: &Actor) -> Result<(), CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let record = self.load_guarded(&mut tx, cart, actor).await?;

        self.items_repository.delete_items(&mut tx, cart).await?;

        let coupon_removed = self.refresh_discount(&mut tx, &record).await?;

        tx.commit().await?;

        self.events.emit(CartEvent::CartCleared { cart });
        self.emit_coupon_removed(cart, coupon_removed);

        Ok(())
    }

    #[tracing::instrument(
        name = "carts.service.apply_coupon",
        skip(self, actor, code),
        fields(cart_uuid = %cart),
        err
    )]
    async fn apply_coupon(
        &self,
        cart: CartUuid,
        actor: &Actor,
        code: &str,
    ) -> Result<CartSummary, CartsServiceError> {
        let code = normalize_code(code);
        let mut tx = self.db.begin().await?;

        let mut record = self.load_guarded(&mut tx, cart, actor).await?;

        let coupon = self
            .coupons_repository
            .find_by_code(&mut tx, &code)
            .await?
            .ok_or(CartsServiceError::CouponNotFound)?;

        let subtotal = self.calculator.subtotal(&record.items);

        let user_redemptions = self.user_redemptions(&mut tx, &coupon, actor).await?;

        validate_coupon(
            &coupon,
            &CouponCheck {
                now: Timestamp::now(),
                subtotal,
                user_redemptions,
            },
        )?;

        let discount = self.calculator.discount(subtotal, &coupon.discount);

        self.carts_repository
            .update_coupon(&mut tx, cart, Some(coupon.code.as_str()), discount)
            .await?;

        tx.commit().await?;

        info!(coupon = %coupon.code, discount, "coupon applied");

        self.events.emit(CartEvent::CouponApplied {
            cart,
            code: coupon.code.clone(),
            discount,
        });

        record.coupon_code = Some(coupon.code);
        record.discount_amount = discount;

        Ok(self.summarise(record))
    }

    #[tracing::instrument(
        name = "carts.service.remove_coupon",
        skip(self, actor),
        fields(cart_uuid = %cart),
        err
    )]
    async fn remove_coupon(
        &self,
        cart: CartUuid,
        actor: &Actor,
    ) -> Result<CartSummary, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let mut record = self.load_guarded(&mut tx, cart, actor).await?;

        self.carts_repository
            .update_coupon(&mut tx, cart, None, 0)
            .await?;

        tx.commit().await?;

        if record.coupon_code.take().is_some() {
            self.events.emit(CartEvent::CouponRemoved { cart });
        }

        record.discount_amount = 0;

        Ok(self.summarise(record))
    }

    #[tracing::instrument(
        name = "carts.service.migrate_guest_cart",
        skip(self, session),
        fields(user_uuid = %user),
        err
    )]
    async fn migrate_guest_cart(
        &self,
        session: &SessionToken,
        user: UserUuid,
    ) -> Result<Option<CartRecord>, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let Some(guest_cart) = self
            .carts_repository
            .find_by_session(&mut tx, session)
            .await?
        else {
            return Ok(None);
        };

        if guest_cart.is_expired_at(Timestamp::now()) {
            self.carts_repository
                .delete_cart(&mut tx, guest_cart.uuid)
                .await?;

            tx.commit().await?;

            info!(cart_uuid = %guest_cart.uuid, "expired guest cart discarded at login");

            return Ok(None);
        }

        let owner = CartOwner::User(user);
        let (user_cart, created) = self.find_or_create(&mut tx, &owner).await?;

        let guest_items = self
            .items_repository
            .list_items(&mut tx, guest_cart.uuid)
            .await?;

        self.merge_lines(&mut tx, guest_items, &user_cart).await?;

        self.carts_repository
            .delete_cart(&mut tx, guest_cart.uuid)
            .await?;

        let coupon_removed = self.refresh_discount(&mut tx, &user_cart).await?;

        let merged = self.load_cart(&mut tx, user_cart.uuid).await?;

        tx.commit().await?;

        info!(
            from = %guest_cart.uuid,
            to = %merged.uuid,
            lines = merged.items.len(),
            "guest cart migrated"
        );

        if created {
            self.events.emit(CartEvent::CartCreated {
                cart: merged.uuid,
                owner,
            });
        }

        self.events.emit(CartEvent::CartMigrated {
            from: guest_cart.uuid,
            to: merged.uuid,
            user,
        });
        self.emit_coupon_removed(merged.uuid, coupon_removed);

        Ok(Some(merged))
    }

    #[tracing::instrument(
        name = "carts.service.checkout",
        skip(self, actor, checkout),
        fields(cart_uuid = %cart),
        err
    )]
    async fn checkout(
        &self,
        cart: CartUuid,
        actor: &Actor,
        checkout: NewCheckout,
    ) -> Result<OrderRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let record = self.load_guarded(&mut tx, cart, actor).await?;

        tx.commit().await?;

        if record.is_empty() {
            return Err(CartsServiceError::EmptyCart);
        }

        let order = self.checkout.process_checkout(&record, checkout).await?;

        Ok(order)
    }

    #[tracing::instrument(name = "carts.service.purge_expired", skip(self), err)]
    async fn purge_expired(&self, batch_size: u32) -> Result<u64, CartsServiceError> {
        let batch_size = batch_size.max(1);
        let mut purged = 0_u64;

        loop {
            let mut tx = self.db.begin().await?;

            let deleted = self
                .carts_repository
                .delete_expired(&mut tx, Timestamp::now(), batch_size)
                .await?;

            tx.commit().await?;

            purged = purged.saturating_add(deleted);

            if deleted < u64::from(batch_size) {
                break;
            }
        }

        info!(purged, "expired carts purged");

        Ok(purged)
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// The actor's cart, if they have one.
    async fn find_cart(&self, actor: &Actor) -> Result<Option<CartRecord>, CartsServiceError>;

    /// The actor's cart, created when missing. Guest carts get an expiry.
    async fn get_or_create_cart(&self, actor: &Actor) -> Result<CartRecord, CartsServiceError>;

    /// Retrieve a single cart with its lines.
    async fn get_cart(&self, cart: CartUuid) -> Result<CartRecord, CartsServiceError>;

    /// The cart with totals computed from its current lines.
    async fn get_summary(&self, cart: CartUuid) -> Result<CartSummary, CartsServiceError>;

    /// Add a product (or one of its variants) to the cart, merging with an
    /// existing line for the same item.
    async fn add_item(
        &self,
        cart: CartUuid,
        actor: &Actor,
        item: NewCartItem,
    ) -> Result<CartItemRecord, CartsServiceError>;

    /// Replace the quantity of a line.
    async fn update_quantity(
        &self,
        cart: CartUuid,
        actor: &Actor,
        item: CartItemUuid,
        quantity: u32,
    ) -> Result<CartItemRecord, CartsServiceError>;

    /// Remove a line from the cart.
    async fn remove_item(
        &self,
        cart: CartUuid,
        actor: &Actor,
        item: CartItemUuid,
    ) -> Result<(), CartsServiceError>;

    /// Remove every line, keeping the cart.
    async fn clear_cart(&self, cart: CartUuid, actor: &Actor) -> Result<(), CartsServiceError>;

    /// Apply a coupon code, replacing any coupon already applied.
    async fn apply_coupon(
        &self,
        cart: CartUuid,
        actor: &Actor,
        code: &str,
    ) -> Result<CartSummary, CartsServiceError>;

    /// Remove the applied coupon, if any.
    async fn remove_coupon(
        &self,
        cart: CartUuid,
        actor: &Actor,
    ) -> Result<CartSummary, CartsServiceError>;

    /// Merge the session's cart into the user's cart at login.
    async fn migrate_guest_cart(
        &self,
        session: &SessionToken,
        user: UserUuid,
    ) -> Result<Option<CartRecord>, CartsServiceError>;

    /// Turn the cart into an order.
    async fn checkout(
        &self,
        cart: CartUuid,
        actor: &Actor,
        checkout: NewCheckout,
    ) -> Result<OrderRecord, CartsServiceError>;

    /// Delete expired guest carts in batches of `batch_size`.
    async fn purge_expired(&self, batch_size: u32) -> Result<u64, CartsServiceError>;
}
