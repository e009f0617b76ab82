//! Cart Events
//!
//! Side effects of cart and checkout operations. Events are emitted only
//! after the owning transaction commits; a sink can neither veto nor roll
//! back the change that produced them.

use mockall::automock;
use tracing::info;

use crate::domain::{
    actors::UserUuid,
    carts::records::{CartItemUuid, CartOwner, CartUuid},
    catalog::records::{ProductUuid, VariantUuid},
    orders::records::OrderUuid,
};

#[derive(Debug, Clone, PartialEq)]
pub enum CartEvent {
    CartCreated { cart: CartUuid, owner: CartOwner },
    ItemAdded {
        cart: CartUuid,
        item: CartItemUuid,
        product: ProductUuid,
        variant: Option<VariantUuid>,
        quantity: u32,
    },
    ItemUpdated {
        cart: CartUuid,
        item: CartItemUuid,
        quantity: u32,
    },
    ItemRemoved { cart: CartUuid, item: CartItemUuid },
    CartCleared { cart: CartUuid },
    CouponApplied {
        cart: CartUuid,
        code: String,
        discount: u64,
    },
    CouponRemoved { cart: CartUuid },
    CartMigrated {
        from: CartUuid,
        to: CartUuid,
        user: UserUuid,
    },
    CheckoutSucceeded {
        cart: CartUuid,
        order: OrderUuid,
        number: String,
        total: u64,
    },
    CheckoutFailed { cart: CartUuid, reason: String },
}

impl CartEvent {
    /// Stable snake-case name, used as a log field and metric label.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CartCreated { .. } => "cart_created",
            Self::ItemAdded { .. } => "item_added",
            Self::ItemUpdated { .. } => "item_updated",
            Self::ItemRemoved { .. } => "item_removed",
            Self::CartCleared { .. } => "cart_cleared",
            Self::CouponApplied { .. } => "coupon_applied",
            Self::CouponRemoved { .. } => "coupon_removed",
            Self::CartMigrated { .. } => "cart_migrated",
            Self::CheckoutSucceeded { .. } => "checkout_succeeded",
            Self::CheckoutFailed { .. } => "checkout_failed",
        }
    }

    /// The cart the event is about. For migrations, the surviving cart.
    #[must_use]
    pub fn cart(&self) -> CartUuid {
        match self {
            Self::CartCreated { cart, .. }
            | Self::ItemAdded { cart, .. }
            | Self::ItemUpdated { cart, .. }
            | Self::ItemRemoved { cart, .. }
            | Self::CartCleared { cart }
            | Self::CouponApplied { cart, .. }
            | Self::CouponRemoved { cart }
            | Self::CheckoutSucceeded { cart, .. }
            | Self::CheckoutFailed { cart, .. } => *cart,
            Self::CartMigrated { to, .. } => *to,
        }
    }
}

/// Receives events after commit. Implementations must not block.
#[automock]
pub trait EventSink: Send + Sync {
    fn emit(&self, event: CartEvent);
}

/// Writes each event as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: CartEvent) {
        info!(
            event = event.name(),
            cart = %event.cart(),
            details = ?event,
            "cart event"
        );
    }
}
