//! Cart Records

use jiff::Timestamp;

use crate::{
    domain::{
        actors::Actor,
        carts::calculator::CartTotals,
        catalog::records::{ProductUuid, StockRef, VariantUuid},
    },
    uuids::TypedUuid,
};

/// Cart UUID
pub type CartUuid = TypedUuid<CartRecord>;

/// Whoever a cart belongs to: exactly one registered user or one session.
pub type CartOwner = Actor;

/// Cart Record
#[derive(Debug, Clone)]
pub struct CartRecord {
    pub uuid: CartUuid,
    pub owner: CartOwner,
    pub coupon_code: Option<String>,
    pub discount_amount: u64,

    /// Only guest carts expire.
    pub expires_at: Option<Timestamp>,
    pub items: Vec<CartItemRecord>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CartRecord {
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A cart with its lines and freshly computed totals.
#[derive(Debug, Clone)]
pub struct CartSummary {
    pub cart: CartRecord,
    pub totals: CartTotals,
}

/// Cart Item UUID
pub type CartItemUuid = TypedUuid<CartItemRecord>;

/// Cart Item Record
#[derive(Debug, Clone, PartialEq)]
pub struct CartItemRecord {
    pub uuid: CartItemUuid,
    pub cart_uuid: CartUuid,
    pub product_uuid: ProductUuid,
    pub variant_uuid: Option<VariantUuid>,
    pub quantity: u32,

    /// Price captured when the line was first added.
    pub unit_price: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CartItemRecord {
    #[must_use]
    pub fn stock_ref(&self) -> StockRef {
        StockRef::of(self.product_uuid, self.variant_uuid)
    }

    /// Same product and variant as another line.
    #[must_use]
    pub fn same_line_as(&self, other: &Self) -> bool {
        self.product_uuid == other.product_uuid && self.variant_uuid == other.variant_uuid
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use crate::domain::actors::SessionToken;

    use super::*;

    fn cart(expires_at: Option<Timestamp>) -> CartRecord {
        CartRecord {
            uuid: CartUuid::new(),
            owner: CartOwner::Guest(SessionToken::new("session")),
            coupon_code: None,
            discount_amount: 0,
            expires_at,
            items: Vec::new(),
            created_at: Timestamp::UNIX_EPOCH,
            updated_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn carts_without_expiry_never_expire() {
        assert!(!cart(None).is_expired_at(Timestamp::MAX));
    }

    #[test]
    fn expiry_is_strictly_after_the_deadline() {
        let deadline = Timestamp::UNIX_EPOCH
            .checked_add(SignedDuration::from_hours(1))
            .expect("valid timestamp");

        let cart = cart(Some(deadline));

        assert!(!cart.is_expired_at(deadline));
        assert!(cart.is_expired_at(
            deadline
                .checked_add(SignedDuration::from_secs(1))
                .expect("valid timestamp")
        ));
    }
}
