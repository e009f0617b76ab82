//! Checkout Settings

use rust_decimal::Decimal;

/// Default ceiling for the quantity of a single cart line.
pub const DEFAULT_MAX_QUANTITY: u32 = 99;

/// Default lifetime of a guest cart, in days.
pub const DEFAULT_GUEST_CART_LIFETIME_DAYS: u16 = 30;

/// Externally owned values the cart and checkout services price with.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSettings {
    /// Tax rate as a fraction, e.g. `0.10` for 10%.
    pub tax_rate: Decimal,

    /// Flat shipping cost in minor units.
    pub shipping_cost: u64,

    /// Largest quantity a single cart line may hold.
    pub max_quantity: u32,

    /// Days a guest cart lives before it expires.
    pub guest_cart_lifetime_days: u16,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::ZERO,
            shipping_cost: 0,
            max_quantity: DEFAULT_MAX_QUANTITY,
            guest_cart_lifetime_days: DEFAULT_GUEST_CART_LIFETIME_DAYS,
        }
    }
}
