//! Checkout Config

use clap::Args;
use rust_decimal::Decimal;

use storefront_app::settings::{
    CheckoutSettings, DEFAULT_GUEST_CART_LIFETIME_DAYS, DEFAULT_MAX_QUANTITY,
};

/// Pricing and cart limit settings.
#[derive(Debug, Args)]
pub struct CheckoutConfig {
    /// Tax rate as a fraction, e.g. 0.10 for 10%
    #[arg(long, env = "TAX_RATE", default_value_t = Decimal::ZERO)]
    pub tax_rate: Decimal,

    /// Flat shipping cost in minor units
    #[arg(long, env = "SHIPPING_COST", default_value_t = 0)]
    pub shipping_cost: u64,

    /// Largest quantity a single cart line may hold
    #[arg(long, env = "MAX_LINE_QUANTITY", default_value_t = DEFAULT_MAX_QUANTITY)]
    pub max_line_quantity: u32,

    /// Days a guest cart lives before it expires
    #[arg(
        long,
        env = "GUEST_CART_LIFETIME_DAYS",
        default_value_t = DEFAULT_GUEST_CART_LIFETIME_DAYS
    )]
    pub guest_cart_lifetime_days: u16,
}

impl CheckoutConfig {
    /// Settings handed to the cart and checkout services.
    #[must_use]
    pub fn settings(&self) -> CheckoutSettings {
        CheckoutSettings {
            tax_rate: self.tax_rate,
            shipping_cost: self.shipping_cost,
            max_quantity: self.max_line_quantity,
            guest_cart_lifetime_days: self.guest_cart_lifetime_days,
        }
    }
}
