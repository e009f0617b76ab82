//! Cart Calculator
//!
//! Pure pricing over cart lines. All amounts are minor units; fractional
//! results round half away from zero. Arithmetic saturates rather than wraps.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

use crate::{
    domain::{carts::records::CartItemRecord, coupons::records::CouponDiscount},
    settings::CheckoutSettings,
};

/// Totals for a whole cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartTotals {
    pub subtotal: u64,
    pub discount: u64,
    pub tax: u64,
    pub shipping: u64,
    pub total: u64,

    /// Sum of line quantities.
    pub item_count: u64,
}

/// Totals for a single line, as frozen onto an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTotals {
    pub subtotal: u64,
    pub tax: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartCalculator {
    tax_rate: Decimal,
    shipping_cost: u64,
}

impl CartCalculator {
    #[must_use]
    pub fn new(settings: &CheckoutSettings) -> Self {
        Self {
            tax_rate: settings.tax_rate,
            shipping_cost: settings.shipping_cost,
        }
    }

    #[must_use]
    pub fn subtotal(&self, items: &[CartItemRecord]) -> u64 {
        items.iter().fold(0_u64, |acc, item| {
            acc.saturating_add(item.unit_price.saturating_mul(u64::from(item.quantity)))
        })
    }

    /// Discount a coupon is worth on `subtotal`; never more than `subtotal`.
    #[must_use]
    pub fn discount(&self, subtotal: u64, discount: &CouponDiscount) -> u64 {
        let amount = match discount {
            CouponDiscount::FixedAmount { amount } => *amount,
            CouponDiscount::Percentage {
                percentage,
                max_discount,
            } => {
                let amount = apply_rate(*percentage / Decimal::ONE_HUNDRED, subtotal);

                max_discount.map_or(amount, |cap| amount.min(cap))
            }
            CouponDiscount::Unsupported { .. } => 0,
        };

        amount.min(subtotal)
    }

    #[must_use]
    pub fn tax(&self, amount: u64) -> u64 {
        apply_rate(self.tax_rate, amount)
    }

    #[must_use]
    pub fn shipping(&self) -> u64 {
        self.shipping_cost
    }

    /// `(subtotal - discount) + tax(subtotal - discount) + shipping`
    #[must_use]
    pub fn total(&self, subtotal: u64, discount: u64) -> u64 {
        let taxable = subtotal.saturating_sub(discount);

        taxable
            .saturating_add(self.tax(taxable))
            .saturating_add(self.shipping())
    }

    /// Totals for `items` with an already-known discount, which is clamped to
    /// the subtotal.
    #[must_use]
    pub fn summarise(&self, items: &[CartItemRecord], discount: u64) -> CartTotals {
        let subtotal = self.subtotal(items);
        let discount = discount.min(subtotal);
        let taxable = subtotal - discount;

        CartTotals {
            subtotal,
            discount,
            tax: self.tax(taxable),
            shipping: self.shipping(),
            total: self.total(subtotal, discount),
            item_count: items.iter().map(|item| u64::from(item.quantity)).sum(),
        }
    }

    #[must_use]
    pub fn line_totals(&self, unit_price: u64, quantity: u32) -> LineTotals {
        let subtotal = unit_price.saturating_mul(u64::from(quantity));
        let tax = self.tax(subtotal);

        LineTotals {
            subtotal,
            tax,
            total: subtotal.saturating_add(tax),
        }
    }
}

fn apply_rate(rate: Decimal, minor: u64) -> u64 {
    let Some(applied) = rate.checked_mul(Decimal::from(minor)) else {
        return u64::MAX;
    };

    let rounded = applied.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    if rounded.is_sign_negative() {
        return 0;
    }

    rounded.to_u64().unwrap_or(u64::MAX)
}
