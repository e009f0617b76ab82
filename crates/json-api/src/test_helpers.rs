//! Test helpers.

use std::sync::Arc;

use jiff::Timestamp;
use salvo::{affix_state::inject, prelude::*};

use storefront_app::{
    context::AppContext,
    domain::{
        actors::{Actor, SessionToken, UserUuid},
        carts::{
            MockCartsService,
            calculator::CartTotals,
            records::{CartItemRecord, CartItemUuid, CartRecord, CartSummary, CartUuid},
        },
        catalog::records::ProductUuid,
        orders::{
            MockCheckoutService,
            records::{Address, OrderRecord, OrderStatus, OrderUuid, PaymentStatus},
        },
    },
    payments::MockPaymentGateway,
};

use crate::state::State;

pub(crate) const TEST_SESSION: &str = "test-session-token";

pub(crate) fn guest() -> Actor {
    Actor::Guest(SessionToken::new(TEST_SESSION))
}

pub(crate) fn user() -> Actor {
    Actor::User(UserUuid::new())
}

/// The service mocks behind a test router. Anything a test does not set up
/// rejects every call.
#[derive(Default)]
pub(crate) struct Mocks {
    pub carts: MockCartsService,
    pub checkout: MockCheckoutService,
    pub payments: MockPaymentGateway,
}

impl Mocks {
    pub(crate) fn with_carts(carts: MockCartsService) -> Self {
        Self {
            carts,
            ..Self::default()
        }
    }
}

pub(crate) fn state_with(mocks: Mocks) -> Arc<State> {
    State::shared(AppContext {
        carts: Arc::new(mocks.carts),
        checkout: Arc::new(mocks.checkout),
        payments: Arc::new(mocks.payments),
    })
}

/// Mounts `route` under the given actor, skipping header resolution.
pub(crate) fn cart_service(mocks: Mocks, actor: Actor, route: Router) -> Service {
    Service::new(
        Router::new()
            .hoop(inject(state_with(mocks)))
            .hoop(inject(actor))
            .push(route),
    )
}

pub(crate) fn make_cart(actor: &Actor) -> CartRecord {
    CartRecord {
        uuid: CartUuid::new(),
        owner: actor.clone(),
        coupon_code: None,
        discount_amount: 0,
        expires_at: None,
        items: Vec::new(),
        created_at: Timestamp::UNIX_EPOCH,
        updated_at: Timestamp::UNIX_EPOCH,
    }
}

pub(crate) fn make_item(cart: &CartRecord, unit_price: u64, quantity: u32) -> CartItemRecord {
    CartItemRecord {
        uuid: CartItemUuid::new(),
        cart_uuid: cart.uuid,
        product_uuid: ProductUuid::new(),
        variant_uuid: None,
        quantity,
        unit_price,
        created_at: Timestamp::UNIX_EPOCH,
        updated_at: Timestamp::UNIX_EPOCH,
    }
}

/// A cart holding one line of 5 x 50.00 at 10% tax.
pub(crate) fn make_summary(actor: &Actor) -> CartSummary {
    let mut cart = make_cart(actor);

    cart.items.push(make_item(&cart, 50_00, 5));

    CartSummary {
        cart,
        totals: CartTotals {
            subtotal: 250_00,
            discount: 0,
            tax: 25_00,
            shipping: 0,
            total: 275_00,
            item_count: 5,
        },
    }
}

pub(crate) fn make_address() -> Address {
    Address {
        name: "Ada Lovelace".to_string(),
        line1: "12 Analytical Way".to_string(),
        line2: None,
        city: "London".to_string(),
        region: None,
        postal_code: "N1 9GU".to_string(),
        country: "GB".to_string(),
        phone: None,
    }
}

pub(crate) fn make_order(cart: &CartRecord) -> OrderRecord {
    OrderRecord {
        uuid: OrderUuid::new(),
        number: "ORD-20260301-ABCDEFGH".to_string(),
        cart_uuid: cart.uuid,
        user_uuid: cart.owner.user_uuid(),
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
        subtotal: 250_00,
        discount: 0,
        tax: 25_00,
        shipping: 0,
        total: 275_00,
        coupon_code: None,
        payment_method: "cash_on_delivery".to_string(),
        shipping_method: "standard".to_string(),
        shipping_address: make_address(),
        billing_address: None,
        customer_note: None,
        items: Vec::new(),
        created_at: Timestamp::UNIX_EPOCH,
    }
}
