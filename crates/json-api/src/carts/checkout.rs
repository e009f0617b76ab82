//! Checkout Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use storefront_app::{
    domain::orders::{
        data::NewCheckout,
        records::{Address, OrderRecord, PaymentStatus},
    },
    payments::PaymentError,
};

use crate::{
    carts::{current_cart, errors::into_status_error, responses::OrderResponse},
    extensions::*,
    state::State,
};

/// Address Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct AddressRequest {
    pub name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub region: Option<String>,
    pub postal_code: String,

    /// ISO 3166-1 alpha-2
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl From<AddressRequest> for Address {
    fn from(request: AddressRequest) -> Self {
        Address {
            name: request.name,
            line1: request.line1,
            line2: request.line2,
            city: request.city,
            region: request.region,
            postal_code: request.postal_code,
            country: request.country,
            phone: request.phone,
        }
    }
}

/// Checkout Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CheckoutRequest {
    /// `cash_on_delivery` or `bank_transfer`
    pub payment_method: String,
    pub shipping_method: String,
    pub shipping_address: AddressRequest,

    /// Defaults to the shipping address when omitted
    #[serde(default)]
    pub billing_address: Option<AddressRequest>,
    #[serde(default)]
    pub customer_note: Option<String>,
}

impl From<CheckoutRequest> for NewCheckout {
    fn from(request: CheckoutRequest) -> Self {
        let shipping_address: Address = request.shipping_address.into();

        NewCheckout {
            payment_method: request.payment_method,
            shipping_method: request.shipping_method,
            billing_address: Some(
                request
                    .billing_address
                    .map_or_else(|| shipping_address.clone(), Into::into),
            ),
            shipping_address,
            customer_note: request.customer_note,
        }
    }
}

/// Hands the committed order to the payment gateway. The order stands
/// whatever the gateway says, so failures here only change its payment
/// status.
async fn settle_payment(state: &State, order: &OrderRecord) -> PaymentStatus {
    let payments = &state.app.payments;

    let outcome = match payments
        .create_payment(order, &order.payment_method)
        .await
    {
        Ok(payment) => payments.process_payment(payment).await,
        Err(error) => Err(error),
    };

    let status = match outcome {
        Ok(payment) => payment.status,
        Err(PaymentError::Declined(reason)) => {
            warn!(order_number = %order.number, %reason, "payment declined");

            PaymentStatus::Failed
        }
        Err(error @ PaymentError::UnsupportedMethod(_)) => {
            warn!(order_number = %order.number, %error, "payment could not be created");

            PaymentStatus::Failed
        }
    };

    if status == order.payment_status {
        return status;
    }

    state
        .app
        .checkout
        .record_payment_status(order.uuid, status)
        .await
        .map(|()| status)
        .or_warn("failed to record payment status", order.payment_status)
}

/// Checkout Handler
///
/// Turns the caller's cart into an order. Stock is decremented and the coupon
/// consumed in one transaction; nothing changes when any line is short.
#[endpoint(
    tags("cart"),
    summary = "Checkout",
    responses(
        (status_code = StatusCode::CREATED, description = "Order placed"),
        (status_code = StatusCode::NOT_FOUND, description = "Cart not found"),
        (status_code = StatusCode::CONFLICT, description = "Insufficient stock"),
        (status_code = StatusCode::GONE, description = "Cart has expired"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Checkout rejected"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(
    name = "cart.checkout",
    skip_all,
    fields(
        cart_uuid = tracing::field::Empty,
        order_number = tracing::field::Empty
    ),
    err
)]
pub(crate) async fn handler(
    json: JsonBody<CheckoutRequest>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<OrderResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let actor = depot.actor_or_401()?;
    let request = json.into_inner();

    if !state.app.payments.supports(&request.payment_method) {
        return Err(StatusError::unprocessable_entity().brief(format!(
            "Unsupported payment method: {}",
            request.payment_method
        )));
    }

    let cart = current_cart(state, actor).await?;

    let span = tracing::Span::current();

    span.record("cart_uuid", tracing::field::display(cart.uuid));

    let mut order = state
        .app
        .carts
        .checkout(cart.uuid, actor, request.into())
        .await
        .map_err(into_status_error)?;

    span.record("order_number", tracing::field::display(&order.number));

    order.payment_status = settle_payment(state, &order).await;

    info!(order_number = %order.number, total = order.total, "order placed");

    res.status_code(StatusCode::CREATED);

    Ok(Json(order.into()))
}
