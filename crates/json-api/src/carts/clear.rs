//! Clear Cart Handler

use std::sync::Arc;

use salvo::prelude::*;

use crate::{
    carts::{current_cart, errors::into_status_error},
    extensions::*,
    state::State,
};

/// Clear Cart Handler
///
/// Removes every line. The cart itself and its coupon code are kept.
#[endpoint(
    tags("cart"),
    summary = "Clear Cart",
    responses(
        (status_code = StatusCode::NO_CONTENT, description = "Cart cleared"),
        (status_code = StatusCode::NOT_FOUND, description = "Cart not found"),
        (status_code = StatusCode::GONE, description = "Cart has expired"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(
    name = "cart.clear",
    skip(depot),
    fields(cart_uuid = tracing::field::Empty),
    err
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<StatusCode, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let actor = depot.actor_or_401()?;

    let cart = current_cart(state, actor).await?;

    tracing::Span::current().record("cart_uuid", tracing::field::display(cart.uuid));

    state
        .app
        .carts
        .clear_cart(cart.uuid, actor)
        .await
        .map_err(into_status_error)?;

    Ok(StatusCode::NO_CONTENT)
}
