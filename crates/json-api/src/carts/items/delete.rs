//! Remove Cart Item Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    carts::{current_cart, errors::into_status_error},
    extensions::*,
    state::State,
};

/// Remove Cart Item Handler
#[endpoint(
    tags("cart"),
    summary = "Remove Item from Cart",
    responses(
        (status_code = StatusCode::NO_CONTENT, description = "Item removed"),
        (status_code = StatusCode::NOT_FOUND, description = "Cart or item not found"),
        (status_code = StatusCode::GONE, description = "Cart has expired"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(name = "cart.items.delete", skip_all, err)]
pub(crate) async fn handler(
    item: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<StatusCode, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let actor = depot.actor_or_401()?;

    let cart = current_cart(state, actor).await?;

    state
        .app
        .carts
        .remove_item(cart.uuid, actor, item.into_inner().into())
        .await
        .map_err(into_status_error)?;

    Ok(StatusCode::NO_CONTENT)
}
