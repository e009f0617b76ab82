//! Cart Endpoints
//!
//! Every route acts on the caller's own cart, resolved from the actor the
//! actor middleware injected.

use salvo::prelude::StatusError;

use storefront_app::domain::{actors::Actor, carts::records::CartRecord};

use crate::{
    carts::{errors::into_status_error, responses::CartResponse},
    state::State,
};

pub(crate) mod checkout;
pub(crate) mod clear;
pub(crate) mod coupon;
pub(crate) mod errors;
pub(crate) mod get;
pub(crate) mod items;
pub(crate) mod migrate;
pub(crate) mod responses;

/// The actor's cart, or 404 when they have none yet.
pub(crate) async fn current_cart(state: &State, actor: &Actor) -> Result<CartRecord, StatusError> {
    state
        .app
        .carts
        .find_cart(actor)
        .await
        .map_err(into_status_error)?
        .ok_or_else(|| StatusError::not_found().brief("Cart not found"))
}

/// The actor's cart with totals; an empty cart when they have none yet.
pub(crate) async fn summary_for(state: &State, actor: &Actor) -> Result<CartResponse, StatusError> {
    let Some(cart) = state
        .app
        .carts
        .find_cart(actor)
        .await
        .map_err(into_status_error)?
    else {
        return Ok(CartResponse::empty());
    };

    let summary = state
        .app
        .carts
        .get_summary(cart.uuid)
        .await
        .map_err(into_status_error)?;

    Ok(summary.into())
}
