//! Get Cart Handler

use std::sync::Arc;

use salvo::prelude::*;

use crate::{
    carts::{responses::CartResponse, summary_for},
    extensions::*,
    state::State,
};

/// Get Cart Handler
///
/// Returns the caller's cart with freshly computed totals, or an empty cart
/// when they have none yet.
#[endpoint(
    tags("cart"),
    summary = "Get Cart",
    responses(
        (status_code = StatusCode::OK, description = "Cart summary"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Missing user or session header"),
        (status_code = StatusCode::GONE, description = "Cart has expired"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<CartResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let actor = depot.actor_or_401()?;

    Ok(Json(summary_for(state, actor).await?))
}
