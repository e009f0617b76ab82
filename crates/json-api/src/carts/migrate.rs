//! Migrate Guest Cart Handler

use std::sync::Arc;

use salvo::prelude::*;

use storefront_app::domain::actors::Actor;

use crate::{
    actors::middleware::session_token,
    carts::{errors::into_status_error, responses::CartResponse, summary_for},
    extensions::*,
    state::State,
};

/// Migrate Guest Cart Handler
///
/// Called once a shopper signs in. Moves the lines of the cart held by the
/// request's `x-session-token` into the signed-in user's cart, capping merged
/// quantities at available stock, and returns the user's cart.
#[endpoint(
    tags("cart"),
    summary = "Migrate Guest Cart",
    responses(
        (status_code = StatusCode::OK, description = "Guest cart merged"),
        (status_code = StatusCode::BAD_REQUEST, description = "Missing session header"),
        (status_code = StatusCode::FORBIDDEN, description = "Sign in required"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(
    name = "cart.migrate",
    skip_all,
    fields(user_uuid = tracing::field::Empty),
    err
)]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<CartResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let actor = depot.actor_or_401()?;

    let Actor::User(user) = actor else {
        return Err(StatusError::forbidden().brief("Sign in to migrate a guest cart"));
    };

    tracing::Span::current().record("user_uuid", tracing::field::display(user));

    let session = session_token(req)
        .ok_or_else(|| StatusError::bad_request().brief("Missing session header"))?;

    let migrated = state
        .app
        .carts
        .migrate_guest_cart(&session, *user)
        .await
        .map_err(into_status_error)?;

    let Some(cart) = migrated else {
        return Ok(Json(summary_for(state, actor).await?));
    };

    let summary = state
        .app
        .carts
        .get_summary(cart.uuid)
        .await
        .map_err(into_status_error)?;

    Ok(Json(summary.into()))
}
