//! Add Cart Item Handler

use std::sync::Arc;

use salvo::{
    http::header::LOCATION,
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storefront_app::domain::carts::data::NewCartItem;

use crate::{
    carts::{errors::into_status_error, responses::CartItemResponse},
    extensions::*,
    state::State,
};

/// Add Cart Item Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct AddCartItemRequest {
    pub product_uuid: Uuid,

    /// Variant of the product; stock and price come from the variant when set
    #[serde(default)]
    pub variant_uuid: Option<Uuid>,
    pub quantity: u32,
}

impl From<AddCartItemRequest> for NewCartItem {
    fn from(request: AddCartItemRequest) -> Self {
        NewCartItem::new(
            request.product_uuid.into(),
            request.variant_uuid.map(Into::into),
            request.quantity,
        )
    }
}

/// Add Cart Item Handler
///
/// Creates the caller's cart on first use. Adding an item that is already in
/// the cart increases that line's quantity.
#[endpoint(
    tags("cart"),
    summary = "Add Item to Cart",
    responses(
        (status_code = StatusCode::CREATED, description = "Item added"),
        (status_code = StatusCode::NOT_FOUND, description = "Product not found"),
        (status_code = StatusCode::CONFLICT, description = "Insufficient stock"),
        (status_code = StatusCode::GONE, description = "Cart has expired"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Invalid quantity"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(
    name = "cart.items.create",
    skip(json, depot, res),
    fields(cart_uuid = tracing::field::Empty),
    err
)]
pub(crate) async fn handler(
    json: JsonBody<AddCartItemRequest>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<CartItemResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let actor = depot.actor_or_401()?;

    let cart = state
        .app
        .carts
        .get_or_create_cart(actor)
        .await
        .map_err(into_status_error)?;

    tracing::Span::current().record("cart_uuid", tracing::field::display(cart.uuid));

    let item = state
        .app
        .carts
        .add_item(cart.uuid, actor, json.into_inner().into())
        .await
        .map_err(into_status_error)?;

    res.add_header(LOCATION, format!("/cart/items/{}", item.uuid), true)
        .or_500("failed to set location header")?
        .status_code(StatusCode::CREATED);

    Ok(Json(item.into()))
}
