//! Remove Coupon Handler

use std::sync::Arc;

use salvo::prelude::*;

use crate::{
    carts::{current_cart, errors::into_status_error, responses::CartResponse},
    extensions::*,
    state::State,
};

/// Remove Coupon Handler
#[endpoint(
    tags("cart"),
    summary = "Remove Coupon",
    responses(
        (status_code = StatusCode::OK, description = "Coupon removed"),
        (status_code = StatusCode::NOT_FOUND, description = "Cart not found"),
        (status_code = StatusCode::GONE, description = "Cart has expired"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(name = "cart.coupon.remove", skip_all, err)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<CartResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let actor = depot.actor_or_401()?;

    let cart = current_cart(state, actor).await?;

    let summary = state
        .app
        .carts
        .remove_coupon(cart.uuid, actor)
        .await
        .map_err(into_status_error)?;

    Ok(Json(summary.into()))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use storefront_app::domain::carts::MockCartsService;

    use crate::test_helpers::{Mocks, cart_service, make_summary, user};

    use super::*;

    #[tokio::test]
    async fn test_remove_coupon_returns_summary() -> TestResult {
        let actor = user();
        let summary = make_summary(&actor);
        let cart = summary.cart.clone();
        let cart_uuid = cart.uuid;
        let expected = actor.clone();

        let mut carts = MockCartsService::new();

        carts
            .expect_find_cart()
            .once()
            .return_once(move |_| Ok(Some(cart)));

        carts
            .expect_remove_coupon()
            .once()
            .withf(move |uuid, actor| *uuid == cart_uuid && *actor == expected)
            .return_once(move |_, _| Ok(summary));

        let service = cart_service(
            Mocks::with_carts(carts),
            actor,
            Router::with_path("cart/coupon").delete(handler),
        );

        let mut res = TestClient::delete("http://example.com/cart/coupon")
            .send(&service)
            .await;

        let body: CartResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(body.coupon_code, None);
        assert_eq!(body.totals.discount, 0);

        Ok(())
    }
}
