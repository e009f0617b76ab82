//! Apply Coupon Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::{
    carts::{current_cart, errors::into_status_error, responses::CartResponse},
    extensions::*,
    state::State,
};

/// Apply Coupon Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct ApplyCouponRequest {
    /// Case-insensitive; surrounding whitespace is ignored
    pub code: String,
}

/// Apply Coupon Handler
///
/// Replaces any coupon already on the cart.
#[endpoint(
    tags("cart"),
    summary = "Apply Coupon",
    responses(
        (status_code = StatusCode::OK, description = "Coupon applied"),
        (status_code = StatusCode::NOT_FOUND, description = "Cart or coupon not found"),
        (status_code = StatusCode::GONE, description = "Cart has expired"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Coupon cannot be used"),
        (status_code = StatusCode::INTERNAL_SERVER_ERROR, description = "Internal Server Error"),
    ),
)]
#[tracing::instrument(name = "cart.coupon.apply", skip_all, err)]
pub(crate) async fn handler(
    json: JsonBody<ApplyCouponRequest>,
    depot: &mut Depot,
) -> Result<Json<CartResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let actor = depot.actor_or_401()?;

    let cart = current_cart(state, actor).await?;

    let summary = state
        .app
        .carts
        .apply_coupon(cart.uuid, actor, &json.into_inner().code)
        .await
        .map_err(into_status_error)?;

    Ok(Json(summary.into()))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use testresult::TestResult;

    use storefront_app::domain::carts::{CartsServiceError, MockCartsService};

    use crate::test_helpers::{Mocks, cart_service, guest, make_summary};

    use super::*;

    fn make_service(carts: MockCartsService) -> Service {
        cart_service(
            Mocks::with_carts(carts),
            guest(),
            Router::with_path("cart/coupon").put(handler),
        )
    }

    #[tokio::test]
    async fn test_apply_coupon_returns_discounted_summary() -> TestResult {
        let mut summary = make_summary(&guest());

        summary.cart.coupon_code = Some("SAVE20".to_string());
        summary.cart.discount_amount = 20_00;
        summary.totals.discount = 20_00;
        summary.totals.tax = 23_00;
        summary.totals.total = 253_00;

        let cart = summary.cart.clone();
        let cart_uuid = cart.uuid;

        let mut carts = MockCartsService::new();

        carts
            .expect_find_cart()
            .once()
            .return_once(move |_| Ok(Some(cart)));

        carts
            .expect_apply_coupon()
            .once()
            .withf(move |uuid, _, code| *uuid == cart_uuid && code == " save20 ")
            .return_once(move |_, _, _| Ok(summary));

        let mut res = TestClient::put("http://example.com/cart/coupon")
            .json(&json!({ "code": " save20 " }))
            .send(&make_service(carts))
            .await;

        let body: CartResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(body.coupon_code.as_deref(), Some("SAVE20"));
        assert_eq!(body.totals.discount, 20_00);
        assert_eq!(body.totals.total, 253_00);

        Ok(())
    }

    #[tokio::test]
    async fn test_apply_unknown_coupon_returns_404() -> TestResult {
        let cart = make_summary(&guest()).cart;

        let mut carts = MockCartsService::new();

        carts
            .expect_find_cart()
            .once()
            .return_once(move |_| Ok(Some(cart)));

        carts
            .expect_apply_coupon()
            .once()
            .return_once(|_, _, _| Err(CartsServiceError::CouponNotFound));

        let res = TestClient::put("http://example.com/cart/coupon")
            .json(&json!({ "code": "NOPE" }))
            .send(&make_service(carts))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }

    #[tokio::test]
    async fn test_apply_coupon_below_minimum_returns_422() -> TestResult {
        let cart = make_summary(&guest()).cart;

        let mut carts = MockCartsService::new();

        carts
            .expect_find_cart()
            .once()
            .return_once(move |_| Ok(Some(cart)));

        carts.expect_apply_coupon().once().return_once(|_, _, _| {
            Err(CartsServiceError::MinimumPurchaseNotMet {
                minimum: 500_00,
                subtotal: 250_00,
            })
        });

        let res = TestClient::put("http://example.com/cart/coupon")
            .json(&json!({ "code": "BIGSPEND" }))
            .send(&make_service(carts))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::UNPROCESSABLE_ENTITY));

        Ok(())
    }
}
