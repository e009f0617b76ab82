//! Errors

use salvo::http::StatusError;
use tracing::error;

use storefront_app::domain::{carts::CartsServiceError, orders::CheckoutError};

pub(crate) fn into_status_error(error: CartsServiceError) -> StatusError {
    match error {
        CartsServiceError::CartExpired => StatusError::gone().brief("Cart has expired"),
        CartsServiceError::UnauthorizedCartAccess => {
            StatusError::forbidden().brief("Cart belongs to someone else")
        }
        CartsServiceError::NotFound => StatusError::not_found().brief("Cart not found"),
        CartsServiceError::CartItemNotFound => {
            StatusError::not_found().brief("Cart item not found")
        }
        CartsServiceError::ProductNotFound => StatusError::not_found().brief("Product not found"),
        CartsServiceError::CouponNotFound => StatusError::not_found().brief("Coupon not found"),
        error @ CartsServiceError::InsufficientStock { .. } => {
            StatusError::conflict().brief(error.to_string())
        }
        error @ (CartsServiceError::ProductInactive
        | CartsServiceError::InvalidQuantity { .. }
        | CartsServiceError::CouponInactive
        | CartsServiceError::CouponExpired
        | CartsServiceError::CouponUsageLimitReached
        | CartsServiceError::MinimumPurchaseNotMet { .. }
        | CartsServiceError::EmptyCart) => {
            StatusError::unprocessable_entity().brief(error.to_string())
        }
        CartsServiceError::Checkout(source) => checkout_status_error(source),
        CartsServiceError::AlreadyExists => StatusError::conflict().brief("Cart already exists"),
        CartsServiceError::InvalidReference
        | CartsServiceError::MissingRequiredData
        | CartsServiceError::InvalidData => {
            StatusError::bad_request().brief("Invalid cart payload")
        }
        CartsServiceError::Sql(source) => {
            error!("cart storage error: {source}");

            StatusError::internal_server_error()
        }
    }
}

pub(crate) fn checkout_status_error(error: CheckoutError) -> StatusError {
    match error {
        error @ CheckoutError::InsufficientStock { .. } => {
            StatusError::conflict().brief(error.to_string())
        }
        error @ (CheckoutError::EmptyCart | CheckoutError::CouponUsageLimitReached) => {
            StatusError::unprocessable_entity().brief(error.to_string())
        }
        CheckoutError::ProductNotFound => {
            StatusError::unprocessable_entity().brief("A product in the cart no longer exists")
        }
        CheckoutError::NotFound => StatusError::not_found().brief("Order not found"),
        CheckoutError::Sql(source) => {
            error!("checkout storage error: {source}");

            StatusError::internal_server_error()
        }
        error => {
            error!("checkout failed: {error}");

            StatusError::internal_server_error()
        }
    }
}
