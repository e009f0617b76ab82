//! App Router

use std::sync::Arc;

use salvo::{
    affix_state::inject,
    oapi::{OpenApi, swagger_ui::SwaggerUi},
    prelude::*,
    trailing_slash::remove_slash,
};

use crate::{
    actors, carts, healthcheck,
    observability::{metrics_handler, request_logging},
    state::State,
};

pub(crate) fn app_router(state: Arc<State>) -> Router {
    Router::new()
        .hoop(CatchPanic::new())
        .hoop(remove_slash())
        .hoop(request_logging)
        .hoop(inject(state))
        .push(Router::with_path("healthcheck").get(healthcheck::handler))
        .push(Router::with_path("metrics").get(metrics_handler))
        .push(cart_router())
}

fn cart_router() -> Router {
    Router::with_path("cart")
        .hoop(actors::middleware::handler)
        .get(carts::get::handler)
        .delete(carts::clear::handler)
        .push(
            Router::with_path("items")
                .post(carts::items::create::handler)
                .push(
                    Router::with_path("{item}")
                        .put(carts::items::update::handler)
                        .delete(carts::items::delete::handler),
                ),
        )
        .push(
            Router::with_path("coupon")
                .put(carts::coupon::apply::handler)
                .delete(carts::coupon::remove::handler),
        )
        .push(Router::with_path("checkout").post(carts::checkout::handler))
        .push(Router::with_path("migrate").post(carts::migrate::handler))
}

/// Adds the OpenAPI document and Swagger UI for every documented route.
pub(crate) fn with_docs(router: Router) -> Router {
    let doc = OpenApi::new("Storefront API", env!("CARGO_PKG_VERSION")).merge_router(&router);

    router
        .push(doc.into_router("/api-doc/openapi.json"))
        .push(SwaggerUi::new("/api-doc/openapi.json").into_router("docs"))
}
