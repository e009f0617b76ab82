//! Depot lookups that fail as HTTP errors.

use std::any::{Any, type_name};

use salvo::prelude::{Depot, StatusError};
use tracing::error;

use storefront_app::domain::actors::Actor;

pub(crate) trait DepotExt {
    /// Something a hoop should have injected. Its absence is a routing bug.
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, StatusError>;

    /// The actor resolved from the request headers.
    fn actor_or_401(&self) -> Result<&Actor, StatusError>;
}

impl DepotExt for Depot {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, StatusError> {
        self.obtain::<T>().map_err(|_ignored| {
            error!(missing = type_name::<T>(), "depot value was not injected");

            StatusError::internal_server_error()
        })
    }

    fn actor_or_401(&self) -> Result<&Actor, StatusError> {
        self.obtain::<Actor>()
            .map_err(|_ignored| StatusError::unauthorized().brief("Missing actor"))
    }
}
