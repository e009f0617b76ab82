//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    database::{self, Db, PoolSettings},
    domain::{
        carts::{CartsService, PgCartsService},
        orders::{CheckoutService, PgCheckoutService},
    },
    events::EventSink,
    payments::{OfflinePaymentGateway, PaymentGateway},
    settings::CheckoutSettings,
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),
}

#[derive(Clone)]
pub struct AppContext {
    pub carts: Arc<dyn CartsService>,
    pub checkout: Arc<dyn CheckoutService>,
    pub payments: Arc<dyn PaymentGateway>,
}

impl AppContext {
    /// Build application context from a database URL.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection fails.
    pub async fn from_database_url(
        url: &str,
        pool: PoolSettings,
        settings: CheckoutSettings,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, AppInitError> {
        let pool = database::connect(url, pool)
            .await
            .map_err(AppInitError::Database)?;

        Ok(Self::from_db(Db::new(pool), settings, events))
    }

    #[must_use]
    pub fn from_db(db: Db, settings: CheckoutSettings, events: Arc<dyn EventSink>) -> Self {
        let checkout: Arc<dyn CheckoutService> = Arc::new(PgCheckoutService::new(
            db.clone(),
            &settings,
            events.clone(),
        ));

        Self {
            carts: Arc::new(PgCartsService::new(db, settings, events, checkout.clone())),
            checkout,
            payments: Arc::new(OfflinePaymentGateway),
        }
    }
}
