//! Storefront JSON API Server

use std::{fmt::Display, process, sync::Arc};

use salvo::prelude::*;
use tracing::{error, info};

use storefront_app::context::AppContext;

use crate::{
    config::ServerConfig, events::MeteredEventSink, observability::Observability, state::State,
};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod actors;
mod carts;
mod config;
mod events;
mod extensions;
mod healthcheck;
mod observability;
mod router;
mod shutdown;
mod state;
#[cfg(test)]
mod test_helpers;

/// Startup failures before logging exists go straight to stderr.
fn exit_before_logging(context: &str, error: impl Display) -> ! {
    #[expect(
        clippy::print_stderr,
        reason = "the tracing subscriber is not installed yet"
    )]
    {
        eprintln!("{context}: {error}");
    }

    #[expect(clippy::exit, reason = "startup failures are fatal")]
    process::exit(1);
}

/// Storefront JSON API Server entry point
#[tokio::main]
pub async fn main() {
    let config = ServerConfig::load()
        .unwrap_or_else(|error| exit_before_logging("Configuration error", error));

    let observability = Observability::init(&config)
        .unwrap_or_else(|error| exit_before_logging("Observability error", error));

    let app = match AppContext::from_database_url(
        &config.database.database_url,
        config.database.pool_settings(),
        config.checkout.settings(),
        Arc::new(MeteredEventSink::default()),
    )
    .await
    {
        Ok(app) => app,
        Err(init_error) => {
            error!("failed to initialize app context: {init_error}");

            observability.shutdown();

            #[expect(clippy::exit, reason = "the server cannot run without a database")]
            process::exit(1);
        }
    };

    let addr = config.socket_addr();
    let listener = TcpListener::new(addr).bind().await;

    info!(%addr, "listening");

    let server = Server::new(listener);
    let handle = server.handle();
    let grace = config.server.shutdown_grace();

    tokio::spawn(async move {
        if let Err(error) = shutdown::listen(handle, grace).await {
            error!("failed to listen for shutdown signal: {error}");
        }
    });

    server
        .serve(router::with_docs(router::app_router(State::shared(app))))
        .await;

    info!("server stopped");

    observability.shutdown();
}
