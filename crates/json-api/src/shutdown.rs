//! Graceful shutdown on SIGINT or SIGTERM.

use std::{io, time::Duration};

use salvo::server::ServerHandle;
use tokio::signal;
use tracing::info;

/// Resolves with the name of the first shutdown signal received.
async fn wait_for_signal() -> io::Result<&'static str> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;

        tokio::select! {
            result = signal::ctrl_c() => result.map(|()| "SIGINT"),
            _ = terminate.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.map(|()| "ctrl-c")
    }
}

/// Stops accepting connections on the first signal and gives in-flight
/// requests `grace` to finish.
pub(crate) async fn listen(handle: ServerHandle, grace: Duration) -> io::Result<()> {
    let signal = wait_for_signal().await?;

    info!(
        signal,
        grace_seconds = grace.as_secs(),
        "shutdown signal received, draining requests"
    );

    handle.stop_graceful(Some(grace));

    Ok(())
}
