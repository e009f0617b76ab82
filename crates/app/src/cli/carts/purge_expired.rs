use std::sync::Arc;

use clap::Args;
use storefront_app::{
    context::AppContext, database::PoolSettings, events::TracingEventSink,
    settings::CheckoutSettings,
};

#[derive(Debug, Args)]
pub(crate) struct PurgeExpiredArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Carts deleted per transaction
    #[arg(long, default_value_t = 500)]
    batch_size: u32,
}

pub(crate) async fn run(args: PurgeExpiredArgs) -> Result<(), String> {
    let context = AppContext::from_database_url(
        &args.database_url,
        PoolSettings {
            max_connections: 2,
            ..PoolSettings::default()
        },
        CheckoutSettings::default(),
        Arc::new(TracingEventSink),
    )
    .await
    .map_err(|error| format!("failed to initialise: {error}"))?;

    let purged = context
        .carts
        .purge_expired(args.batch_size)
        .await
        .map_err(|error| format!("failed to purge expired carts: {error}"))?;

    println!("purged: {purged}");

    Ok(())
}
