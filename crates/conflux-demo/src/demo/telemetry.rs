//! Console logging for the demo.
//!
//! Events are printed through `tracing_subscriber::fmt`, filtered by
//! `RUST_LOG` (default `info`). The library's own worker and stage lifecycle
//! events appear at `debug`/`trace`, e.g. `RUST_LOG=conflux=trace`.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339()),
        )
        .try_init()?;

    Ok(())
}
