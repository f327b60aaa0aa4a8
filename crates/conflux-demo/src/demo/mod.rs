//! Components of the `conflux-demo` binary.
//!
//! - [`config`] - CLI / environment configuration.
//! - [`patterns`] - one walkthrough per concurrency primitive.
//! - [`telemetry`] - console logging setup.

pub mod config;
pub mod patterns;
pub mod telemetry;

use config::{DemoConfig, Pattern};
use conflux::CancelToken;
use tracing::warn;

/// Runs every selected pattern in order, stopping early (without error) once
/// the token fires.
pub async fn run(config: &DemoConfig, token: &CancelToken) -> anyhow::Result<()> {
    let steps = [
        Pattern::Pool,
        Pattern::Pipeline,
        Pattern::Fan,
        Pattern::Rate,
        Pattern::Broadcast,
    ];

    for step in steps.into_iter().filter(|s| config.pattern.includes(*s)) {
        let result = match step {
            Pattern::Pool => patterns::worker_pool(config, token).await,
            Pattern::Pipeline => patterns::pipeline(config, token).await,
            Pattern::Fan => patterns::fan(config, token).await,
            Pattern::Rate => patterns::rate_limiter(config, token).await,
            Pattern::Broadcast => patterns::broadcast(config, token).await,
            Pattern::All => continue,
        };

        if let Err(e) = result {
            if e.downcast_ref::<conflux::Error>()
                .is_some_and(conflux::Error::is_cancellation)
            {
                warn!("Stopped during {step:?}: {e}");
                return Ok(());
            }
            return Err(e);
        }

        if token.is_cancelled() {
            warn!("Stopped after {step:?}");
            return Ok(());
        }
    }

    Ok(())
}
