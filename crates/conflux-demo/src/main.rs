#![doc = include_str!("../README.md")]

mod demo;

use clap::Parser;
use conflux::CancelToken;
use demo::config::{CliArgs, DemoConfig};
use demo::telemetry::init_telemetry;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = DemoConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let token = CancelToken::new().with_timeout(config.timeout);
    tokio::spawn(shutdown_signal(token.clone()));

    demo::run(&config, &token).await?;

    tracing::info!("Demo finished");
    Ok(())
}

fn log_startup_info(config: &DemoConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting conflux demo with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting conflux demo ({:?}) with {} workers",
            config.pattern,
            config.workers
        );
    }
}

/// Cancels `token` on Ctrl+C or SIGTERM.
async fn shutdown_signal(token: CancelToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
        () = token.cancelled() => return,
    }

    tracing::info!("Shutdown signal received, cancelling demo...");
    token.cancel();
}
