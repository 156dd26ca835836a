//! panelhook - webhook fan-out for stored mail
//!
//! Runs the host bridge and dispatches "message stored" signals to the
//! configured panels until interrupted.

use anyhow::Result;
use clap::Parser;
use panelhook::{app::App, cli::Cli, config::Config, metrics::LoggingRecorder};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        tracing_subscriber::fmt().init();
        error!("Failed to load configuration: {}", err);
        std::process::exit(1);
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("panelhook starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Listen Address: {}", config.listen_addr);
    info!("Panels File: {}", config.panels_path.display());
    info!("Attempt Timeout: {}ms", config.delivery.attempt_timeout_ms);
    info!("Retry Backoff: {}ms", config.delivery.backoff_ms);
    info!("Disabled Panel Policy: {:?}", config.delivery.on_disabled_panel);
    info!("-------------------------------------------------------");

    // A panel file that exists but cannot be read is fatal.
    let app = match App::from_config(&config).await {
        Ok(app) => app,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    if config.metrics.log_metrics {
        info!(
            "Logging recorder enabled. Metrics will be printed every {} seconds.",
            config.metrics.log_aggregation_seconds
        );
        let recorder = LoggingRecorder::new();
        let reporter = recorder.clone();
        if metrics::set_global_recorder(recorder).is_err() {
            warn!("A metrics recorder is already installed, delivery counters go there");
        } else {
            let tasks = &app.state().tasks;
            tasks.spawn(
                "metrics-reporter",
                reporter.report(
                    Duration::from_secs(config.metrics.log_aggregation_seconds.max(1)),
                    tasks.get_shutdown_rx(),
                ),
            );
        }
    }

    let listener = TcpListener::bind(&config.listen_addr).await?;

    app.run(listener, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
        }
    })
    .await
}
