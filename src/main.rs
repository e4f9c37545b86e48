//! flowgate: HTTP ingress for flow pipelines.
//!
//! Runs the listener plus a demonstration echo pipeline: every admitted
//! request is ingested on a periodic tick and completed with status 200
//! and its own payload. Real deployments replace the echo loop with
//! their pipeline's ingest/completion scheduling.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flowgate::config::{load_config, IngressConfig};
use flowgate::pipeline::CompletionRequest;
use flowgate::{HttpIngress, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "flowgate", about = "HTTP ingress for flow pipelines")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => IngressConfig::default(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "flowgate={},tower_http=warn",
                    config.observability.log_level
                ))
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("flowgate v0.1.0 starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => flowgate::observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let ingress = HttpIngress::new(config)?;
    let addr = ingress.start(&shutdown).await?;
    tracing::info!(address = %addr, "Accepting requests");

    // Demonstration pipeline: ingest on a tick, complete immediately by
    // echoing the payload back.
    let ingest = ingress.ingest_stage();
    let completion = ingress.completion_stage();
    let mut rx = shutdown.subscribe();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_millis(50));
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    match ingest.run_once().await {
                        Ok(Some(unit)) => {
                            let Some(id) = unit.context_id() else {
                                continue;
                            };
                            let request = CompletionRequest {
                                context_id: id,
                                status: 200,
                                headers: Vec::new(),
                                body: Some(unit.payload().clone()),
                            };
                            if let Err(e) = completion.run_once(request) {
                                tracing::error!(error = %e, "Echo completion failed");
                            }
                        }
                        Ok(None) => {}
                        Err(e) => tracing::error!(error = %e, "Ingest failed"),
                    }
                }
                _ = rx.recv() => break,
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    shutdown.trigger();
    // Give the listener a moment to drain.
    tokio::time::sleep(Duration::from_millis(200)).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
