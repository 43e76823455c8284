use axum::{response::IntoResponse, routing::get, Router};
use clap::Parser;
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use cpuprobe::{CycleCounter, PlatformMetricExporter, PlatformReport, ProbeConfig, Result};

#[derive(Parser, Debug)]
#[command(name = "cpuprobe")]
#[command(about = "Report CPU features, vendor, cycle counter and topology")]
struct Args {
    #[arg(long, help = "Print the report as JSON")]
    json: bool,

    #[arg(long, help = "Calibrate the cycle counter frequency before reporting")]
    calibrate: bool,

    #[arg(
        long,
        default_value_t = 100,
        help = "Calibration window in milliseconds"
    )]
    calibration_ms: u64,

    #[arg(long, help = "Pin the calibrating thread to this CPU")]
    pin_cpu: Option<i32>,

    #[arg(
        long,
        help = "Serve Prometheus metrics on this address (e.g. 0.0.0.0:8080) instead of printing"
    )]
    listen: Option<SocketAddr>,

    #[arg(short, long, help = "Enable verbose logging")]
    verbose: bool,
}

impl Args {
    fn to_config(&self) -> ProbeConfig {
        ProbeConfig {
            calibrate: self.calibrate,
            calibration_window: Duration::from_millis(self.calibration_ms),
            pin_cpu: self.pin_cpu,
            listen: self.listen,
        }
    }
}

async fn metrics_handler(
    axum::extract::State(exporter): axum::extract::State<Arc<PlatformMetricExporter>>,
) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    exporter.refresh();
    cpuprobe::gather_metrics!(buffer, encoder, exporter, "platform");

    let content_type = encoder.format_type().to_string();
    (
        [("Content-Type", content_type)],
        String::from_utf8(buffer).unwrap_or_default(),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::warn!("Shutdown triggered by Ctrl+C");
        },
        _ = terminate => {
            tracing::warn!("Shutdown triggered by SIGTERM");
        },
    }
}

async fn serve(addr: SocketAddr) -> Result<()> {
    let exporter = Arc::new(PlatformMetricExporter::new()?);

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(exporter);

    tracing::warn!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG overrides the verbosity flag
    let log_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = args.to_config();
    config.validate()?;

    if config.calibrate {
        let window = config.calibration_window;
        let pin_cpu = config.pin_cpu;
        let calibration =
            tokio::task::spawn_blocking(move || CycleCounter::instance().calibrate(window, pin_cpu))
                .await
                .map_err(|e| cpuprobe::ProbeError::Calibration(e.to_string()))?;

        if let Err(e) = calibration {
            tracing::warn!("{}", e);
        }
    }

    if let Some(addr) = config.listen {
        return serve(addr).await;
    }

    let report = PlatformReport::collect();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }

    Ok(())
}
