//! Plotter host binary: loads configuration, connects to the EBB, and
//! serves the HTTP/WebSocket control surface.

use clap::Parser;
use serial2_tokio::SerialPort;
use tokio::signal;

use ebb_plotter::config::Config;
use ebb_plotter::ebb::{detect_port, reconnect_with_backoff, EbbDriver};
use ebb_plotter::supervisor::PlotSupervisor;
use ebb_plotter::web;

#[derive(Parser, Debug)]
#[command(name = "plotter-host", version, about = "AxiDraw/EBB pen-plotter host")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(default_value = "plotter.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let args = Args::parse();
    tracing::info!(config = %args.config, "loading configuration");
    let config = Config::load(&args.config)?;

    let port_path = match &config.serial.port {
        Some(path) => path.clone(),
        None => {
            tracing::info!("no serial port configured, auto-detecting EBB");
            detect_port().await?
        }
    };
    tracing::info!(port = %port_path, "connecting to EBB");
    // Waits with exponential backoff rather than failing outright, so the
    // service comes up cleanly even if the plotter is plugged in a moment
    // after this process starts.
    let port: SerialPort = reconnect_with_backoff(&port_path).await;

    let mut driver = EbbDriver::new(port);
    let version = driver.handshake().await?;
    tracing::info!(?version, "EBB connected");

    let reconnect_path = port_path.clone();
    let supervisor = PlotSupervisor::new(driver, config.device(), config.tooling_profile())
        .with_reconnect(move || {
            let path = reconnect_path.clone();
            async move { reconnect_with_backoff(&path).await }
        });
    let shutdown_supervisor = supervisor.clone();
    let router = web::create_router(supervisor);

    let bind_addr = config.bind_addr()?;
    tracing::info!(addr = %bind_addr, "starting HTTP server");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    // Cancel any in-progress plot (the supervisor raises the pen and homes
    // the carriage as part of its normal post-cancel path) and, either
    // way, make sure the motors end up disabled before the process exits.
    tracing::info!("shutting down: cancelling any in-progress plot and disabling motors");
    shutdown_supervisor.shutdown().await;

    tracing::info!("plotter host shut down");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => tracing::warn!(error = %e, "failed to listen for shutdown signal"),
    }
}
