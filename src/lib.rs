// Module declarations for the application's core components
pub mod channels;       // Inter-component communication channels
pub mod config;         // Configuration management
pub mod coordinator;    // Poll loop driving the converter
pub mod datalog_writer; // Data logging functionality
pub mod error;          // Error handling and types
pub mod options;        // Command line options parsing
pub mod prelude;        // Common imports and types
pub mod publisher;      // Prometheus textfile output
pub mod utils;          // Utility functions
pub mod vebus;          // MK3 / VE.Bus protocol implementation

// Get the package version from Cargo.toml
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;

use crate::coordinator::Coordinator;
use crate::datalog_writer::DatalogWriter;
use crate::publisher::Publisher;
use crate::vebus::session::Session;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Main application entry point. Wires the components together and runs
/// until the coordinator finishes or a shutdown signal arrives.
pub async fn app(mut shutdown_rx: broadcast::Receiver<()>, options: Options) -> Result<()> {
    let config = ConfigWrapper::new(options.config_file).unwrap_or_else(|err| {
        eprintln!("Failed to load config: {:?}", err);
        std::process::exit(255);
    });

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.loglevel()))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .init();

    info!("vebus-bridge {} starting", CARGO_PKG_VERSION);
    config.summary();

    let channels = Channels::new();
    let stats = Arc::new(Mutex::new(PollStats::default()));

    info!("  Creating Publisher...");
    let publisher = Publisher::new(config.clone(), channels.clone(), stats.clone());
    let publisher_clone = publisher.clone();
    let publisher_handle = tokio::spawn(async move {
        if let Err(e) = publisher_clone.start().await {
            error!("Publisher task failed: {}", e);
        }
    });

    let datalog_writer = match config.datalog_file() {
        Some(path) => {
            info!("  Creating DatalogWriter...");
            Some(DatalogWriter::new(&path, stats.clone())?)
        }
        None => None,
    };

    info!("  Opening serial port...");
    let serial = config.serial();
    let session = Session::open(
        serial.device(),
        serial.baud(),
        Duration::from_millis(serial.read_timeout_ms()),
        stats.clone(),
    )?;

    info!("  Creating Coordinator...");
    let mut coordinator = Coordinator::new(
        config.clone(),
        channels.clone(),
        session,
        datalog_writer,
        stats.clone(),
    );
    let mut coordinator_handle = tokio::spawn(async move { coordinator.start().await });

    let result = tokio::select! {
        res = &mut coordinator_handle => res?,
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received, stopping components...");
            let _ = channels.to_coordinator.send(coordinator::ChannelData::Shutdown);
            coordinator_handle.await?
        }
    };

    publisher.stop();
    let _ = publisher_handle.await;

    info!("Application shutdown complete");

    result
}
