use log::error;
use std::error::Error;
use tokio::sync::broadcast;

use vebus_bridge::options::Options;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let options = Options::new();
    let runtime = options.runtime;

    // Create a channel for shutdown signaling
    let (shutdown_tx, _) = broadcast::channel(1);

    // Handle Ctrl+C
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        if let Err(e) = shutdown_tx_clone.send(()) {
            error!("Failed to send shutdown signal: {}", e);
        }
    });

    // Optional runtime limit, mostly useful for soak testing
    if let Some(secs) = runtime {
        let shutdown_tx_clone = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
            let _ = shutdown_tx_clone.send(());
        });
    }

    vebus_bridge::app(shutdown_tx.subscribe(), options).await?;

    Ok(())
}
