//! Startup shared by the `watch` and `backfill` binaries.

use crate::config::Config;
use crate::decoder::TransferDecoder;
use crate::error::MonitorError;
use crate::filter::EventFilter;
use crate::metadata::{TokenMetadata, fetch_token_metadata};
use crate::monitor::{CancelHandle, CancelSignal, cancel_pair};
use crate::rpc::{RpcClient, redact};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub struct Pipeline {
    pub client: Arc<RpcClient>,
    pub metadata: TokenMetadata,
    pub filter: EventFilter,
    pub decoder: TransferDecoder,
}

/// Logs go to stderr so stdout only carries transfer records.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Connects, resolves token decimals and builds the filter. Any failure here is fatal.
pub async fn prepare(config: &Config) -> Result<Pipeline, MonitorError> {
    info!("Contract address: {:?}", config.token_address);

    let client = RpcClient::connect(&config.node_url)
        .await
        .map_err(|source| MonitorError::ConnectionFailure {
            url: redact(&config.node_url),
            source,
        })?;
    let client = Arc::new(client);

    let metadata = fetch_token_metadata(client.as_ref(), config.token_address).await?;
    let decoder = TransferDecoder::new(metadata.decimals.scale_factor());
    let filter = EventFilter::for_signature(config.token_address, &config.event_signature);
    info!(
        "Watching {} events, topic {:?}",
        config.event_signature, filter.topic0
    );

    Ok(Pipeline {
        client,
        metadata,
        filter,
        decoder,
    })
}

/// Cancels on Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancelSignal {
    let (handle, signal) = cancel_pair();
    tokio::spawn(wait_for_ctrl_c(handle));
    signal
}

async fn wait_for_ctrl_c(handle: CancelHandle) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl-C, shutting down");
            handle.cancel();
        }
        Err(e) => {
            warn!("Cannot listen for Ctrl-C: {}", e);
            // Keep the handle alive so the signal stays pending.
            std::future::pending::<()>().await;
        }
    }
}
