use crate::error::RpcError;
use crate::filter::EventFilter;
use crate::models::RawLogEntry;
use alloy::network::TransactionBuilder;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::future::{Future, IntoFuture};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120); // 2 minutes timeout per request

pub type EntryStream = BoxStream<'static, Result<RawLogEntry, RpcError>>;

/// What the monitor needs from a chain node.
#[async_trait]
pub trait ChainClient: Send + Sync + 'static {
    async fn latest_block(&self) -> Result<u64, RpcError>;

    /// `eth_call` against `to` with ABI-encoded `input`, at the latest block.
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, RpcError>;

    async fn get_logs(&self, filter: &EventFilter) -> Result<Vec<RawLogEntry>, RpcError>;

    async fn subscribe_logs(&self, filter: &EventFilter) -> Result<EntryStream, RpcError>;
}

/// Chain client over a single alloy provider. The URL scheme picks the
/// transport: `ws`/`wss` for subscriptions, `http`/`https` for queries.
#[derive(Clone)]
pub struct RpcClient {
    provider: DynProvider,
    url: String,
}

impl RpcClient {
    pub async fn connect(url: &str) -> Result<Self, RpcError> {
        if !url.contains("://") {
            return Err(RpcError::InvalidUrl(url.to_string()));
        }

        let provider = ProviderBuilder::new()
            .connect(url)
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?
            .erased();

        info!("Connected to {}", redact(url));
        Ok(RpcClient {
            provider,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

async fn with_timeout<T, E, F>(future: F) -> Result<T, RpcError>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match timeout(REQUEST_TIMEOUT, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(RpcError::Transport(e.to_string())),
        Err(_) => Err(RpcError::Timeout(REQUEST_TIMEOUT)),
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn latest_block(&self) -> Result<u64, RpcError> {
        with_timeout(self.provider.get_block_number()).await
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, RpcError> {
        let tx = TransactionRequest::default().with_to(to).with_input(input);
        with_timeout(self.provider.call(tx).into_future()).await
    }

    async fn get_logs(&self, filter: &EventFilter) -> Result<Vec<RawLogEntry>, RpcError> {
        let logs = with_timeout(self.provider.get_logs(&filter.to_rpc_filter())).await?;
        debug!("Node returned {} logs", logs.len());
        Ok(logs.into_iter().map(RawLogEntry::from).collect())
    }

    async fn subscribe_logs(&self, filter: &EventFilter) -> Result<EntryStream, RpcError> {
        let subscription = with_timeout(
            self.provider
                .subscribe_logs(&filter.to_rpc_filter())
                .into_future(),
        )
        .await?;
        debug!("Log subscription established");

        Ok(subscription
            .into_stream()
            .map(|log| Ok(RawLogEntry::from(log)))
            .boxed())
    }
}

/// Hides API keys embedded in the path of provider URLs.
pub(crate) fn redact(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) => {
            let host = rest.split('/').next().unwrap_or(rest);
            format!("{scheme}://{host}/...")
        }
        None => url.to_string(),
    }
}
