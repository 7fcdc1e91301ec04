use crate::decoder::DecimalsConfig;
use crate::error::MonitorError;
use crate::events::IERC20Metadata::{decimalsCall, symbolCall};
use crate::rpc::ChainClient;
use alloy::sol_types::SolCall;
use alloy_primitives::Address;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub decimals: DecimalsConfig,
    pub symbol: Option<String>,
}

/// Reads `decimals()` (required) and `symbol()` (best effort) from the token.
pub async fn fetch_token_metadata<C>(
    client: &C,
    address: Address,
) -> Result<TokenMetadata, MonitorError>
where
    C: ChainClient + ?Sized,
{
    info!("Fetching token metadata for {:?}", address);

    let decimals = resolve_decimals(client, address).await?;
    info!("Token decimals: {}", decimals.0);

    let symbol = match resolve_symbol(client, address).await {
        Ok(symbol) => {
            info!("Token symbol: {}", symbol);
            Some(symbol)
        }
        Err(e) => {
            warn!("Failed to fetch token symbol: {}", e);
            None
        }
    };

    Ok(TokenMetadata { decimals, symbol })
}

pub async fn resolve_decimals<C>(
    client: &C,
    address: Address,
) -> Result<DecimalsConfig, MonitorError>
where
    C: ChainClient + ?Sized,
{
    let output = client
        .call(address, decimalsCall {}.abi_encode().into())
        .await
        .map_err(|e| {
            MonitorError::MetadataUnavailable(format!("decimals() call on {address} failed: {e}"))
        })?;

    let value = decimalsCall::abi_decode_returns(&output).map_err(|e| {
        MonitorError::MetadataUnavailable(format!(
            "decimals() on {address} returned {} undecodable bytes: {e}",
            output.len()
        ))
    })?;

    // Past u64 the scale factor is already zero, so saturating changes nothing.
    let decimals = u64::try_from(value).unwrap_or_else(|_| {
        warn!("decimals() on {} returned {}, amounts will scale to 0", address, value);
        u64::MAX
    });

    Ok(DecimalsConfig(decimals))
}

async fn resolve_symbol<C>(client: &C, address: Address) -> anyhow::Result<String>
where
    C: ChainClient + ?Sized,
{
    let output = client.call(address, symbolCall {}.abi_encode().into()).await?;
    Ok(symbolCall::abi_decode_returns(&output)?)
}
