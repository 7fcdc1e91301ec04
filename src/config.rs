use crate::events::TRANSFER_EVENT_SIGNATURE;
use crate::source::DEFAULT_LOOKBACK_BLOCKS;
use alloy_primitives::{Address, address};
use anyhow::{Context, Result, bail};
use std::str::FromStr;

pub const USDT_CONTRACT_ADDRESS: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Live,
    Historical,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node_url: String,
    pub token_address: Address,
    pub event_signature: String,
    pub lookback_blocks: u64,
    pub max_reconnects: usize,
}

impl Config {
    pub fn from_env(mode: Mode) -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(mode, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(mode: Mode, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let node_url = match (var("NODE_URL"), var("INFURA_PROJECT_ID")) {
            (Some(url), _) if !url.is_empty() => url,
            (_, Some(project_id)) if !project_id.is_empty() => infura_url(mode, &project_id),
            _ => bail!("Please set NODE_URL or INFURA_PROJECT_ID in .env"),
        };

        let token_address = match var("TOKEN_CONTRACT_ADDRESS") {
            Some(raw) => parse_address(&raw).context("Invalid TOKEN_CONTRACT_ADDRESS format")?,
            None => USDT_CONTRACT_ADDRESS,
        };

        let event_signature =
            var("TRANSFER_EVENT_SIGNATURE").unwrap_or_else(|| TRANSFER_EVENT_SIGNATURE.to_string());

        let lookback_blocks = match var("LOOKBACK_BLOCKS") {
            Some(raw) => raw.parse().context("LOOKBACK_BLOCKS must be a block count")?,
            None => DEFAULT_LOOKBACK_BLOCKS,
        };
        if lookback_blocks == 0 {
            bail!("LOOKBACK_BLOCKS must be at least 1");
        }

        let max_reconnects = match var("MAX_RECONNECTS") {
            Some(raw) => raw.parse().context("MAX_RECONNECTS must be a number")?,
            None => 5,
        };

        Ok(Config {
            node_url,
            token_address,
            event_signature,
            lookback_blocks,
            max_reconnects,
        })
    }
}

pub fn parse_address(raw: &str) -> Result<Address> {
    Address::from_str(raw.trim()).map_err(|_| anyhow::anyhow!("Invalid address format: {}", raw))
}

fn infura_url(mode: Mode, project_id: &str) -> String {
    match mode {
        Mode::Live => format!("wss://mainnet.infura.io/ws/v3/{project_id}"),
        Mode::Historical => format!("https://mainnet.infura.io/v3/{project_id}"),
    }
}
