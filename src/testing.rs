//! In-memory chain client for unit tests.

use crate::error::RpcError;
use crate::filter::EventFilter;
use crate::models::RawLogEntry;
use crate::rpc::{ChainClient, EntryStream};
use alloy_primitives::{Address, B256, Bytes, U256, address, b256};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::Mutex;

pub const USDT: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");
pub const TRANSFER_TOPIC: B256 =
    b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");

pub fn transfer_entry(block: u64, from: Address, to: Address, raw_amount: u64) -> RawLogEntry {
    RawLogEntry {
        address: USDT,
        topics: vec![TRANSFER_TOPIC, from.into_word(), to.into_word()],
        data: Bytes::from(U256::from(raw_amount).to_be_bytes::<32>().to_vec()),
        block_number: Some(block),
        transaction_hash: Some(B256::with_last_byte(block as u8)),
        log_index: Some(0),
        removed: false,
    }
}

/// One scripted subscription: the items it delivers before closing.
pub type Script = Result<Vec<Result<RawLogEntry, RpcError>>, RpcError>;

#[derive(Default)]
pub struct MockChain {
    pub latest: Option<u64>,
    pub logs: Option<Vec<RawLogEntry>>,
    pub subscriptions: Mutex<VecDeque<Script>>,
    pub queried: Mutex<Vec<EventFilter>>,
    pub subscribe_calls: Mutex<usize>,
}

impl MockChain {
    pub fn with_head(latest: u64, logs: Vec<RawLogEntry>) -> Self {
        MockChain {
            latest: Some(latest),
            logs: Some(logs),
            ..Default::default()
        }
    }

    pub fn with_subscriptions(scripts: Vec<Script>) -> Self {
        MockChain {
            subscriptions: Mutex::new(scripts.into()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn latest_block(&self) -> Result<u64, RpcError> {
        self.latest
            .ok_or_else(|| RpcError::Transport("connection refused".into()))
    }

    async fn call(&self, _to: Address, _input: Bytes) -> Result<Bytes, RpcError> {
        Err(RpcError::Transport("execution reverted".into()))
    }

    async fn get_logs(&self, filter: &EventFilter) -> Result<Vec<RawLogEntry>, RpcError> {
        self.queried.lock().unwrap().push(filter.clone());
        self.logs
            .clone()
            .ok_or_else(|| RpcError::Transport("query returned more than 10000 results".into()))
    }

    async fn subscribe_logs(&self, _filter: &EventFilter) -> Result<EntryStream, RpcError> {
        *self.subscribe_calls.lock().unwrap() += 1;
        match self.subscriptions.lock().unwrap().pop_front() {
            Some(Ok(items)) => Ok(stream::iter(items).boxed()),
            Some(Err(e)) => Err(e),
            None => Err(RpcError::Transport("connection refused".into())),
        }
    }
}
