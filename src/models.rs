use alloy::rpc::types::Log;
use alloy_primitives::{Address, B256, Bytes, U256};
use std::fmt;

/// A log entry as delivered by the node, before any decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<B256>,
    pub log_index: Option<u64>,
    /// Set by the node when the log was dropped by a reorg. Carried, not acted on.
    pub removed: bool,
}

impl From<Log> for RawLogEntry {
    fn from(log: Log) -> Self {
        RawLogEntry {
            address: log.address(),
            topics: log.topics().to_vec(),
            data: log.data().data.clone(),
            block_number: log.block_number,
            transaction_hash: log.transaction_hash,
            log_index: log.log_index,
            removed: log.removed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKind {
    Transfer,
    Mint,
}

impl TransferKind {
    pub fn classify(from: &Address) -> Self {
        if from.is_zero() {
            TransferKind::Mint
        } else {
            TransferKind::Transfer
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferKind::Transfer => "Transfer",
            TransferKind::Mint => "Mint",
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded token movement. `amount` is in whole token units, truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub block_number: u64,
    pub kind: TransferKind,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub raw_amount: U256,
    pub transaction_hash: Option<B256>,
    pub log_index: Option<u64>,
}
