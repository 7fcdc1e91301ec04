//! Raw `Transfer` log entries to [`TransferRecord`]s.
//!
//! The layout is fixed by the Solidity ABI for
//! `Transfer(address indexed from, address indexed to, uint256 value)`:
//! `topics[1]` and `topics[2]` hold the addresses left-padded to 32 bytes,
//! `data` holds the big-endian value and nothing else.

use crate::error::DecodeError;
use crate::models::{RawLogEntry, TransferKind, TransferRecord};
use alloy_primitives::{Address, U256};

/// Number of decimal places a token declares.
///
/// Any value is accepted; from 78 upwards `10^decimals` no longer fits in
/// 256 bits and the scale factor truncates everything to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalsConfig(pub u64);

impl DecimalsConfig {
    pub fn scale_factor(self) -> ScaleFactor {
        ScaleFactor::from_decimals(self)
    }
}

/// Divisor turning raw on-chain amounts into whole token units.
///
/// `None` means `10^decimals` does not fit in 256 bits, so every uint256
/// amount truncates to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleFactor(Option<U256>);

impl ScaleFactor {
    pub const ONE: ScaleFactor = ScaleFactor(Some(U256::from_limbs([1, 0, 0, 0])));

    pub fn from_decimals(decimals: DecimalsConfig) -> Self {
        ScaleFactor(U256::from(10u64).checked_pow(U256::from(decimals.0)))
    }

    /// A divisor of zero is treated as one.
    pub fn new(divisor: U256) -> Self {
        if divisor.is_zero() {
            Self::ONE
        } else {
            ScaleFactor(Some(divisor))
        }
    }

    pub fn divisor(&self) -> Option<U256> {
        self.0
    }

    /// Floor division; the sub-unit remainder is dropped.
    pub fn scale(&self, raw: U256) -> U256 {
        match self.0 {
            Some(divisor) if divisor.is_zero() => raw,
            Some(divisor) => raw / divisor,
            None => U256::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransferDecoder {
    scale: ScaleFactor,
}

impl TransferDecoder {
    pub fn new(scale: ScaleFactor) -> Self {
        TransferDecoder { scale }
    }

    pub fn scale_factor(&self) -> ScaleFactor {
        self.scale
    }

    pub fn decode(&self, entry: &RawLogEntry) -> Result<TransferRecord, DecodeError> {
        decode(entry, self.scale)
    }
}

pub fn decode(entry: &RawLogEntry, scale: ScaleFactor) -> Result<TransferRecord, DecodeError> {
    if entry.topics.len() < 3 {
        return Err(DecodeError::MissingTopics {
            found: entry.topics.len(),
        });
    }

    let from = Address::from_word(entry.topics[1]);
    let to = Address::from_word(entry.topics[2]);
    let raw_amount = parse_amount(&entry.data)?;
    let block_number = entry.block_number.ok_or(DecodeError::MissingBlockNumber)?;

    Ok(TransferRecord {
        block_number,
        kind: TransferKind::classify(&from),
        from,
        to,
        amount: scale.scale(raw_amount),
        raw_amount,
        transaction_hash: entry.transaction_hash,
        log_index: entry.log_index,
    })
}

fn parse_amount(data: &[u8]) -> Result<U256, DecodeError> {
    if data.is_empty() {
        return Err(DecodeError::EmptyData);
    }
    U256::try_from_be_slice(data).ok_or(DecodeError::DataTooWide { len: data.len() })
}
