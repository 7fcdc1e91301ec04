use crate::events::event_topic;
use alloy::rpc::types::Filter;
use alloy_primitives::{Address, B256};

/// Which logs to watch: one contract, one event, optionally one block range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    pub address: Address,
    pub topic0: B256,
    pub block_range: Option<(u64, u64)>,
}

impl EventFilter {
    pub fn new(address: Address, topic0: B256) -> Self {
        EventFilter {
            address,
            topic0,
            block_range: None,
        }
    }

    pub fn for_signature(address: Address, signature: &str) -> Self {
        Self::new(address, event_topic(signature))
    }

    pub fn with_range(&self, from_block: u64, to_block: u64) -> Self {
        EventFilter {
            block_range: Some((from_block, to_block)),
            ..self.clone()
        }
    }

    pub fn to_rpc_filter(&self) -> Filter {
        let filter = Filter::new()
            .address(self.address)
            .event_signature(self.topic0);

        match self.block_range {
            Some((from_block, to_block)) => filter.from_block(from_block).to_block(to_block),
            None => filter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TRANSFER_EVENT_SIGNATURE;
    use alloy_primitives::address;

    const USDT: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");

    #[test]
    fn open_ended_filter_has_no_range() {
        let filter = EventFilter::for_signature(USDT, TRANSFER_EVENT_SIGNATURE);
        assert_eq!(filter.block_range, None);

        let rpc = filter.to_rpc_filter();
        assert_eq!(rpc.get_from_block(), None);
        assert_eq!(rpc.get_to_block(), None);
    }

    #[test]
    fn ranged_filter_keeps_address_and_topic() {
        let filter = EventFilter::for_signature(USDT, TRANSFER_EVENT_SIGNATURE);
        let ranged = filter.with_range(10, 20);

        assert_eq!(ranged.address, USDT);
        assert_eq!(ranged.topic0, filter.topic0);
        assert_eq!(ranged.block_range, Some((10, 20)));

        let rpc = ranged.to_rpc_filter();
        assert_eq!(rpc.get_from_block(), Some(10));
        assert_eq!(rpc.get_to_block(), Some(20));
    }
}
