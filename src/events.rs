use alloy::sol;
use alloy_primitives::{B256, keccak256};

pub const TRANSFER_EVENT_SIGNATURE: &str = "Transfer(address,address,uint256)";

sol! {
    event Transfer(address indexed from, address indexed to, uint256 value);

    // USDT declares `decimals` as uint256; uint8 returns decode the same way.
    interface IERC20Metadata {
        function decimals() external view returns (uint256);
        function symbol() external view returns (string);
    }
}

/// Topic 0 for an event, the keccak-256 hash of its canonical signature.
pub fn event_topic(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}
