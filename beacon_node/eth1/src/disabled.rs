use crate::Eth1Observer;
use types::Hash256;

/// The observer used when the node runs without an ETH1 endpoint: it has
/// seen nothing, so deposit- and ETH1-dependent RPCs answer `Unavailable`.
pub struct DisabledEth1Observer;

impl Eth1Observer for DisabledEth1Observer {
    fn chain_start_log(&self) -> Option<u64> {
        None
    }

    fn latest_block_number(&self) -> Option<u64> {
        None
    }

    fn block_number_by_hash(&self, _hash: &Hash256) -> Option<u64> {
        None
    }

    fn block_hash_by_number(&self, _number: u64) -> Option<Hash256> {
        None
    }

    fn deposit_root(&self) -> Hash256 {
        Hash256::zero()
    }
}
