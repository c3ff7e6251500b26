use crate::Eth1Observer;
use parking_lot::RwLock;
use std::collections::HashMap;
use types::Hash256;

/// A scripted ETH1 observer for tests: block numbering and the chain-start
/// log are whatever the test says they are.
#[derive(Default)]
pub struct MockEth1Observer {
    chain_start: RwLock<Option<u64>>,
    latest_block_number: RwLock<Option<u64>>,
    hashes_by_number: RwLock<HashMap<u64, Hash256>>,
    deposit_root: RwLock<Hash256>,
}

impl MockEth1Observer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_chain_start(&self, genesis_time: u64) {
        *self.chain_start.write() = Some(genesis_time);
    }

    pub fn set_latest_block_number(&self, number: u64) {
        *self.latest_block_number.write() = Some(number);
    }

    pub fn set_block_hash(&self, number: u64, hash: Hash256) {
        self.hashes_by_number.write().insert(number, hash);
    }

    pub fn set_deposit_root(&self, root: Hash256) {
        *self.deposit_root.write() = root;
    }
}

impl Eth1Observer for MockEth1Observer {
    fn chain_start_log(&self) -> Option<u64> {
        *self.chain_start.read()
    }

    fn latest_block_number(&self) -> Option<u64> {
        *self.latest_block_number.read()
    }

    fn block_number_by_hash(&self, hash: &Hash256) -> Option<u64> {
        self.hashes_by_number
            .read()
            .iter()
            .find(|(_, h)| *h == hash)
            .map(|(number, _)| *number)
    }

    fn block_hash_by_number(&self, number: u64) -> Option<Hash256> {
        self.hashes_by_number.read().get(&number).cloned()
    }

    fn deposit_root(&self) -> Hash256 {
        *self.deposit_root.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_lookup_is_bidirectional() {
        let mock = MockEth1Observer::new();
        mock.set_block_hash(4, Hash256::from_low_u64_be(0xb2));

        assert_eq!(
            mock.block_hash_by_number(4),
            Some(Hash256::from_low_u64_be(0xb2))
        );
        assert_eq!(
            mock.block_number_by_hash(&Hash256::from_low_u64_be(0xb2)),
            Some(4)
        );
        assert_eq!(mock.block_hash_by_number(5), None);
    }
}
