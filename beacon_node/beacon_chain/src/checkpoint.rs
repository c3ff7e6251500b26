use types::{BeaconBlock, BeaconState, Hash256};

/// The block at the head of the chain paired with its post-state, as one
/// consistent snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckPoint {
    pub beacon_block: BeaconBlock,
    pub beacon_block_root: Hash256,
    pub beacon_state: BeaconState,
    pub beacon_state_root: Hash256,
}

impl CheckPoint {
    pub fn new(beacon_block: BeaconBlock, beacon_state: BeaconState) -> Self {
        Self {
            beacon_block_root: beacon_block.canonical_root(),
            beacon_state_root: beacon_state.canonical_root(),
            beacon_block,
            beacon_state,
        }
    }
}
