use tree_hash::TreeHash;
use types::{AttestationData, Hash256, Shard, Slot};

/// Keys the pool's attestation map: attestations with the same id describe
/// the same vote and are candidates for aggregation.
#[derive(PartialEq, Eq, Clone, Hash, Debug)]
pub struct AttestationId {
    slot: Slot,
    shard: Shard,
    data_root: Hash256,
}

impl AttestationId {
    pub fn from_data(data: &AttestationData) -> Self {
        AttestationId {
            slot: data.slot,
            shard: data.shard,
            data_root: Hash256::from_slice(&data.tree_hash_root()[..]),
        }
    }
}
