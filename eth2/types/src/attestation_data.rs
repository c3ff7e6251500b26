use crate::{Checkpoint, Crosslink, Hash256, Shard, Slot};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// The data upon which an attestation is based.
///
/// The FFG vote is `source -> target`; `beacon_block_root` is the LMD vote.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Encode, Decode, TreeHash,
)]
pub struct AttestationData {
    // LMD GHOST vote
    pub slot: Slot,
    pub beacon_block_root: Hash256,

    // FFG vote
    pub source: Checkpoint,
    pub target: Checkpoint,

    // Crosslink vote
    pub shard: Shard,
    pub previous_crosslink: Crosslink,
    pub crosslink_data_root: Hash256,
}
