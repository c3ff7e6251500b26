use crate::{Shard, Slot};

/// A validator's committee assignment for one epoch.
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct AttestationDuty {
    pub slot: Slot,
    pub shard: Shard,
    /// The position of the validator within its committee.
    pub committee_index: usize,
    pub committee_len: usize,
}
