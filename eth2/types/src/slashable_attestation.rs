use crate::{AttestationData, Bitfield, ChainSpec};
use bls::AggregateSignature;
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// An attestation in the explicit-indices form used by slashing evidence.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct SlashableAttestation {
    /// The validators that signed, ascending.
    pub validator_indices: Vec<u64>,
    pub data: AttestationData,
    pub custody_bitfield: Bitfield,
    pub aggregate_signature: AggregateSignature,
}

impl SlashableAttestation {
    /// Whether `self` and `other` vote for the same target out of different
    /// data (a "double vote").
    pub fn is_double_vote(&self, other: &SlashableAttestation, spec: &ChainSpec) -> bool {
        self.data.slot.epoch(spec.slots_per_epoch) == other.data.slot.epoch(spec.slots_per_epoch)
            && self.data != other.data
    }

    /// Whether `self` surrounds `other`: `self`'s source is strictly older
    /// and its target strictly newer.
    pub fn is_surround_vote(&self, other: &SlashableAttestation, spec: &ChainSpec) -> bool {
        let source_epoch_1 = self.data.source.epoch;
        let source_epoch_2 = other.data.source.epoch;
        let target_epoch_1 = self.data.slot.epoch(spec.slots_per_epoch);
        let target_epoch_2 = other.data.slot.epoch(spec.slots_per_epoch);

        source_epoch_1 < source_epoch_2 && target_epoch_2 < target_epoch_1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AttestationData, Checkpoint, Epoch, Slot};

    fn slashable(source_epoch: u64, slot: u64) -> SlashableAttestation {
        let mut data = AttestationData::default();
        data.slot = Slot::new(slot);
        data.source = Checkpoint {
            epoch: Epoch::new(source_epoch),
            root: data.source.root,
        };
        SlashableAttestation {
            validator_indices: vec![0],
            data,
            custody_bitfield: Bitfield::with_capacity(1),
            aggregate_signature: AggregateSignature::new(),
        }
    }

    #[test]
    fn surround_vote_detected() {
        let spec = ChainSpec::few_validators();
        // Source 0, target epoch 4 surrounds source 1, target epoch 2.
        let outer = slashable(0, 4 * spec.slots_per_epoch);
        let inner = slashable(1, 2 * spec.slots_per_epoch);

        assert!(outer.is_surround_vote(&inner, &spec));
        assert!(!inner.is_surround_vote(&outer, &spec));
    }

    #[test]
    fn double_vote_needs_same_epoch() {
        let spec = ChainSpec::few_validators();
        let a = slashable(0, 9);
        let mut b = slashable(0, 9);
        b.data.beacon_block_root = crate::Hash256::from_low_u64_be(99);

        assert!(a.is_double_vote(&b, &spec));
        let c = slashable(0, 9 + spec.slots_per_epoch);
        assert!(!a.is_double_vote(&c, &spec));
    }
}
