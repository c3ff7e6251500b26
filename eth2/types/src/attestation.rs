use crate::{AttestationData, Bitfield};
use bls::AggregateSignature;
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

/// An aggregated vote for one `AttestationData`.
///
/// Both bitfields have length equal to the committee size at
/// `(data.slot, data.shard)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Attestation {
    pub aggregation_bitfield: Bitfield,
    pub data: AttestationData,
    pub custody_bitfield: Bitfield,
    pub aggregate_signature: AggregateSignature,
}

impl Attestation {
    /// Are the aggregation bitfields of these attestations disjoint?
    pub fn signers_disjoint_from(&self, other: &Self) -> bool {
        self.aggregation_bitfield
            .is_disjoint(&other.aggregation_bitfield)
    }

    /// Aggregate another Attestation into this one.
    ///
    /// The aggregation bitfields must be disjoint, and the data must be the
    /// same.
    pub fn aggregate(&mut self, other: &Self) {
        debug_assert_eq!(self.data, other.data);
        debug_assert!(self.signers_disjoint_from(other));

        self.aggregation_bitfield
            .union_inplace(&other.aggregation_bitfield);
        self.custody_bitfield.union_inplace(&other.custody_bitfield);
        self.aggregate_signature
            .add_aggregate(&other.aggregate_signature);
    }

    /// Returns the `tree_hash_root` of the attestation.
    pub fn canonical_root(&self) -> crate::Hash256 {
        crate::Hash256::from_slice(&self.tree_hash_root()[..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attestation_with_signer(committee_size: usize, signer: usize) -> Attestation {
        let mut aggregation_bitfield = Bitfield::with_capacity(committee_size);
        aggregation_bitfield.set(signer, true);
        Attestation {
            aggregation_bitfield,
            data: AttestationData::default(),
            custody_bitfield: Bitfield::with_capacity(committee_size),
            aggregate_signature: AggregateSignature::new(),
        }
    }

    #[test]
    fn aggregation_unions_bitfields() {
        let mut a = attestation_with_signer(8, 1);
        let b = attestation_with_signer(8, 6);

        assert!(a.signers_disjoint_from(&b));
        a.aggregate(&b);

        assert!(a.aggregation_bitfield.get(1));
        assert!(a.aggregation_bitfield.get(6));
        assert!(!a.signers_disjoint_from(&b));
    }
}
