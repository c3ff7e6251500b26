use crate::{BeaconBlockBody, BeaconBlockHeader, ChainSpec, Eth1Data, Hash256, Slot};
use bls::Signature;
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash::{SignedRoot, TreeHash};
use tree_hash_derive::{SignedRoot, TreeHash};

/// A block of the `BeaconChain`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash, SignedRoot)]
pub struct BeaconBlock {
    pub slot: Slot,
    pub parent_root: Hash256,
    pub state_root: Hash256,
    pub body: BeaconBlockBody,
    #[signed_root(skip_hashing)]
    pub signature: Signature,
}

impl BeaconBlock {
    /// Returns an empty block to be used during genesis.
    pub fn empty(spec: &ChainSpec) -> Self {
        BeaconBlock {
            slot: spec.genesis_slot,
            parent_root: spec.zero_hash,
            state_root: spec.zero_hash,
            body: BeaconBlockBody {
                randao_reveal: spec.empty_signature.clone(),
                eth1_data: Eth1Data {
                    deposit_root: spec.zero_hash,
                    block_hash: spec.zero_hash,
                },
                proposer_slashings: vec![],
                attester_slashings: vec![],
                attestations: vec![],
                deposits: vec![],
                voluntary_exits: vec![],
            },
            signature: spec.empty_signature.clone(),
        }
    }

    /// Returns the `signed_root` of the block, the form the parent pointer
    /// of the next block commits to.
    pub fn canonical_root(&self) -> Hash256 {
        Hash256::from_slice(&self.signed_root()[..])
    }

    /// Returns a full `BeaconBlockHeader` of this block.
    ///
    /// Note: performs a full tree-hash of `self.body`.
    pub fn block_header(&self) -> BeaconBlockHeader {
        BeaconBlockHeader {
            slot: self.slot,
            parent_root: self.parent_root,
            state_root: self.state_root,
            body_root: Hash256::from_slice(&self.body.tree_hash_root()[..]),
            signature: self.signature.clone(),
        }
    }

    /// Returns a "temporary" header, where the `state_root` and `signature`
    /// are zeroed. This is the form the state stores while the slot's state
    /// root is still unknown.
    pub fn temporary_block_header(&self, spec: &ChainSpec) -> BeaconBlockHeader {
        BeaconBlockHeader {
            state_root: spec.zero_hash,
            signature: spec.empty_signature.clone(),
            ..self.block_header()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssz::{Decode, Encode};

    #[test]
    fn ssz_round_trip_empty_block() {
        let spec = ChainSpec::few_validators();
        let block = BeaconBlock::empty(&spec);

        let bytes = block.as_ssz_bytes();
        let decoded = BeaconBlock::from_ssz_bytes(&bytes).unwrap();
        assert_eq!(block, decoded);
        // Root is stable under re-encoding.
        assert_eq!(block.canonical_root(), decoded.canonical_root());
    }

    #[test]
    fn signature_excluded_from_canonical_root() {
        let spec = ChainSpec::few_validators();
        let mut block = BeaconBlock::empty(&spec);
        let root = block.canonical_root();

        block.signature = Signature::new(b"junk", 0, &bls::Keypair::random().sk);
        assert_eq!(block.canonical_root(), root);
    }
}
