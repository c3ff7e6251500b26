//! The fork-choice rule for the beacon chain: an LMD-GHOST walk over the
//! block tree from the latest justified block, weighted by each validator's
//! most recent attestation target.

mod lmd_ghost;

pub use lmd_ghost::{BlockTreeNode, LmdGhost};

use types::{Hash256, Slot};

/// A validator's most recent vote, as fork choice sees it. Monotone in
/// `slot`: an older message never replaces a newer one.
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationTarget {
    pub slot: Slot,
    pub block_root: Hash256,
    pub parent_root: Hash256,
}

/// Defines the interface for fork choices. Block-level and attestation-level
/// structures are built through `add_block` and `add_attestation_target`;
/// the fork choice algorithm itself runs in `find_head`.
pub trait ForkChoice {
    /// Called when a block has been stored; its parent must already be
    /// known.
    fn add_block(
        &mut self,
        block: &types::BeaconBlock,
        block_root: Hash256,
    ) -> Result<(), ForkChoiceError>;

    /// Called with the target extracted from an accepted attestation, once
    /// per attesting validator.
    fn add_attestation_target(&mut self, validator_index: u64, target: AttestationTarget);

    /// The fork-choice algorithm: finds the current canonical head.
    fn find_head(&mut self) -> Result<Hash256, ForkChoiceError>;

    /// Called when a new block is finalized; prunes everything that does
    /// not descend from it.
    fn update_finalized(&mut self, finalized_root: Hash256) -> Result<(), ForkChoiceError>;
}

#[derive(Debug, PartialEq)]
pub enum ForkChoiceError {
    /// The block's parent is not part of the tree; the block is an orphan.
    MissingParent(Hash256),
    /// The given root is not part of the tree.
    UnknownRoot(Hash256),
    /// No post-state is stored for the block root.
    MissingHistoricalState(Hash256),
    StorageError(db::Error),
    BeaconStateError(types::BeaconStateError),
}

impl From<db::Error> for ForkChoiceError {
    fn from(e: db::Error) -> Self {
        ForkChoiceError::StorageError(e)
    }
}

impl From<types::BeaconStateError> for ForkChoiceError {
    fn from(e: types::BeaconStateError) -> Self {
        ForkChoiceError::BeaconStateError(e)
    }
}
