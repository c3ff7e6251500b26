use crate::per_block_processing::{
    errors::BlockProcessingError, per_block_processing, VerifySignatures,
};
use crate::per_slot_processing::{process_slots, SlotProcessingError};
use types::{BeaconBlock, BeaconState, ChainSpec, Hash256};

#[derive(Debug, PartialEq)]
pub enum StateTransitionError {
    SlotProcessingError(SlotProcessingError),
    BlockProcessingError(BlockProcessingError),
    /// The registry and balance arrays fell out of lock-step; the transition
    /// left the state unusable.
    RegistryBalancesMismatch,
}

/// Advances `state` to `block.slot` and applies `block`, verifying every
/// signature it carries. The only entry point used by the block applier.
pub fn state_transition(
    state: &mut BeaconState,
    block: &BeaconBlock,
    spec: &ChainSpec,
) -> Result<(), StateTransitionError> {
    transition(state, block, VerifySignatures::True, spec)
}

/// As `state_transition`, with signature checks skipped. Used when building
/// templates whose signature does not exist yet.
pub fn state_transition_without_verifying_signatures(
    state: &mut BeaconState,
    block: &BeaconBlock,
    spec: &ChainSpec,
) -> Result<(), StateTransitionError> {
    transition(state, block, VerifySignatures::False, spec)
}

fn transition(
    state: &mut BeaconState,
    block: &BeaconBlock,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), StateTransitionError> {
    process_slots(state, block.slot, spec)?;
    per_block_processing(state, block, verify_signatures, spec)?;

    if state.validator_registry.len() != state.validator_balances.len() {
        return Err(StateTransitionError::RegistryBalancesMismatch);
    }

    Ok(())
}

/// Runs the transition on a defensive copy and returns the resulting state
/// root. Used by proposers to seal the blocks they build.
pub fn compute_state_root(
    state: &BeaconState,
    block: &BeaconBlock,
    spec: &ChainSpec,
) -> Result<Hash256, StateTransitionError> {
    let mut state = state.clone();
    state_transition_without_verifying_signatures(&mut state, block, spec)?;
    Ok(state.canonical_root())
}

impl From<SlotProcessingError> for StateTransitionError {
    fn from(e: SlotProcessingError) -> Self {
        StateTransitionError::SlotProcessingError(e)
    }
}

impl From<BlockProcessingError> for StateTransitionError {
    fn from(e: BlockProcessingError) -> Self {
        StateTransitionError::BlockProcessingError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::per_block_processing::errors::{BlockProcessingError, HeaderInvalid};
    use int_to_bytes::int_to_bytes32;
    use tree_hash::SignedRoot;
    use types::test_utils::TestingBeaconStateBuilder;
    use types::*;

    /// Builds a fully signed, empty-bodied block on top of `state` at
    /// `slot`, the way a proposer would.
    fn build_block(state: &BeaconState, slot: Slot, keypairs: &[Keypair], spec: &ChainSpec) -> BeaconBlock {
        let mut advanced = state.clone();
        process_slots(&mut advanced, slot, spec).unwrap();

        let proposer_index = advanced.get_beacon_proposer_index(slot, spec).unwrap();
        let keypair = &keypairs[proposer_index];
        let epoch = slot.epoch(spec.slots_per_epoch);

        let mut block = BeaconBlock::empty(spec);
        block.slot = slot;
        block.parent_root = advanced.latest_block_header.canonical_root();
        block.body.randao_reveal = Signature::new(
            &int_to_bytes32(epoch.as_u64()),
            spec.get_domain(epoch, Domain::Randao, &advanced.fork),
            &keypair.sk,
        );
        block.state_root = compute_state_root(state, &block, spec).unwrap();

        let domain = spec.get_domain(epoch, Domain::Proposal, &advanced.fork);
        block.signature = Signature::new(&block.signed_root(), domain, &keypair.sk);
        block
    }

    #[test]
    fn applies_a_signed_empty_block() {
        let spec = ChainSpec::few_validators();
        let (mut state, keypairs) =
            TestingBeaconStateBuilder::from_default_keypairs(8, &spec).build();

        let block = build_block(&state, Slot::new(1), &keypairs, &spec);
        state_transition(&mut state, &block, &spec).unwrap();

        assert_eq!(state.slot, block.slot);
        assert_eq!(
            state.validator_registry.len(),
            state.validator_balances.len()
        );
        assert_eq!(state.canonical_root(), block.state_root);
        // The new block is now the latest header, state root unsealed.
        assert_eq!(state.latest_block_header.slot, block.slot);
        assert_eq!(state.latest_block_header.state_root, spec.zero_hash);
    }

    #[test]
    fn applies_across_an_epoch_boundary() {
        let spec = ChainSpec::few_validators();
        let (mut state, keypairs) =
            TestingBeaconStateBuilder::from_default_keypairs(8, &spec).build();

        let slot = Slot::new(spec.slots_per_epoch + 1);
        let block = build_block(&state, slot, &keypairs, &spec);
        state_transition(&mut state, &block, &spec).unwrap();

        assert_eq!(state.slot, slot);
        assert_eq!(state.current_epoch(&spec), Epoch::new(1));
    }

    #[test]
    fn rejects_a_bad_block_signature() {
        let spec = ChainSpec::few_validators();
        let (mut state, keypairs) =
            TestingBeaconStateBuilder::from_default_keypairs(8, &spec).build();

        let mut block = build_block(&state, Slot::new(1), &keypairs, &spec);
        block.signature = Signature::new(b"junk", 0, &keypairs[0].sk);

        assert_eq!(
            state_transition(&mut state, &block, &spec),
            Err(StateTransitionError::BlockProcessingError(
                BlockProcessingError::HeaderInvalid(HeaderInvalid::BadSignature)
            ))
        );
    }

    #[test]
    fn rejects_a_bad_parent_root() {
        let spec = ChainSpec::few_validators();
        let (mut state, keypairs) =
            TestingBeaconStateBuilder::from_default_keypairs(8, &spec).build();

        let mut block = build_block(&state, Slot::new(1), &keypairs, &spec);
        block.parent_root = Hash256::from_low_u64_be(42);

        match state_transition(&mut state, &block, &spec) {
            Err(StateTransitionError::BlockProcessingError(
                BlockProcessingError::HeaderInvalid(HeaderInvalid::ParentBlockRootMismatch {
                    ..
                }),
            )) => {}
            other => panic!("expected parent root mismatch, got {:?}", other),
        }
    }

    #[test]
    fn applies_a_block_carrying_an_exit() {
        let spec = ChainSpec::few_validators();
        let (mut state, keypairs) =
            TestingBeaconStateBuilder::from_default_keypairs(8, &spec).build();

        let mut exit = VoluntaryExit {
            epoch: Epoch::new(0),
            validator_index: 5,
            signature: Signature::empty_signature(),
        };
        let domain = spec.get_domain(exit.epoch, Domain::Exit, &state.fork);
        exit.signature = Signature::new(&exit.signed_root(), domain, &keypairs[5].sk);

        // Rebuild the block around the operation so roots and signature
        // stay consistent.
        let mut block = build_block(&state, Slot::new(1), &keypairs, &spec);
        block.body.voluntary_exits.push(exit);
        block.state_root = compute_state_root(&state, &block, &spec).unwrap();
        let mut advanced = state.clone();
        process_slots(&mut advanced, block.slot, &spec).unwrap();
        let proposer_index = advanced
            .get_beacon_proposer_index(block.slot, &spec)
            .unwrap();
        let domain = spec.get_domain(
            block.slot.epoch(spec.slots_per_epoch),
            Domain::Proposal,
            &advanced.fork,
        );
        block.signature = Signature::new(&block.signed_root(), domain, &keypairs[proposer_index].sk);

        state_transition(&mut state, &block, &spec).unwrap();
        assert_ne!(
            state.validator_registry[5].exit_epoch,
            spec.far_future_epoch
        );
    }

    #[test]
    fn template_state_root_matches_unsigned_transition() {
        let spec = ChainSpec::few_validators();
        let (state, keypairs) = TestingBeaconStateBuilder::from_default_keypairs(8, &spec).build();

        let block = build_block(&state, Slot::new(2), &keypairs, &spec);
        // Recomputing on the untouched state gives the root sealed into the
        // block.
        assert_eq!(
            compute_state_root(&state, &block, &spec).unwrap(),
            block.state_root
        );
    }
}
