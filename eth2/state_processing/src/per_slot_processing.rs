use crate::per_epoch_processing::{errors::EpochProcessingError, per_epoch_processing};
use types::{BeaconState, BeaconStateError, ChainSpec, Slot};

#[derive(Debug, PartialEq)]
pub enum SlotProcessingError {
    /// The requested slot is behind the state; slots only move forward.
    TargetSlotBehindState { state_slot: Slot, target_slot: Slot },
    BeaconStateError(BeaconStateError),
    EpochProcessingError(EpochProcessingError),
}

/// Advances the state until `state.slot == target_slot`, one slot at a time.
///
/// Each step caches the outgoing slot's block and state roots into the
/// bounded history rings (on every slot, block or no block) and runs epoch
/// processing when the step crosses an epoch boundary.
pub fn process_slots(
    state: &mut BeaconState,
    target_slot: Slot,
    spec: &ChainSpec,
) -> Result<(), SlotProcessingError> {
    if target_slot < state.slot {
        return Err(SlotProcessingError::TargetSlotBehindState {
            state_slot: state.slot,
            target_slot,
        });
    }

    while state.slot < target_slot {
        per_slot_processing(state, spec)?;
    }

    Ok(())
}

/// Advances the state forward by exactly one slot.
pub fn per_slot_processing(
    state: &mut BeaconState,
    spec: &ChainSpec,
) -> Result<(), SlotProcessingError> {
    cache_state(state, spec)?;

    if (state.slot + 1) % spec.slots_per_epoch == 0 {
        per_epoch_processing(state, spec)?;
    }

    state.slot += 1;

    Ok(())
}

/// Stores the outgoing slot's state root and block root in the history
/// rings, sealing the latest block header's state root if the block left it
/// unset.
fn cache_state(state: &mut BeaconState, spec: &ChainSpec) -> Result<(), SlotProcessingError> {
    let previous_state_root = state.canonical_root();

    if state.latest_block_header.state_root == spec.zero_hash {
        state.latest_block_header.state_root = previous_state_root;
    }
    let latest_block_root = state.latest_block_header.canonical_root();

    state.set_state_root(state.slot, previous_state_root, spec)?;
    state.set_block_root(state.slot, latest_block_root, spec)?;

    Ok(())
}

impl From<BeaconStateError> for SlotProcessingError {
    fn from(e: BeaconStateError) -> Self {
        SlotProcessingError::BeaconStateError(e)
    }
}

impl From<EpochProcessingError> for SlotProcessingError {
    fn from(e: EpochProcessingError) -> Self {
        SlotProcessingError::EpochProcessingError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::test_utils::TestingBeaconStateBuilder;
    use types::ChainSpec;

    #[test]
    fn refuses_to_rewind() {
        let spec = ChainSpec::few_validators();
        let (mut state, _) = TestingBeaconStateBuilder::from_default_keypairs(8, &spec).build();
        state.slot = Slot::new(5);

        assert_eq!(
            process_slots(&mut state, Slot::new(4), &spec),
            Err(SlotProcessingError::TargetSlotBehindState {
                state_slot: Slot::new(5),
                target_slot: Slot::new(4),
            })
        );
    }

    #[test]
    fn skipped_slots_cache_state_roots() {
        let spec = ChainSpec::few_validators();
        let (mut state, _) = TestingBeaconStateBuilder::from_default_keypairs(8, &spec).build();

        process_slots(&mut state, Slot::new(3), &spec).unwrap();

        assert_eq!(state.slot, Slot::new(3));
        for slot in 0..3 {
            // Every skipped slot has a cached state root and block root.
            assert_ne!(
                state.get_state_root(Slot::new(slot), &spec).unwrap(),
                &spec.zero_hash
            );
            assert_ne!(
                state.get_block_root(Slot::new(slot), &spec).unwrap(),
                &spec.zero_hash
            );
        }
    }

    #[test]
    fn noop_when_already_at_target() {
        let spec = ChainSpec::few_validators();
        let (mut state, _) = TestingBeaconStateBuilder::from_default_keypairs(8, &spec).build();
        state.slot = Slot::new(2);

        let before = state.clone();
        process_slots(&mut state, Slot::new(2), &spec).unwrap();
        assert_eq!(state, before);
    }
}
