use crate::common::initiate_validator_exit;
use types::{BeaconState, BeaconStateError, ChainSpec};

/// Slashes the validator at `validator_index`: forced exit, the slashed
/// flag, a pushed-out withdrawable epoch, and the whistleblower transfer to
/// the current proposer.
pub fn slash_validator(
    state: &mut BeaconState,
    validator_index: usize,
    spec: &ChainSpec,
) -> Result<(), BeaconStateError> {
    if validator_index >= state.validator_registry.len() {
        return Err(BeaconStateError::UnknownValidator);
    }

    let current_epoch = state.current_epoch(spec);

    initiate_validator_exit(state, validator_index, spec);

    let effective_balance = state.get_effective_balance(validator_index)?;
    {
        let validator = &mut state.validator_registry[validator_index];
        validator.slashed = true;
        validator.withdrawable_epoch = current_epoch + spec.latest_slashed_exit_length as u64;
    }

    let slashed_so_far = state.get_slashed_balance(current_epoch, spec);
    state.set_slashed_balance(current_epoch, slashed_so_far + effective_balance, spec);

    let proposer_index = state
        .get_beacon_proposer_index(state.slot, spec)?;
    let whistleblower_reward = effective_balance / spec.whistleblower_reward_quotient;
    state.validator_balances[proposer_index] += whistleblower_reward;
    state.validator_balances[validator_index] =
        state.validator_balances[validator_index].saturating_sub(whistleblower_reward);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::test_utils::TestingBeaconStateBuilder;
    use types::{ChainSpec, Slot};

    #[test]
    fn slashing_marks_and_penalizes() {
        let spec = ChainSpec::few_validators();
        let (mut state, _) = TestingBeaconStateBuilder::from_default_keypairs(16, &spec).build();
        state.slot = Slot::new(1);

        let proposer = state.get_beacon_proposer_index(state.slot, &spec).unwrap();
        slash_validator(&mut state, 3, &spec).unwrap();

        let current_epoch = state.current_epoch(&spec);
        assert!(state.validator_registry[3].slashed);
        assert_ne!(state.validator_registry[3].exit_epoch, spec.far_future_epoch);
        assert_eq!(
            state.get_slashed_balance(current_epoch, &spec),
            spec.max_deposit_amount
        );
        if proposer != 3 {
            assert!(state.validator_balances[3] < spec.max_deposit_amount);
            assert!(state.validator_balances[proposer] > spec.max_deposit_amount);
        }
    }
}
