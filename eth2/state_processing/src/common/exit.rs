use types::{BeaconState, ChainSpec, Epoch};

/// The number of validators that may enter or leave the active set in one
/// epoch.
pub fn validator_churn_limit(state: &BeaconState, spec: &ChainSpec) -> u64 {
    let active = state
        .get_active_validator_indices(state.current_epoch(spec))
        .len() as u64;
    std::cmp::max(1, active / spec.max_balance_churn_quotient)
}

/// Puts `validator_index` into the exit queue, assigning the earliest exit
/// epoch whose churn allowance is not yet exhausted. Idempotent for
/// validators that already hold an exit epoch.
pub fn initiate_validator_exit(state: &mut BeaconState, validator_index: usize, spec: &ChainSpec) {
    if state.validator_registry[validator_index].exit_epoch != spec.far_future_epoch {
        return;
    }

    let delayed_epoch = delayed_activation_exit_epoch(state.current_epoch(spec), spec);
    let mut exit_queue_epoch = state
        .validator_registry
        .iter()
        .filter(|v| v.exit_epoch != spec.far_future_epoch)
        .map(|v| v.exit_epoch)
        .max()
        .unwrap_or(delayed_epoch);
    if exit_queue_epoch < delayed_epoch {
        exit_queue_epoch = delayed_epoch;
    }

    let exiting_at_queue_epoch = state
        .validator_registry
        .iter()
        .filter(|v| v.exit_epoch == exit_queue_epoch)
        .count() as u64;
    if exiting_at_queue_epoch >= validator_churn_limit(state, spec) {
        exit_queue_epoch += 1;
    }

    let validator = &mut state.validator_registry[validator_index];
    validator.exit_epoch = exit_queue_epoch;
    validator.withdrawable_epoch = exit_queue_epoch + spec.min_validator_withdrawability_delay;
}

/// The first epoch an activation or exit initiated at `epoch` takes effect.
pub fn delayed_activation_exit_epoch(epoch: Epoch, spec: &ChainSpec) -> Epoch {
    epoch + 1 + spec.activation_exit_delay
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::test_utils::TestingBeaconStateBuilder;
    use types::ChainSpec;

    #[test]
    fn exit_is_idempotent() {
        let spec = ChainSpec::few_validators();
        let (mut state, _) = TestingBeaconStateBuilder::from_default_keypairs(8, &spec).build();

        initiate_validator_exit(&mut state, 0, &spec);
        let first = state.validator_registry[0].exit_epoch;
        initiate_validator_exit(&mut state, 0, &spec);
        assert_eq!(state.validator_registry[0].exit_epoch, first);
        assert_ne!(first, spec.far_future_epoch);
    }

    #[test]
    fn exits_queue_beyond_churn() {
        let mut spec = ChainSpec::few_validators();
        spec.max_balance_churn_quotient = 8;
        let (mut state, _) = TestingBeaconStateBuilder::from_default_keypairs(8, &spec).build();

        // churn limit is one, so the second exit lands an epoch later
        initiate_validator_exit(&mut state, 0, &spec);
        initiate_validator_exit(&mut state, 1, &spec);
        assert_eq!(
            state.validator_registry[1].exit_epoch,
            state.validator_registry[0].exit_epoch + 1
        );
    }
}
