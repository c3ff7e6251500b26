use crate::common::{
    delayed_activation_exit_epoch, initiate_validator_exit, validator_churn_limit,
};
use types::{BeaconState, ChainSpec};

/// Advances the validator registry at the epoch boundary:
///
/// - newly funded validators become eligible for activation,
/// - validators whose balance fell under the ejection threshold start
///   exiting,
/// - the activation queue drains oldest-eligibility-first, capped by the
///   per-epoch churn limit.
pub fn process_registry_updates(state: &mut BeaconState, spec: &ChainSpec) {
    let current_epoch = state.current_epoch(spec);

    for validator in state.validator_registry.iter_mut() {
        if validator.activation_eligibility_epoch == spec.far_future_epoch
            && validator.effective_balance >= spec.max_deposit_amount
        {
            validator.activation_eligibility_epoch = current_epoch;
        }
    }

    for index in 0..state.validator_registry.len() {
        let is_active = state.validator_registry[index].is_active_at(current_epoch);
        if is_active && state.validator_balances[index] < spec.ejection_balance {
            initiate_validator_exit(state, index, spec);
        }
    }

    let mut activation_queue: Vec<usize> = state
        .validator_registry
        .iter()
        .enumerate()
        .filter(|(_, v)| {
            v.activation_eligibility_epoch != spec.far_future_epoch
                && v.activation_epoch == spec.far_future_epoch
        })
        .map(|(index, _)| index)
        .collect();
    activation_queue.sort_by_key(|&index| {
        (
            state.validator_registry[index].activation_eligibility_epoch,
            index,
        )
    });

    let churn_limit = validator_churn_limit(state, spec) as usize;
    let activation_epoch = delayed_activation_exit_epoch(current_epoch, spec);
    for index in activation_queue.into_iter().take(churn_limit) {
        let validator = &mut state.validator_registry[index];
        validator.activation_epoch = activation_epoch;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::test_utils::TestingBeaconStateBuilder;
    use types::{ChainSpec, Epoch, Hash256, Keypair, Validator};

    fn pending_validator(spec: &ChainSpec) -> Validator {
        Validator {
            pubkey: Keypair::random().pk,
            withdrawal_credentials: Hash256::zero(),
            activation_eligibility_epoch: spec.far_future_epoch,
            activation_epoch: spec.far_future_epoch,
            exit_epoch: spec.far_future_epoch,
            withdrawable_epoch: spec.far_future_epoch,
            slashed: false,
            effective_balance: spec.max_deposit_amount,
        }
    }

    #[test]
    fn funded_validator_enters_queue_and_activates() {
        let spec = ChainSpec::few_validators();
        let (mut state, _) = TestingBeaconStateBuilder::from_default_keypairs(8, &spec).build();

        state.validator_registry.push(pending_validator(&spec));
        state.validator_balances.push(spec.max_deposit_amount);

        process_registry_updates(&mut state, &spec);

        let added = state.validator_registry.last().unwrap();
        assert_eq!(added.activation_eligibility_epoch, Epoch::new(0));
        assert_eq!(
            added.activation_epoch,
            delayed_activation_exit_epoch(state.current_epoch(&spec), &spec)
        );
    }

    #[test]
    fn low_balance_validator_is_ejected() {
        let spec = ChainSpec::few_validators();
        let (mut state, _) = TestingBeaconStateBuilder::from_default_keypairs(8, &spec).build();

        state.validator_balances[5] = spec.ejection_balance - 1;
        process_registry_updates(&mut state, &spec);

        assert_ne!(
            state.validator_registry[5].exit_epoch,
            spec.far_future_epoch
        );
    }

    #[test]
    fn activations_respect_churn() {
        let mut spec = ChainSpec::few_validators();
        spec.max_balance_churn_quotient = 8;
        let (mut state, _) = TestingBeaconStateBuilder::from_default_keypairs(8, &spec).build();

        for _ in 0..3 {
            state.validator_registry.push(pending_validator(&spec));
            state.validator_balances.push(spec.max_deposit_amount);
        }

        process_registry_updates(&mut state, &spec);

        let activated = state
            .validator_registry
            .iter()
            .filter(|v| {
                v.activation_eligibility_epoch != spec.far_future_epoch
                    && v.activation_epoch != spec.far_future_epoch
                    && v.activation_epoch != spec.genesis_epoch
            })
            .count();
        // churn limit of one admits one validator per epoch
        assert_eq!(activated, 1);
    }
}
