use types::{BeaconState, ChainSpec};

/// Applies the deferred slashing penalty to every slashed validator sitting
/// at the midpoint of its withdrawal window. The penalty scales with how
/// much total balance was slashed in the surrounding window.
pub fn process_slashings(state: &mut BeaconState, current_total_balance: u64, spec: &ChainSpec) {
    let current_epoch = state.current_epoch(spec);

    let total_at_start = state.get_slashed_balance(current_epoch + 1, spec);
    let total_at_end = state.get_slashed_balance(current_epoch, spec);
    let total_penalties = total_at_end.saturating_sub(total_at_start);

    let window_midpoint = spec.latest_slashed_exit_length as u64 / 2;
    let registry = &state.validator_registry;
    let balances = &mut state.validator_balances;

    for (index, validator) in registry.iter().enumerate() {
        if !validator.slashed
            || current_epoch != validator.withdrawable_epoch - window_midpoint
        {
            continue;
        }

        let effective_balance = validator.effective_balance;
        let total = current_total_balance.max(1);
        let scaled = effective_balance * std::cmp::min(total_penalties * 3, total) / total;
        let penalty = std::cmp::max(scaled, effective_balance / spec.min_penalty_quotient);

        balances[index] = balances[index].saturating_sub(penalty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::test_utils::TestingBeaconStateBuilder;
    use types::{ChainSpec, Epoch};

    #[test]
    fn penalty_lands_at_window_midpoint() {
        let spec = ChainSpec::few_validators();
        let (mut state, _) = TestingBeaconStateBuilder::from_default_keypairs(8, &spec).build();

        let midpoint = spec.latest_slashed_exit_length as u64 / 2;
        state.validator_registry[0].slashed = true;
        state.validator_registry[0].withdrawable_epoch = Epoch::new(midpoint);
        let current_epoch = state.current_epoch(&spec);
        state.set_slashed_balance(current_epoch, spec.max_deposit_amount, &spec);

        let total = spec.max_deposit_amount * 8;
        let before = state.validator_balances[0];
        process_slashings(&mut state, total, &spec);
        assert!(state.validator_balances[0] < before);

        // Untouched validators keep their balance.
        assert_eq!(state.validator_balances[1], spec.max_deposit_amount);
    }
}
