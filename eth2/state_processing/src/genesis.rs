use crate::common::process_deposit;
use types::*;

/// Builds the state at the chain-start boundary from the deposits that
/// crossed the start threshold.
///
/// Genesis deposits pre-date the state's trusted deposit root, so they are
/// applied without per-deposit proofs; the accumulator root they sum to is
/// recorded as `latest_eth1_data`.
pub fn get_genesis_beacon_state(
    deposits: &[Deposit],
    genesis_time: u64,
    latest_eth1_data: Eth1Data,
    spec: &ChainSpec,
) -> BeaconState {
    let mut state = BeaconState::genesis(genesis_time, latest_eth1_data, spec);

    for deposit in deposits {
        process_deposit(&mut state, deposit, spec);
    }

    // Validators deposited before the chain existed are active from the
    // first epoch, skipping the activation queue.
    for validator in state.validator_registry.iter_mut() {
        if validator.effective_balance >= spec.max_deposit_amount {
            validator.activation_eligibility_epoch = spec.genesis_epoch;
            validator.activation_epoch = spec.genesis_epoch;
        }
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::test_utils::generate_deterministic_keypairs;

    fn genesis_deposits(count: usize, spec: &ChainSpec) -> Vec<Deposit> {
        generate_deterministic_keypairs(count)
            .into_iter()
            .enumerate()
            .map(|(index, keypair)| Deposit {
                proof: vec![],
                index: index as u64,
                deposit_data: DepositData {
                    pubkey: keypair.pk,
                    withdrawal_credentials: Hash256::zero(),
                    amount: spec.max_deposit_amount,
                    signature: Signature::empty_signature(),
                },
            })
            .collect()
    }

    #[test]
    fn genesis_activates_full_deposits() {
        let spec = ChainSpec::few_validators();
        let deposits = genesis_deposits(8, &spec);
        let state = get_genesis_beacon_state(&deposits, 1_567_222_226, Eth1Data::default(), &spec);

        assert_eq!(state.slot, spec.genesis_slot);
        assert_eq!(state.genesis_time, 1_567_222_226);
        assert_eq!(state.deposit_index, 8);
        assert_eq!(state.validator_registry.len(), 8);
        assert_eq!(state.validator_balances.len(), 8);
        assert_eq!(
            state.get_active_validator_indices(spec.genesis_epoch).len(),
            8
        );
    }

    #[test]
    fn partial_deposit_waits_for_activation() {
        let spec = ChainSpec::few_validators();
        let mut deposits = genesis_deposits(8, &spec);
        deposits[7].deposit_data.amount = spec.min_deposit_amount;

        let state = get_genesis_beacon_state(&deposits, 0, Eth1Data::default(), &spec);
        assert_eq!(
            state.get_active_validator_indices(spec.genesis_epoch).len(),
            7
        );
        assert_eq!(
            state.validator_registry[7].activation_epoch,
            spec.far_future_epoch
        );
    }
}
