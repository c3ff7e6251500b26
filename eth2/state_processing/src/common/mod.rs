//! Helpers shared between the block and epoch transitions.

mod exit;
mod merkle;
mod slash;

pub use exit::{delayed_activation_exit_epoch, initiate_validator_exit, validator_churn_limit};
pub use merkle::verify_merkle_branch;
pub use slash::slash_validator;

use types::{BeaconState, ChainSpec, Deposit, Validator};

/// Applies a deposit to the registry: a new key appends a validator, a known
/// key tops its balance up. The deposit index advances either way.
///
/// The caller is responsible for any proof or signature verification.
pub fn process_deposit(state: &mut BeaconState, deposit: &Deposit, spec: &ChainSpec) {
    let data = &deposit.deposit_data;
    let amount = data.amount;

    match state.get_validator_index(&data.pubkey) {
        Some(index) => {
            state.validator_balances[index] += amount;
        }
        None => {
            let effective_balance = std::cmp::min(
                amount - amount % spec.effective_balance_increment,
                spec.max_deposit_amount,
            );
            state.validator_registry.push(Validator {
                pubkey: data.pubkey.clone(),
                withdrawal_credentials: data.withdrawal_credentials,
                activation_eligibility_epoch: spec.far_future_epoch,
                activation_epoch: spec.far_future_epoch,
                exit_epoch: spec.far_future_epoch,
                withdrawable_epoch: spec.far_future_epoch,
                slashed: false,
                effective_balance,
            });
            state.validator_balances.push(amount);
        }
    }

    state.deposit_index += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::test_utils::TestingBeaconStateBuilder;
    use types::*;

    fn deposit_for(keypair: &Keypair, amount: u64) -> Deposit {
        Deposit {
            proof: vec![],
            index: 0,
            deposit_data: DepositData {
                pubkey: keypair.pk.clone(),
                withdrawal_credentials: Hash256::zero(),
                amount,
                signature: Signature::empty_signature(),
            },
        }
    }

    #[test]
    fn new_key_appends_to_registry() {
        let spec = ChainSpec::few_validators();
        let (mut state, _) = TestingBeaconStateBuilder::from_default_keypairs(4, &spec).build();
        let keypair = Keypair::random();

        process_deposit(&mut state, &deposit_for(&keypair, spec.max_deposit_amount), &spec);

        assert_eq!(state.validator_registry.len(), 5);
        assert_eq!(state.validator_balances.len(), 5);
        assert_eq!(state.deposit_index, 1);
        // A fresh validator awaits the activation queue.
        assert_eq!(
            state.validator_registry[4].activation_epoch,
            spec.far_future_epoch
        );
    }

    #[test]
    fn known_key_tops_up() {
        let spec = ChainSpec::few_validators();
        let (mut state, keypairs) =
            TestingBeaconStateBuilder::from_default_keypairs(4, &spec).build();

        process_deposit(&mut state, &deposit_for(&keypairs[2], 5), &spec);

        assert_eq!(state.validator_registry.len(), 4);
        assert_eq!(state.validator_balances[2], spec.max_deposit_amount + 5);
    }
}
