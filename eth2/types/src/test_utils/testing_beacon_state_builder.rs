use crate::*;
use bls::{Keypair, PublicKey, SecretKey};

/// Generates `validator_count` keypairs where the secret keys are the scalars
/// `1..=validator_count`. Deterministic, so states built in different tests
/// agree on registrations.
pub fn generate_deterministic_keypairs(validator_count: usize) -> Vec<Keypair> {
    (0..validator_count)
        .map(|i| {
            let mut bytes = [0; 32];
            bytes[24..].copy_from_slice(&(i as u64 + 1).to_be_bytes());
            let sk = SecretKey::from_bytes(&bytes).expect("small scalars are valid secret keys");
            let pk = PublicKey::from_secret_key(&sk);
            Keypair { sk, pk }
        })
        .collect()
}

/// Builds a `BeaconState` at the genesis slot where every validator is
/// active with the maximum deposit.
pub struct TestingBeaconStateBuilder {
    state: BeaconState,
    keypairs: Vec<Keypair>,
}

impl TestingBeaconStateBuilder {
    pub fn from_default_keypairs(validator_count: usize, spec: &ChainSpec) -> Self {
        let keypairs = generate_deterministic_keypairs(validator_count);

        let validators = keypairs
            .iter()
            .map(|keypair| Validator {
                pubkey: keypair.pk.clone(),
                withdrawal_credentials: Hash256::zero(),
                activation_eligibility_epoch: spec.genesis_epoch,
                activation_epoch: spec.genesis_epoch,
                exit_epoch: spec.far_future_epoch,
                withdrawable_epoch: spec.far_future_epoch,
                slashed: false,
                effective_balance: spec.max_deposit_amount,
            })
            .collect::<Vec<_>>();

        let mut state = BeaconState::genesis(0, Eth1Data::default(), spec);
        state.validator_balances = vec![spec.max_deposit_amount; validator_count];
        state.validator_registry = validators;

        Self { state, keypairs }
    }

    /// Moves the state to `slot` without running per-slot processing.
    pub fn teleport_to_slot(&mut self, slot: Slot) -> &mut Self {
        self.state.slot = slot;
        self
    }

    pub fn build(self) -> (BeaconState, Vec<Keypair>) {
        (self.state, self.keypairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypairs_are_deterministic() {
        let a = generate_deterministic_keypairs(3);
        let b = generate_deterministic_keypairs(3);
        assert_eq!(a[2].pk, b[2].pk);
    }

    #[test]
    fn all_validators_active_at_genesis() {
        let spec = ChainSpec::few_validators();
        let (state, _) = TestingBeaconStateBuilder::from_default_keypairs(8, &spec).build();
        assert_eq!(
            state.get_active_validator_indices(spec.genesis_epoch).len(),
            8
        );
    }
}
