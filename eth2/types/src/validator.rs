use crate::{Epoch, Hash256};
use bls::PublicKey;
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Information about a `BeaconChain` validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Validator {
    pub pubkey: PublicKey,
    pub withdrawal_credentials: Hash256,
    pub activation_eligibility_epoch: Epoch,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
    pub slashed: bool,
    pub effective_balance: u64,
}

impl Validator {
    /// Returns `true` if the validator is considered active at some epoch.
    pub fn is_active_at(&self, epoch: Epoch) -> bool {
        self.activation_epoch <= epoch && epoch < self.exit_epoch
    }

    /// Returns `true` if the validator is able to withdraw at some epoch.
    pub fn is_withdrawable_at(&self, epoch: Epoch) -> bool {
        epoch >= self.withdrawable_epoch
    }

    /// Returns `true` if the validator has initiated (or completed) an exit.
    pub fn has_exited(&self, far_future_epoch: Epoch) -> bool {
        self.exit_epoch != far_future_epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bls::Keypair;

    fn validator(activation: u64, exit: u64) -> Validator {
        Validator {
            pubkey: Keypair::random().pk,
            withdrawal_credentials: Hash256::zero(),
            activation_eligibility_epoch: Epoch::new(activation),
            activation_epoch: Epoch::new(activation),
            exit_epoch: Epoch::new(exit),
            withdrawable_epoch: Epoch::new(exit),
            slashed: false,
            effective_balance: 32_000_000_000,
        }
    }

    #[test]
    fn active_window_is_half_open() {
        let v = validator(2, 5);
        assert!(!v.is_active_at(Epoch::new(1)));
        assert!(v.is_active_at(Epoch::new(2)));
        assert!(v.is_active_at(Epoch::new(4)));
        assert!(!v.is_active_at(Epoch::new(5)));
    }
}
