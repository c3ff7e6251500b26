use crate::{ChainSpec, Domain, Epoch, Fork, Hash256};
use bls::{PublicKey, SecretKey, Signature};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash::{SignedRoot, TreeHash};
use tree_hash_derive::{SignedRoot, TreeHash};

/// The data a depositor commits to in the ETH1 deposit contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash, SignedRoot)]
pub struct DepositData {
    pub pubkey: PublicKey,
    pub withdrawal_credentials: Hash256,
    pub amount: u64,
    #[signed_root(skip_hashing)]
    pub signature: Signature,
}

impl DepositData {
    /// Generate the proof-of-possession over the deposit data.
    pub fn create_signature(
        &self,
        secret_key: &SecretKey,
        epoch: Epoch,
        fork: &Fork,
        spec: &ChainSpec,
    ) -> Signature {
        let msg = self.signed_root();
        let domain = spec.get_domain(epoch, Domain::Deposit, fork);
        Signature::new(&msg, domain, secret_key)
    }
}
