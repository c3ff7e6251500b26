use crate::{DepositData, Hash256};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// A deposit drawn from the ETH1 accumulator, carried in a block body.
///
/// `index` is the merkle tree index; deposits are included in strict
/// ascending index order and exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Deposit {
    pub proof: Vec<Hash256>,
    pub index: u64,
    pub deposit_data: DepositData,
}
