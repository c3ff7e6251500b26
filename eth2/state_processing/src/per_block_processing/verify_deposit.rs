use super::errors::DepositInvalid as Invalid;
use crate::common::verify_merkle_branch;
use tree_hash::{SignedRoot, TreeHash};
use types::*;

/// Indicates if a `Deposit` is valid to be included in a block in the
/// current epoch of the given state.
///
/// Deposits must arrive in strict accumulator order, prove membership in the
/// deposit root the state trusts, and carry a valid proof-of-possession.
pub fn verify_deposit(
    state: &BeaconState,
    deposit: &Deposit,
    spec: &ChainSpec,
) -> Result<(), Invalid> {
    verify!(
        deposit.index == state.deposit_index,
        Invalid::BadIndex {
            state: state.deposit_index,
            deposit: deposit.index,
        }
    );

    let leaf = Hash256::from_slice(&deposit.deposit_data.tree_hash_root()[..]);
    verify!(
        verify_merkle_branch(
            leaf,
            &deposit.proof,
            spec.deposit_contract_tree_depth as usize,
            deposit.index,
            state.latest_eth1_data.deposit_root,
        ),
        Invalid::BadMerkleProof
    );

    let domain = spec.get_domain(state.current_epoch(spec), Domain::Deposit, &state.fork);
    verify!(
        deposit.deposit_data.signature.verify(
            &deposit.deposit_data.signed_root(),
            domain,
            &deposit.deposit_data.pubkey,
        ),
        Invalid::BadSignature
    );

    Ok(())
}
