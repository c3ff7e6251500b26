use super::errors::ProposerSlashingInvalid as Invalid;
use super::VerifySignatures;
use tree_hash::SignedRoot;
use types::*;

/// Indicates if a `ProposerSlashing` is valid to be included in a block in
/// the current epoch of the given state.
pub fn verify_proposer_slashing(
    state: &BeaconState,
    slashing: &ProposerSlashing,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), Invalid> {
    let proposer = state
        .validator_registry
        .get(slashing.proposer_index as usize)
        .ok_or(Invalid::ProposerUnknown(slashing.proposer_index))?;

    verify!(
        slashing.header_1.slot == slashing.header_2.slot,
        Invalid::ProposalSlotMismatch(slashing.header_1.slot, slashing.header_2.slot)
    );
    verify!(
        slashing.header_1 != slashing.header_2,
        Invalid::ProposalsIdentical
    );
    verify!(!proposer.slashed, Invalid::ProposerAlreadySlashed);

    if verify_signatures.is_true() {
        let domain = spec.get_domain(
            slashing.header_1.slot.epoch(spec.slots_per_epoch),
            Domain::Proposal,
            &state.fork,
        );
        verify!(
            slashing
                .header_1
                .signature
                .verify(&slashing.header_1.signed_root(), domain, &proposer.pubkey),
            Invalid::BadHeader1Signature
        );
        verify!(
            slashing
                .header_2
                .signature
                .verify(&slashing.header_2.signed_root(), domain, &proposer.pubkey),
            Invalid::BadHeader2Signature
        );
    }

    Ok(())
}
