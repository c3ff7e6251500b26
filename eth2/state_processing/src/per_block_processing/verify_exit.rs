use super::errors::ExitInvalid as Invalid;
use super::VerifySignatures;
use tree_hash::SignedRoot;
use types::*;

/// Indicates if a `VoluntaryExit` is valid to be included in a block in the
/// current epoch of the given state.
pub fn verify_exit(
    state: &BeaconState,
    exit: &VoluntaryExit,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), Invalid> {
    let validator = state
        .validator_registry
        .get(exit.validator_index as usize)
        .ok_or(Invalid::ValidatorUnknown(exit.validator_index))?;

    let current_epoch = state.current_epoch(spec);

    verify!(
        validator.exit_epoch == spec.far_future_epoch,
        Invalid::AlreadyExited
    );
    verify!(validator.is_active_at(current_epoch), Invalid::NotActive);
    verify!(
        current_epoch >= exit.epoch,
        Invalid::FutureEpoch {
            state: current_epoch,
            exit: exit.epoch,
        }
    );

    if verify_signatures.is_true() {
        let domain = spec.get_domain(exit.epoch, Domain::Exit, &state.fork);
        verify!(
            exit.signature
                .verify(&exit.signed_root(), domain, &validator.pubkey),
            Invalid::BadSignature
        );
    }

    Ok(())
}
