use super::errors::{
    AttesterSlashingInvalid as Invalid, SlashableAttestationInvalid as SlashableInvalid,
};
use super::VerifySignatures;
use tree_hash::TreeHash;
use types::*;

/// Indicates if an `AttesterSlashing` is valid to be included in a block in
/// the current epoch of the given state: two well-formed attestations that
/// constitute a double or surround vote.
pub fn verify_attester_slashing(
    state: &BeaconState,
    slashing: &AttesterSlashing,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), Invalid> {
    let attestation_1 = &slashing.slashable_attestation_1;
    let attestation_2 = &slashing.slashable_attestation_2;

    verify!(
        attestation_1.is_double_vote(attestation_2, spec)
            || attestation_1.is_surround_vote(attestation_2, spec),
        Invalid::NotSlashable
    );

    verify_slashable_attestation(state, attestation_1, verify_signatures, spec)
        .map_err(Invalid::SlashableAttestation1Invalid)?;
    verify_slashable_attestation(state, attestation_2, verify_signatures, spec)
        .map_err(Invalid::SlashableAttestation2Invalid)?;

    Ok(())
}

/// The validators that signed both attestations and are still slashable.
/// Empty intersections are an error; the slashing would be a no-op.
pub fn gather_slashable_indices(
    state: &BeaconState,
    slashing: &AttesterSlashing,
    spec: &ChainSpec,
) -> Result<Vec<u64>, Invalid> {
    let indices_2 = &slashing.slashable_attestation_2.validator_indices;

    let slashable: Vec<u64> = slashing
        .slashable_attestation_1
        .validator_indices
        .iter()
        .filter(|index| indices_2.contains(index))
        .filter(|&&index| {
            state
                .validator_registry
                .get(index as usize)
                .map_or(false, |v| {
                    !v.slashed && !v.is_withdrawable_at(state.current_epoch(spec))
                })
        })
        .cloned()
        .collect();

    verify!(!slashable.is_empty(), Invalid::NoSlashableIndices);
    Ok(slashable)
}

/// Verifies the shape and (optionally) the aggregate signature of one
/// slashable attestation.
pub fn verify_slashable_attestation(
    state: &BeaconState,
    slashable: &SlashableAttestation,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), SlashableInvalid> {
    verify!(
        !slashable.validator_indices.is_empty(),
        SlashableInvalid::NoValidatorIndices
    );
    verify!(
        slashable
            .validator_indices
            .windows(2)
            .all(|pair| pair[0] < pair[1]),
        SlashableInvalid::ValidatorIndicesNotSorted
    );

    for &index in &slashable.validator_indices {
        verify!(
            (index as usize) < state.validator_registry.len(),
            SlashableInvalid::UnknownValidator(index)
        );
    }

    if verify_signatures.is_true() {
        verify_slashable_signature(state, slashable, spec)?;
    }

    Ok(())
}

/// Splits the signers by custody bit and checks the aggregate over the two
/// resulting messages.
fn verify_slashable_signature(
    state: &BeaconState,
    slashable: &SlashableAttestation,
    spec: &ChainSpec,
) -> Result<(), SlashableInvalid> {
    let mut pubkey_bit_0 = AggregatePublicKey::new();
    let mut pubkey_bit_1 = AggregatePublicKey::new();
    for (position, &index) in slashable.validator_indices.iter().enumerate() {
        let pubkey = &state.validator_registry[index as usize].pubkey;
        if slashable.custody_bitfield.get(position) {
            pubkey_bit_1.add(pubkey);
        } else {
            pubkey_bit_0.add(pubkey);
        }
    }

    let message_bit_0 = AttestationDataAndCustodyBit {
        data: slashable.data.clone(),
        custody_bit: false,
    }
    .tree_hash_root();
    let message_bit_1 = AttestationDataAndCustodyBit {
        data: slashable.data.clone(),
        custody_bit: true,
    }
    .tree_hash_root();

    let mut messages: Vec<&[u8]> = vec![];
    let mut pubkeys: Vec<&AggregatePublicKey> = vec![];
    if !pubkey_bit_0.is_empty() {
        messages.push(&message_bit_0[..]);
        pubkeys.push(&pubkey_bit_0);
    }
    if !pubkey_bit_1.is_empty() {
        messages.push(&message_bit_1[..]);
        pubkeys.push(&pubkey_bit_1);
    }

    let domain = spec.get_domain(
        slashable.data.slot.epoch(spec.slots_per_epoch),
        Domain::Attestation,
        &state.fork,
    );

    verify!(
        slashable
            .aggregate_signature
            .verify_multiple(&messages, domain, &pubkeys),
        SlashableInvalid::BadSignature
    );

    Ok(())
}
