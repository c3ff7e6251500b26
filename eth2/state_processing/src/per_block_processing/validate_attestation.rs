use super::errors::AttestationInvalid as Invalid;
use tree_hash::TreeHash;
use types::*;

/// Indicates if an `Attestation` is valid to be included in a block in the
/// current slot of the given state, including signature verification.
pub fn validate_attestation(
    state: &BeaconState,
    attestation: &Attestation,
    spec: &ChainSpec,
) -> Result<(), Invalid> {
    validate(state, attestation, spec, true)
}

/// As `validate_attestation`, without the aggregate signature check. The
/// bitfield shape is still validated against the committee.
pub fn validate_attestation_without_signature(
    state: &BeaconState,
    attestation: &Attestation,
    spec: &ChainSpec,
) -> Result<(), Invalid> {
    validate(state, attestation, spec, false)
}

/// The state-dependent checks and the signature, but not the inclusion
/// window. Used when an attestation enters the pending pool before any
/// block exists to include it.
pub fn validate_attestation_time_independent_only(
    state: &BeaconState,
    attestation: &Attestation,
    spec: &ChainSpec,
) -> Result<(), Invalid> {
    state_checks(state, attestation, spec)?;
    let participants = attestation_participants(state, attestation, spec)?;
    verify_attestation_signature(state, attestation, &participants, spec)
}

fn validate(
    state: &BeaconState,
    attestation: &Attestation,
    spec: &ChainSpec,
    verify_signature: bool,
) -> Result<(), Invalid> {
    let data = &attestation.data;

    // Inclusion window.
    verify!(
        data.slot + spec.min_attestation_inclusion_delay <= state.slot,
        Invalid::IncludedTooEarly {
            state: state.slot,
            delay: spec.min_attestation_inclusion_delay,
            attestation: data.slot,
        }
    );
    verify!(
        state.slot <= data.slot + spec.slots_per_epoch,
        Invalid::IncludedTooLate {
            state: state.slot,
            attestation: data.slot,
        }
    );

    state_checks(state, attestation, spec)?;
    let participants = attestation_participants(state, attestation, spec)?;

    if verify_signature {
        verify_attestation_signature(state, attestation, &participants, spec)?;
    }

    Ok(())
}

/// The checks an attestation must pass against the state regardless of when
/// it is included: FFG source, crosslink lineage and custody shape.
fn state_checks(
    state: &BeaconState,
    attestation: &Attestation,
    spec: &ChainSpec,
) -> Result<(), Invalid> {
    let data = &attestation.data;

    // The FFG source must match the justified checkpoint the state holds
    // for the attestation's target epoch.
    let expected_source = if data.slot.epoch(spec.slots_per_epoch) >= state.current_epoch(spec) {
        state.current_justified_checkpoint
    } else {
        state.previous_justified_checkpoint
    };
    verify!(
        data.source == expected_source,
        Invalid::WrongJustifiedCheckpoint {
            state: expected_source,
            attestation: data.source,
        }
    );

    // Crosslink vote must extend the crosslink the state knows.
    verify!(
        data.shard < spec.shard_count,
        Invalid::NoCommitteeForShard {
            shard: data.shard,
            slot: data.slot,
        }
    );
    verify!(
        data.previous_crosslink == state.latest_crosslinks[data.shard as usize],
        Invalid::BadPreviousCrosslink
    );
    verify!(
        data.crosslink_data_root == spec.zero_hash,
        Invalid::ShardBlockRootNotZero
    );

    verify!(
        attestation.custody_bitfield.is_zero(),
        Invalid::CustodyBitfieldHasSetBits
    );

    Ok(())
}

/// Resolves the aggregation bitfield against the committee, verifying its
/// shape along the way.
fn attestation_participants(
    state: &BeaconState,
    attestation: &Attestation,
    spec: &ChainSpec,
) -> Result<Vec<usize>, Invalid> {
    state
        .get_attestation_participants(&attestation.data, &attestation.aggregation_bitfield, spec)
        .map_err(|e| match e {
            BeaconStateError::BadBitfieldLength {
                committee_len,
                bitfield_len,
            } => Invalid::BadBitfieldLength {
                committee_len,
                bitfield_len,
            },
            _ => Invalid::NoCommitteeForShard {
                shard: attestation.data.shard,
                slot: attestation.data.slot,
            },
        })
}

/// Verifies the aggregate signature over `AttestationDataAndCustodyBit` for
/// the given participant set.
fn verify_attestation_signature(
    state: &BeaconState,
    attestation: &Attestation,
    participants: &[usize],
    spec: &ChainSpec,
) -> Result<(), Invalid> {
    let mut aggregate_pubkey = AggregatePublicKey::new();
    for &participant in participants {
        aggregate_pubkey.add(&state.validator_registry[participant].pubkey);
    }

    let message = AttestationDataAndCustodyBit {
        data: attestation.data.clone(),
        custody_bit: false,
    }
    .tree_hash_root();

    let domain = spec.get_domain(
        attestation.data.slot.epoch(spec.slots_per_epoch),
        Domain::Attestation,
        &state.fork,
    );

    verify!(
        attestation
            .aggregate_signature
            .verify(&message, domain, &aggregate_pubkey),
        Invalid::BadSignature
    );

    Ok(())
}
