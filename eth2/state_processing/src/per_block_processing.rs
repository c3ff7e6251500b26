use crate::common::{initiate_validator_exit, process_deposit, slash_validator};
use self::errors::*;
use eth2_hashing::hash;
use int_to_bytes::int_to_bytes32;
use tree_hash::SignedRoot;
use types::*;

pub use self::verify_attester_slashing::{
    gather_slashable_indices, verify_attester_slashing, verify_slashable_attestation,
};
pub use self::validate_attestation::{
    validate_attestation, validate_attestation_time_independent_only,
    validate_attestation_without_signature,
};
pub use self::verify_deposit::verify_deposit;
pub use self::verify_exit::verify_exit;
pub use self::verify_proposer_slashing::verify_proposer_slashing;

pub mod errors;
mod validate_attestation;
mod verify_attester_slashing;
mod verify_deposit;
mod verify_exit;
mod verify_proposer_slashing;

/// The strategy to be used when validating the block's signatures.
#[derive(PartialEq, Clone, Copy)]
pub enum VerifySignatures {
    /// Validate all signatures encountered.
    True,
    /// Do not validate any signature. Only for state-root computation over
    /// self-built blocks.
    False,
}

impl VerifySignatures {
    pub fn is_true(self) -> bool {
        self == VerifySignatures::True
    }
}

/// Updates the state for a new block, whilst validating that the block is
/// valid.
///
/// Body operations apply in a fixed order: proposer slashings, attester
/// slashings, attestations, deposits, voluntary exits. Each kind has a
/// per-block maximum, each item is individually verified, and the first
/// failure aborts with the operation kind, index and cause.
pub fn per_block_processing(
    state: &mut BeaconState,
    block: &BeaconBlock,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    process_block_header(state, block, verify_signatures, spec)?;
    process_randao(state, block, verify_signatures, spec)?;
    process_eth1_data(state, &block.body.eth1_data);
    process_proposer_slashings(state, &block.body.proposer_slashings, verify_signatures, spec)?;
    process_attester_slashings(state, &block.body.attester_slashings, verify_signatures, spec)?;
    process_attestations(state, &block.body.attestations, verify_signatures, spec)?;
    process_deposits(state, &block.body.deposits, spec)?;
    process_exits(state, &block.body.voluntary_exits, verify_signatures, spec)?;

    Ok(())
}

/// Processes the block header, rolling the new block into
/// `state.latest_block_header` with its state root unsealed.
pub fn process_block_header(
    state: &mut BeaconState,
    block: &BeaconBlock,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    verify!(
        block.slot == state.slot,
        BlockProcessingError::HeaderInvalid(HeaderInvalid::StateSlotMismatch {
            block_slot: block.slot,
            state_slot: state.slot,
        })
    );

    let expected_parent_root = state.latest_block_header.canonical_root();
    verify!(
        block.parent_root == expected_parent_root,
        BlockProcessingError::HeaderInvalid(HeaderInvalid::ParentBlockRootMismatch {
            state: expected_parent_root,
            block: block.parent_root,
        })
    );

    let proposer_index = state.get_beacon_proposer_index(block.slot, spec)?;
    verify!(
        !state.validator_registry[proposer_index].slashed,
        BlockProcessingError::HeaderInvalid(HeaderInvalid::ProposerSlashed(proposer_index))
    );

    if verify_signatures.is_true() {
        let proposer = &state.validator_registry[proposer_index];
        let domain = spec.get_domain(
            block.slot.epoch(spec.slots_per_epoch),
            Domain::Proposal,
            &state.fork,
        );
        verify!(
            block
                .signature
                .verify(&block.signed_root(), domain, &proposer.pubkey),
            BlockProcessingError::HeaderInvalid(HeaderInvalid::BadSignature)
        );
    }

    state.latest_block_header = block.temporary_block_header(spec);

    Ok(())
}

/// Verifies the randao reveal against the proposer and folds it into the
/// current epoch's mix.
pub fn process_randao(
    state: &mut BeaconState,
    block: &BeaconBlock,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    let current_epoch = state.current_epoch(spec);

    if verify_signatures.is_true() {
        let proposer_index = state.get_beacon_proposer_index(block.slot, spec)?;
        let proposer = &state.validator_registry[proposer_index];
        let domain = spec.get_domain(current_epoch, Domain::Randao, &state.fork);
        verify!(
            block.body.randao_reveal.verify(
                &int_to_bytes32(current_epoch.as_u64()),
                domain,
                &proposer.pubkey,
            ),
            BlockProcessingError::RandaoSignatureInvalid
        );
    }

    let contribution = Hash256::from_slice(&hash(&block.body.randao_reveal.as_bytes()));
    state.update_randao_mix(current_epoch, contribution, spec);

    Ok(())
}

/// Tallies the block's ETH1 vote into the state's voting queue.
pub fn process_eth1_data(state: &mut BeaconState, eth1_data: &Eth1Data) {
    for vote in state.eth1_data_votes.iter_mut() {
        if &vote.eth1_data == eth1_data {
            vote.vote_count += 1;
            return;
        }
    }

    state.eth1_data_votes.push(Eth1DataVote {
        eth1_data: eth1_data.clone(),
        vote_count: 1,
    });
}

pub fn process_proposer_slashings(
    state: &mut BeaconState,
    proposer_slashings: &[ProposerSlashing],
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    verify!(
        proposer_slashings.len() as u64 <= spec.max_proposer_slashings,
        BlockProcessingError::MaxProposerSlashingsExceeded
    );

    for (index, slashing) in proposer_slashings.iter().enumerate() {
        verify_proposer_slashing(state, slashing, verify_signatures, spec)
            .map_err(|reason| BlockProcessingError::ProposerSlashingInvalid { index, reason })?;
        slash_validator(state, slashing.proposer_index as usize, spec)?;
    }

    Ok(())
}

pub fn process_attester_slashings(
    state: &mut BeaconState,
    attester_slashings: &[AttesterSlashing],
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    verify!(
        attester_slashings.len() as u64 <= spec.max_attester_slashings,
        BlockProcessingError::MaxAttesterSlashingsExceeded
    );

    for (index, slashing) in attester_slashings.iter().enumerate() {
        verify_attester_slashing(state, slashing, verify_signatures, spec)
            .map_err(|reason| BlockProcessingError::AttesterSlashingInvalid { index, reason })?;

        let slashable_indices = gather_slashable_indices(state, slashing, spec)
            .map_err(|reason| BlockProcessingError::AttesterSlashingInvalid { index, reason })?;
        for validator_index in slashable_indices {
            slash_validator(state, validator_index as usize, spec)?;
        }
    }

    Ok(())
}

pub fn process_attestations(
    state: &mut BeaconState,
    attestations: &[Attestation],
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    verify!(
        attestations.len() as u64 <= spec.max_attestations,
        BlockProcessingError::MaxAttestationsExceeded
    );

    for (index, attestation) in attestations.iter().enumerate() {
        if verify_signatures.is_true() {
            validate_attestation(state, attestation, spec)
        } else {
            validate_attestation_without_signature(state, attestation, spec)
        }
        .map_err(|reason| BlockProcessingError::AttestationInvalid { index, reason })?;

        let pending = PendingAttestation {
            aggregation_bitfield: attestation.aggregation_bitfield.clone(),
            data: attestation.data.clone(),
            custody_bitfield: attestation.custody_bitfield.clone(),
            inclusion_slot: state.slot,
        };

        let attestation_epoch = attestation.data.slot.epoch(spec.slots_per_epoch);
        if attestation_epoch == state.current_epoch(spec) {
            state.current_epoch_attestations.push(pending);
        } else {
            state.previous_epoch_attestations.push(pending);
        }
    }

    Ok(())
}

pub fn process_deposits(
    state: &mut BeaconState,
    deposits: &[Deposit],
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    verify!(
        deposits.len() as u64 <= spec.max_deposits,
        BlockProcessingError::MaxDepositsExceeded
    );

    for (index, deposit) in deposits.iter().enumerate() {
        verify_deposit(state, deposit, spec)
            .map_err(|reason| BlockProcessingError::DepositInvalid { index, reason })?;
        process_deposit(state, deposit, spec);
    }

    Ok(())
}

pub fn process_exits(
    state: &mut BeaconState,
    voluntary_exits: &[VoluntaryExit],
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    verify!(
        voluntary_exits.len() as u64 <= spec.max_voluntary_exits,
        BlockProcessingError::MaxVoluntaryExitsExceeded
    );

    for (index, exit) in voluntary_exits.iter().enumerate() {
        verify_exit(state, exit, verify_signatures, spec)
            .map_err(|reason| BlockProcessingError::ExitInvalid { index, reason })?;
        initiate_validator_exit(state, exit.validator_index as usize, spec);
    }

    Ok(())
}
