use types::*;

/// The object is invalid or the state is inconsistent with it.
#[derive(Debug, PartialEq)]
pub enum BlockProcessingError {
    HeaderInvalid(HeaderInvalid),
    RandaoSignatureInvalid,

    /// Per-block operation caps.
    MaxProposerSlashingsExceeded,
    MaxAttesterSlashingsExceeded,
    MaxAttestationsExceeded,
    MaxDepositsExceeded,
    MaxVoluntaryExitsExceeded,

    /// The first invalid operation aborts the block; the index says which.
    ProposerSlashingInvalid { index: usize, reason: ProposerSlashingInvalid },
    AttesterSlashingInvalid { index: usize, reason: AttesterSlashingInvalid },
    AttestationInvalid { index: usize, reason: AttestationInvalid },
    DepositInvalid { index: usize, reason: DepositInvalid },
    ExitInvalid { index: usize, reason: ExitInvalid },

    BeaconStateError(BeaconStateError),
}

#[derive(Debug, PartialEq)]
pub enum HeaderInvalid {
    StateSlotMismatch { block_slot: Slot, state_slot: Slot },
    ParentBlockRootMismatch { state: Hash256, block: Hash256 },
    ProposerSlashed(usize),
    BadSignature,
}

#[derive(Debug, PartialEq)]
pub enum ProposerSlashingInvalid {
    ProposerUnknown(u64),
    ProposalSlotMismatch(Slot, Slot),
    ProposalsIdentical,
    ProposerAlreadySlashed,
    BadHeader1Signature,
    BadHeader2Signature,
}

#[derive(Debug, PartialEq)]
pub enum AttesterSlashingInvalid {
    /// The two attestations are neither a double vote nor a surround vote.
    NotSlashable,
    /// No validator signed both attestations while still being slashable.
    NoSlashableIndices,
    SlashableAttestation1Invalid(SlashableAttestationInvalid),
    SlashableAttestation2Invalid(SlashableAttestationInvalid),
}

#[derive(Debug, PartialEq)]
pub enum SlashableAttestationInvalid {
    NoValidatorIndices,
    ValidatorIndicesNotSorted,
    UnknownValidator(u64),
    BadSignature,
}

#[derive(Debug, PartialEq)]
pub enum AttestationInvalid {
    IncludedTooEarly { state: Slot, delay: u64, attestation: Slot },
    IncludedTooLate { state: Slot, attestation: Slot },
    WrongJustifiedCheckpoint { state: Checkpoint, attestation: Checkpoint },
    BadPreviousCrosslink,
    ShardBlockRootNotZero,
    NoCommitteeForShard { shard: Shard, slot: Slot },
    /// Bitfields must be exactly as long as the committee they describe.
    BadBitfieldLength { committee_len: usize, bitfield_len: usize },
    /// Custody bits are all zero while the proof-of-custody game is
    /// unimplemented.
    CustodyBitfieldHasSetBits,
    BadSignature,
}

#[derive(Debug, PartialEq)]
pub enum DepositInvalid {
    /// Deposits apply in strict accumulator order, exactly once.
    BadIndex { state: u64, deposit: u64 },
    BadMerkleProof,
    BadSignature,
}

#[derive(Debug, PartialEq)]
pub enum ExitInvalid {
    ValidatorUnknown(u64),
    AlreadyExited,
    NotActive,
    FutureEpoch { state: Epoch, exit: Epoch },
    BadSignature,
}

impl From<BeaconStateError> for BlockProcessingError {
    fn from(e: BeaconStateError) -> Self {
        BlockProcessingError::BeaconStateError(e)
    }
}
