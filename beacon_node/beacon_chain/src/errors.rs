use fork_choice::ForkChoiceError;
use state_processing::per_block_processing::errors::AttestationInvalid;
use state_processing::StateTransitionError;
use types::{BeaconStateError, Hash256};

#[derive(Debug, PartialEq)]
pub enum BeaconChainError {
    /// The block builds on a parent this node has never applied.
    ParentUnknown(Hash256),
    /// The block failed the state transition; it is invalid and nothing was
    /// stored.
    StateTransition(StateTransitionError),
    /// The attestation was rejected by the pool.
    InvalidAttestation(AttestationInvalid),
    MissingBlock(Hash256),
    MissingState(Hash256),
    ForkChoice(ForkChoiceError),
    Db(db::Error),
    BeaconState(BeaconStateError),
}

impl From<StateTransitionError> for BeaconChainError {
    fn from(e: StateTransitionError) -> Self {
        BeaconChainError::StateTransition(e)
    }
}

impl From<AttestationInvalid> for BeaconChainError {
    fn from(e: AttestationInvalid) -> Self {
        BeaconChainError::InvalidAttestation(e)
    }
}

impl From<ForkChoiceError> for BeaconChainError {
    fn from(e: ForkChoiceError) -> Self {
        BeaconChainError::ForkChoice(e)
    }
}

impl From<db::Error> for BeaconChainError {
    fn from(e: db::Error) -> Self {
        BeaconChainError::Db(e)
    }
}

impl From<BeaconStateError> for BeaconChainError {
    fn from(e: BeaconStateError) -> Self {
        BeaconChainError::BeaconState(e)
    }
}
