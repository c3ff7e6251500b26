use types::BeaconStateError;

#[derive(Debug, PartialEq)]
pub enum EpochProcessingError {
    /// The status table and the registry disagree on length; the state is
    /// inconsistent.
    ValidatorStatusesInconsistent,
    BeaconStateError(BeaconStateError),
}

impl From<BeaconStateError> for EpochProcessingError {
    fn from(e: BeaconStateError) -> Self {
        EpochProcessingError::BeaconStateError(e)
    }
}
