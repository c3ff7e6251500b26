//! The beacon state transition: advancing a state slot-by-slot, applying a
//! block, and the epoch boundary accounting.
//!
//! Everything here is a pure function over `(state, block, spec)`; nothing
//! reads the clock or any external service.

#[macro_use]
mod macros;

pub mod common;
pub mod genesis;
pub mod per_block_processing;
pub mod per_epoch_processing;
pub mod per_slot_processing;
pub mod state_transition;

pub use genesis::get_genesis_beacon_state;
pub use per_block_processing::{
    errors::BlockProcessingError, per_block_processing, VerifySignatures,
};
pub use per_epoch_processing::{errors::EpochProcessingError, per_epoch_processing};
pub use per_slot_processing::{per_slot_processing, process_slots, SlotProcessingError};
pub use state_transition::{
    compute_state_root, state_transition, state_transition_without_verifying_signatures,
    StateTransitionError,
};
