//! Types for the beacon chain: blocks, state, attestations, operations and
//! the chain parameters, plus the committee assignment logic that hangs off
//! the state.

#[macro_use]
pub mod slot_epoch_macros;

pub mod attestation;
pub mod attestation_data;
pub mod attestation_data_and_custody_bit;
pub mod attestation_duty;
pub mod attester_slashing;
pub mod beacon_block;
pub mod beacon_block_body;
pub mod beacon_block_header;
pub mod beacon_state;
pub mod chain_spec;
pub mod checkpoint;
pub mod crosslink;
pub mod deposit;
pub mod deposit_data;
pub mod eth1_data;
pub mod eth1_data_vote;
pub mod fork;
pub mod pending_attestation;
pub mod proposer_slashing;
pub mod slashable_attestation;
pub mod slot_epoch;
pub mod test_utils;
pub mod validator;
pub mod voluntary_exit;

pub use crate::attestation::Attestation;
pub use crate::attestation_data::AttestationData;
pub use crate::attestation_data_and_custody_bit::AttestationDataAndCustodyBit;
pub use crate::attestation_duty::AttestationDuty;
pub use crate::attester_slashing::AttesterSlashing;
pub use crate::beacon_block::BeaconBlock;
pub use crate::beacon_block_body::BeaconBlockBody;
pub use crate::beacon_block_header::BeaconBlockHeader;
pub use crate::beacon_state::{BeaconState, CrosslinkCommittee, Error as BeaconStateError};
pub use crate::chain_spec::{beacon_config, override_beacon_config, ChainSpec, Domain};
pub use crate::checkpoint::Checkpoint;
pub use crate::crosslink::Crosslink;
pub use crate::deposit::Deposit;
pub use crate::deposit_data::DepositData;
pub use crate::eth1_data::Eth1Data;
pub use crate::eth1_data_vote::Eth1DataVote;
pub use crate::fork::Fork;
pub use crate::pending_attestation::PendingAttestation;
pub use crate::proposer_slashing::ProposerSlashing;
pub use crate::slashable_attestation::SlashableAttestation;
pub use crate::slot_epoch::{Epoch, Slot};
pub use crate::validator::Validator;
pub use crate::voluntary_exit::VoluntaryExit;

use ethereum_types::{H160, H256};

pub type Hash256 = H256;
pub type Address = H160;
pub type Shard = u64;

/// A committee of validator indices, ordered ascending by registry index.
pub type Committee = Vec<usize>;

pub use bls::{
    AggregatePublicKey, AggregateSignature, Keypair, PublicKey, SecretKey, Signature,
};
pub use boolean_bitfield::Bitfield;
