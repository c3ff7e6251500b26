//! A pool of pending operations awaiting inclusion in blocks: attestations
//! (aggregated as they arrive), proposer and attester slashings, and
//! voluntary exits.

mod attestation_id;

use attestation_id::AttestationId;
use futures::sync::mpsc;
use futures::{Future, Sink};
use parking_lot::{Mutex, RwLock};
use state_processing::per_block_processing::errors::{
    AttestationInvalid, AttesterSlashingInvalid, ExitInvalid, ProposerSlashingInvalid,
};
use state_processing::per_block_processing::{
    validate_attestation_time_independent_only, verify_attester_slashing,
    verify_exit, verify_proposer_slashing,
};
use state_processing::VerifySignatures;
use std::collections::{hash_map, HashMap};
use types::{
    Attestation, AttesterSlashing, BeaconState, ChainSpec, Hash256, ProposerSlashing, Slot,
    VoluntaryExit,
};

#[derive(Default)]
pub struct OperationPool {
    /// Map from attestation ID (see below) to vectors of attestations.
    attestations: RwLock<HashMap<AttestationId, Vec<Attestation>>>,
    /// Map from proposer index to slashing.
    proposer_slashings: RwLock<HashMap<u64, ProposerSlashing>>,
    attester_slashings: RwLock<Vec<AttesterSlashing>>,
    /// Map from exiting validator to their exit data.
    voluntary_exits: RwLock<HashMap<u64, VoluntaryExit>>,
    /// The rendezvous channel feeding the latest-attestation stream. One
    /// subscriber; a send completes only when the subscriber takes it.
    incoming_attestation_tx: Mutex<Option<mpsc::Sender<Attestation>>>,
}

impl OperationPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an attestation into the pool, aggregating it with an existing
    /// attestation when their signer sets are disjoint. Returns the
    /// attestation's root.
    pub fn insert_attestation(
        &self,
        attestation: Attestation,
        state: &BeaconState,
        spec: &ChainSpec,
    ) -> Result<Hash256, AttestationInvalid> {
        validate_attestation_time_independent_only(state, &attestation, spec)?;

        let id = AttestationId::from_data(&attestation.data);
        let root = attestation.canonical_root();
        let outgoing = attestation.clone();

        // The map lock is released before the subscriber hand-off below;
        // channel back-pressure must never hold up pool readers.
        {
            let mut attestations = self.attestations.write();
            match attestations.entry(id) {
                hash_map::Entry::Vacant(entry) => {
                    entry.insert(vec![attestation]);
                }
                hash_map::Entry::Occupied(entry) => {
                    let existing_attestations = entry.into_mut();

                    let mut aggregated = false;
                    for existing_attestation in existing_attestations.iter_mut() {
                        if existing_attestation.signers_disjoint_from(&attestation) {
                            existing_attestation.aggregate(&attestation);
                            aggregated = true;
                        } else if *existing_attestation == attestation {
                            aggregated = true;
                        }
                    }

                    // Overlapping-but-different signer sets cannot merge;
                    // both are retained.
                    if !aggregated {
                        existing_attestations.push(attestation);
                    }
                }
            }
        }

        self.notify_incoming(outgoing);
        Ok(root)
    }

    /// Total number of attestations in the pool, including attestations for
    /// the same data.
    pub fn num_attestations(&self) -> usize {
        self.attestations.read().values().map(Vec::len).sum()
    }

    /// The attestations ready to go into a block proposed at
    /// `proposal_slot`, ascending by slot, capped to the per-block limit.
    ///
    /// With `ready_for_inclusion` unset the inclusion-delay filter is
    /// skipped and everything pending is returned.
    pub fn pending_attestations(
        &self,
        ready_for_inclusion: bool,
        proposal_slot: Slot,
        spec: &ChainSpec,
    ) -> Vec<Attestation> {
        let mut pending: Vec<Attestation> = self
            .attestations
            .read()
            .values()
            .flatten()
            .filter(|a| {
                !ready_for_inclusion
                    || a.data.slot + spec.min_attestation_inclusion_delay <= proposal_slot
            })
            .cloned()
            .collect();
        pending.sort_by_key(|a| a.data.slot);
        pending.truncate(spec.max_attestations as usize);
        pending
    }

    /// Drops every attestation old enough to be sealed under the finalized
    /// state. Idempotent: a second prune with the same state is a no-op.
    pub fn prune_finalized_attestations(&self, finalized_state: &BeaconState) {
        self.attestations
            .write()
            .retain(|_, attestations| {
                attestations.first().map_or(false, |a| a.data.slot > finalized_state.slot)
            });
    }

    pub fn insert_proposer_slashing(
        &self,
        slashing: ProposerSlashing,
        state: &BeaconState,
        spec: &ChainSpec,
    ) -> Result<(), ProposerSlashingInvalid> {
        verify_proposer_slashing(state, &slashing, VerifySignatures::True, spec)?;
        self.proposer_slashings
            .write()
            .insert(slashing.proposer_index, slashing);
        Ok(())
    }

    /// Slashings still applicable against `state`, capped to the block
    /// limit.
    pub fn pending_proposer_slashings(
        &self,
        state: &BeaconState,
        spec: &ChainSpec,
    ) -> Vec<ProposerSlashing> {
        self.proposer_slashings
            .read()
            .values()
            .filter(|s| {
                verify_proposer_slashing(state, s, VerifySignatures::False, spec).is_ok()
            })
            .take(spec.max_proposer_slashings as usize)
            .cloned()
            .collect()
    }

    pub fn insert_attester_slashing(
        &self,
        slashing: AttesterSlashing,
        state: &BeaconState,
        spec: &ChainSpec,
    ) -> Result<(), AttesterSlashingInvalid> {
        verify_attester_slashing(state, &slashing, VerifySignatures::True, spec)?;
        self.attester_slashings.write().push(slashing);
        Ok(())
    }

    pub fn pending_attester_slashings(
        &self,
        state: &BeaconState,
        spec: &ChainSpec,
    ) -> Vec<AttesterSlashing> {
        self.attester_slashings
            .read()
            .iter()
            .filter(|s| {
                verify_attester_slashing(state, s, VerifySignatures::False, spec).is_ok()
            })
            .take(spec.max_attester_slashings as usize)
            .cloned()
            .collect()
    }

    pub fn insert_voluntary_exit(
        &self,
        exit: VoluntaryExit,
        state: &BeaconState,
        spec: &ChainSpec,
    ) -> Result<(), ExitInvalid> {
        verify_exit(state, &exit, VerifySignatures::True, spec)?;
        self.voluntary_exits
            .write()
            .insert(exit.validator_index, exit);
        Ok(())
    }

    pub fn pending_voluntary_exits(
        &self,
        state: &BeaconState,
        spec: &ChainSpec,
    ) -> Vec<VoluntaryExit> {
        self.voluntary_exits
            .read()
            .values()
            .filter(|e| verify_exit(state, e, VerifySignatures::False, spec).is_ok())
            .take(spec.max_voluntary_exits as usize)
            .cloned()
            .collect()
    }

    /// Registers the single reader of the incoming-attestation stream,
    /// displacing any previous one.
    pub fn register_attestation_subscriber(&self) -> mpsc::Receiver<Attestation> {
        let (tx, rx) = mpsc::channel(0);
        *self.incoming_attestation_tx.lock() = Some(tx);
        rx
    }

    /// Hands the newest aggregate to the subscriber, blocking until it is
    /// taken. The back-pressure is deliberate: a slow stream consumer slows
    /// the pool's notification path, never drops a value.
    fn notify_incoming(&self, attestation: Attestation) {
        let mut guard = self.incoming_attestation_tx.lock();
        if let Some(tx) = guard.take() {
            match tx.send(attestation).wait() {
                Ok(tx) => *guard = Some(tx),
                // The subscriber hung up; the next one re-registers.
                Err(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::Stream;
    use state_processing::per_block_processing::errors::AttestationInvalid;
    use tree_hash::{SignedRoot, TreeHash};
    use types::test_utils::TestingBeaconStateBuilder;
    use types::*;

    fn pool_fixture() -> (OperationPool, BeaconState, Vec<Keypair>, ChainSpec) {
        let spec = ChainSpec::few_validators();
        let (state, keypairs) = TestingBeaconStateBuilder::from_default_keypairs(16, &spec).build();
        (OperationPool::new(), state, keypairs, spec)
    }

    /// A properly signed aggregate over the first committee at `slot`,
    /// signed by the committee members at the given positions.
    fn signed_attestation(
        state: &BeaconState,
        keypairs: &[Keypair],
        slot: Slot,
        signers: &[usize],
        spec: &ChainSpec,
    ) -> Attestation {
        let committees = state.get_crosslink_committees_at_slot(slot, spec).unwrap();
        let committee = &committees[0];

        let data = AttestationData {
            slot,
            beacon_block_root: Hash256::zero(),
            source: state.current_justified_checkpoint,
            target: Checkpoint {
                epoch: slot.epoch(spec.slots_per_epoch),
                root: Hash256::zero(),
            },
            shard: committee.shard,
            previous_crosslink: state.latest_crosslinks[committee.shard as usize].clone(),
            crosslink_data_root: spec.zero_hash,
        };

        let message = AttestationDataAndCustodyBit {
            data: data.clone(),
            custody_bit: false,
        }
        .tree_hash_root();
        let domain = spec.get_domain(
            slot.epoch(spec.slots_per_epoch),
            Domain::Attestation,
            &state.fork,
        );

        let mut aggregation_bitfield = Bitfield::with_capacity(committee.committee.len());
        let mut aggregate_signature = AggregateSignature::new();
        for &position in signers {
            aggregation_bitfield.set(position, true);
            let validator_index = committee.committee[position];
            aggregate_signature.add(&Signature::new(
                &message,
                domain,
                &keypairs[validator_index].sk,
            ));
        }

        Attestation {
            aggregation_bitfield,
            data,
            custody_bitfield: Bitfield::with_capacity(committee.committee.len()),
            aggregate_signature,
        }
    }

    #[test]
    fn disjoint_attestations_aggregate() {
        let (pool, state, keypairs, spec) = pool_fixture();

        let a = signed_attestation(&state, &keypairs, Slot::new(1), &[0], &spec);
        let b = signed_attestation(&state, &keypairs, Slot::new(1), &[1], &spec);

        pool.insert_attestation(a, &state, &spec).unwrap();
        pool.insert_attestation(b, &state, &spec).unwrap();

        assert_eq!(pool.num_attestations(), 1);
        let pending = pool.pending_attestations(false, Slot::new(0), &spec);
        assert!(pending[0].aggregation_bitfield.get(0));
        assert!(pending[0].aggregation_bitfield.get(1));
    }

    #[test]
    fn overlapping_attestations_are_kept_apart() {
        let (pool, state, keypairs, spec) = pool_fixture();

        let a = signed_attestation(&state, &keypairs, Slot::new(1), &[0], &spec);
        let b = signed_attestation(&state, &keypairs, Slot::new(1), &[0, 1], &spec);

        pool.insert_attestation(a, &state, &spec).unwrap();
        pool.insert_attestation(b, &state, &spec).unwrap();

        assert_eq!(pool.num_attestations(), 2);
    }

    #[test]
    fn wrong_source_is_rejected() {
        let (pool, state, keypairs, spec) = pool_fixture();

        let mut attestation = signed_attestation(&state, &keypairs, Slot::new(1), &[0], &spec);
        attestation.data.source = Checkpoint {
            epoch: Epoch::new(9),
            root: Hash256::zero(),
        };

        match pool.insert_attestation(attestation, &state, &spec) {
            Err(AttestationInvalid::WrongJustifiedCheckpoint { .. }) => {}
            other => panic!("expected justified checkpoint mismatch, got {:?}", other),
        }
    }

    #[test]
    fn inclusion_delay_gates_pending() {
        let (pool, state, keypairs, spec) = pool_fixture();

        let attestation = signed_attestation(&state, &keypairs, Slot::new(1), &[0], &spec);
        pool.insert_attestation(attestation, &state, &spec).unwrap();

        let too_soon = Slot::new(1 + spec.min_attestation_inclusion_delay - 1);
        assert!(pool.pending_attestations(true, too_soon, &spec).is_empty());

        let ready = Slot::new(1 + spec.min_attestation_inclusion_delay);
        assert_eq!(pool.pending_attestations(true, ready, &spec).len(), 1);

        // Without the flag, everything pending is returned.
        assert_eq!(pool.pending_attestations(false, too_soon, &spec).len(), 1);
    }

    #[test]
    fn pending_sorts_ascending_by_slot() {
        let (pool, state, keypairs, spec) = pool_fixture();

        for slot in &[3u64, 1, 2] {
            let attestation =
                signed_attestation(&state, &keypairs, Slot::new(*slot), &[0], &spec);
            pool.insert_attestation(attestation, &state, &spec).unwrap();
        }

        let slots: Vec<u64> = pool
            .pending_attestations(false, Slot::new(0), &spec)
            .iter()
            .map(|a| a.data.slot.as_u64())
            .collect();
        assert_eq!(slots, vec![1, 2, 3]);
    }

    #[test]
    fn prune_drops_finalized_attestations() {
        let (pool, state, keypairs, spec) = pool_fixture();

        for slot in &[1u64, 5] {
            let attestation =
                signed_attestation(&state, &keypairs, Slot::new(*slot), &[0], &spec);
            pool.insert_attestation(attestation, &state, &spec).unwrap();
        }

        let mut finalized_state = state.clone();
        finalized_state.slot = Slot::new(4);
        pool.prune_finalized_attestations(&finalized_state);
        assert_eq!(pool.num_attestations(), 1);

        // A second prune with the same state changes nothing.
        pool.prune_finalized_attestations(&finalized_state);
        assert_eq!(pool.num_attestations(), 1);
    }

    #[test]
    fn voluntary_exit_round_trip() {
        let (pool, state, keypairs, spec) = pool_fixture();

        let mut exit = VoluntaryExit {
            epoch: Epoch::new(0),
            validator_index: 3,
            signature: Signature::empty_signature(),
        };
        let domain = spec.get_domain(exit.epoch, Domain::Exit, &state.fork);
        exit.signature = Signature::new(&exit.signed_root(), domain, &keypairs[3].sk);

        pool.insert_voluntary_exit(exit, &state, &spec).unwrap();
        assert_eq!(pool.pending_voluntary_exits(&state, &spec).len(), 1);

        // Once the validator has initiated an exit the pool stops offering
        // the operation.
        let mut exited = state.clone();
        exited.validator_registry[3].exit_epoch = Epoch::new(1);
        assert!(pool.pending_voluntary_exits(&exited, &spec).is_empty());
    }

    #[test]
    fn proposer_slashing_round_trip() {
        let (pool, state, keypairs, spec) = pool_fixture();
        let proposer_index = 2u64;

        let build_header = |label: u64| {
            let mut header = BeaconBlockHeader {
                slot: Slot::new(5),
                parent_root: Hash256::zero(),
                state_root: Hash256::from_low_u64_be(label),
                body_root: Hash256::zero(),
                signature: Signature::empty_signature(),
            };
            let domain = spec.get_domain(
                header.slot.epoch(spec.slots_per_epoch),
                Domain::Proposal,
                &state.fork,
            );
            header.signature = Signature::new(
                &header.signed_root(),
                domain,
                &keypairs[proposer_index as usize].sk,
            );
            header
        };

        let slashing = ProposerSlashing {
            proposer_index,
            header_1: build_header(1),
            header_2: build_header(2),
        };

        pool.insert_proposer_slashing(slashing, &state, &spec).unwrap();
        assert_eq!(pool.pending_proposer_slashings(&state, &spec).len(), 1);

        // Already-slashed proposers are filtered out of templates.
        let mut slashed = state.clone();
        slashed.validator_registry[proposer_index as usize].slashed = true;
        assert!(pool.pending_proposer_slashings(&slashed, &spec).is_empty());
    }

    #[test]
    fn incoming_channel_delivers_each_aggregate_once() {
        let (pool, state, keypairs, spec) = pool_fixture();
        let rx = pool.register_attestation_subscriber();

        let a = signed_attestation(&state, &keypairs, Slot::new(1), &[0], &spec);
        let b = signed_attestation(&state, &keypairs, Slot::new(2), &[0], &spec);

        let pool = std::sync::Arc::new(pool);
        let writer = {
            let pool = pool.clone();
            let state = state.clone();
            let spec = spec.clone();
            std::thread::spawn(move || {
                pool.insert_attestation(a, &state, &spec).unwrap();
                pool.insert_attestation(b, &state, &spec).unwrap();
            })
        };

        let received: Vec<Attestation> = rx.wait().take(2).map(|r| r.unwrap()).collect();
        writer.join().unwrap();

        assert_eq!(received.len(), 2);
        assert_eq!(received[0].data.slot, Slot::new(1));
        assert_eq!(received[1].data.slot, Slot::new(2));
    }
}
