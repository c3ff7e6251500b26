use crate::{BeaconChainError as Error, CheckPoint};
use db::{BeaconDB, Store};
use eth1::{ChainStartLatch, Eth1Observer};
use fork_choice::{AttestationTarget, BlockTreeNode, ForkChoice, LmdGhost};
use futures::sync::mpsc;
use operation_pool::OperationPool;
use parking_lot::{Mutex, RwLock};
use slog::{debug, info, trace, Logger};
use state_processing::{compute_state_root, state_transition};
use std::sync::Arc;
use types::*;

/// The core service of the node: owns the canonical head and every path
/// that can move it.
pub struct BeaconChain<S: Store, E: Eth1Observer> {
    pub spec: ChainSpec,
    pub db: Arc<BeaconDB<S>>,
    pub op_pool: Arc<OperationPool>,
    pub eth1: Arc<E>,
    pub chain_start: Arc<ChainStartLatch>,
    fork_choice: Mutex<LmdGhost<S>>,
    canonical_head: RwLock<CheckPoint>,
    justified_checkpoint: RwLock<Checkpoint>,
    finalized_checkpoint: RwLock<Checkpoint>,
    /// Head-update tick channels feeding the activation watchers. A full
    /// channel is skipped, not waited on; ticks coalesce.
    state_update_txs: Mutex<Vec<mpsc::Sender<()>>>,
    log: Logger,
}

impl<S: Store, E: Eth1Observer> BeaconChain<S, E> {
    /// Bootstraps a chain whose genesis state has just been derived from
    /// the chain-start deposits.
    pub fn from_genesis(
        db: Arc<BeaconDB<S>>,
        op_pool: Arc<OperationPool>,
        eth1: Arc<E>,
        chain_start: Arc<ChainStartLatch>,
        genesis_state: BeaconState,
        spec: ChainSpec,
        log: Logger,
    ) -> Result<Self, Error> {
        let mut genesis_block = BeaconBlock::empty(&spec);
        genesis_block.state_root = genesis_state.canonical_root();
        let genesis_root = db.save_block(&genesis_block)?;

        db.save_state(&genesis_state)?;
        db.save_historical_state(&genesis_state, genesis_root)?;
        db.save_justified_block(&genesis_block)?;
        db.save_justified_state(&genesis_state)?;
        db.save_finalized_block(&genesis_block)?;
        db.save_finalized_state(&genesis_state)?;
        db.update_chain_head(&genesis_block, &genesis_state)?;

        let fork_choice = LmdGhost::new(
            db.clone(),
            &genesis_block,
            genesis_state.clone(),
            spec.clone(),
        );

        info!(
            log,
            "Beacon chain initialized";
            "genesis_root" => format!("{:?}", genesis_root),
            "validators" => genesis_state.validator_registry.len(),
        );

        Ok(Self {
            spec,
            db,
            op_pool,
            eth1,
            chain_start,
            fork_choice: Mutex::new(fork_choice),
            justified_checkpoint: RwLock::new(genesis_state.current_justified_checkpoint),
            finalized_checkpoint: RwLock::new(genesis_state.finalized_checkpoint),
            canonical_head: RwLock::new(CheckPoint::new(genesis_block, genesis_state)),
            state_update_txs: Mutex::new(vec![]),
            log,
        })
    }

    /// A consistent snapshot of the canonical head.
    pub fn head(&self) -> CheckPoint {
        self.canonical_head.read().clone()
    }

    /// Applies a block received from the network or a proposer: state
    /// transition, storage, fork choice, head update. Returns the block
    /// root.
    ///
    /// Nothing is written unless the transition succeeds, so an invalid
    /// block cannot corrupt the store.
    pub fn process_block(&self, block: &BeaconBlock) -> Result<Hash256, Error> {
        let parent_root = block.parent_root;
        let mut state = self
            .db
            .get_historical_state(&parent_root)?
            .ok_or(Error::ParentUnknown(parent_root))?;

        state_transition(&mut state, block, &self.spec)?;

        let block_root = self.db.save_block(block)?;
        self.db.save_historical_state(&state, block_root)?;
        self.db.save_state(&state)?;

        {
            let mut fork_choice = self.fork_choice.lock();
            fork_choice.add_block(block, block_root)?;

            // The block's attestations move targets too.
            for attestation in &block.body.attestations {
                self.apply_attestation_targets(&mut fork_choice, attestation, &state);
            }
        }

        self.update_finality(&state)?;
        self.update_canonical_head()?;

        debug!(
            self.log,
            "Processed beacon block";
            "slot" => block.slot.as_u64(),
            "root" => format!("{:?}", block_root),
        );

        Ok(block_root)
    }

    /// Accepts an aggregated attestation: pool insertion (which feeds the
    /// latest-attestation stream), fork-choice targets, head update.
    /// Returns the attestation root.
    pub fn process_attestation(&self, attestation: Attestation) -> Result<Hash256, Error> {
        let head = self.head();

        let root = self
            .op_pool
            .insert_attestation(attestation.clone(), &head.beacon_state, &self.spec)?;

        {
            let mut fork_choice = self.fork_choice.lock();
            self.apply_attestation_targets(&mut fork_choice, &attestation, &head.beacon_state);
        }
        self.update_canonical_head()?;

        trace!(
            self.log,
            "Processed attestation";
            "slot" => attestation.data.slot.as_u64(),
            "shard" => attestation.data.shard,
        );

        Ok(root)
    }

    /// Records the latest-target of every participant of `attestation`.
    /// Monotonicity is enforced inside fork choice, under its lock.
    fn apply_attestation_targets(
        &self,
        fork_choice: &mut LmdGhost<S>,
        attestation: &Attestation,
        state: &BeaconState,
    ) {
        let participants = match state.get_attestation_participants(
            &attestation.data,
            &attestation.aggregation_bitfield,
            &self.spec,
        ) {
            Ok(participants) => participants,
            Err(_) => return,
        };

        let parent_root = self
            .db
            .get_block(&attestation.data.beacon_block_root)
            .ok()
            .and_then(|block| block.map(|b| b.parent_root))
            .unwrap_or_else(Hash256::zero);

        for participant in participants {
            fork_choice.add_attestation_target(
                participant as u64,
                AttestationTarget {
                    slot: attestation.data.slot,
                    block_root: attestation.data.beacon_block_root,
                    parent_root,
                },
            );
        }
    }

    /// Advances the stored justified/finalized pointers when a post-state
    /// moved them, re-rooting and pruning fork choice accordingly.
    fn update_finality(&self, post_state: &BeaconState) -> Result<(), Error> {
        let stored_justified = self.justified_checkpoint.read().epoch;
        if post_state.current_justified_checkpoint.epoch > stored_justified {
            let root = post_state.current_justified_checkpoint.root;
            if let (Some(block), Some(state)) = (
                self.db.get_block(&root)?,
                self.db.get_historical_state(&root)?,
            ) {
                self.db.save_justified_block(&block)?;
                self.db.save_justified_state(&state)?;
                self.fork_choice.lock().update_justified(&block, state);
                *self.justified_checkpoint.write() = post_state.current_justified_checkpoint;
            }
        }

        let stored_finalized = self.finalized_checkpoint.read().epoch;
        if post_state.finalized_checkpoint.epoch > stored_finalized {
            let root = post_state.finalized_checkpoint.root;
            if let (Some(block), Some(state)) = (
                self.db.get_block(&root)?,
                self.db.get_historical_state(&root)?,
            ) {
                info!(
                    self.log,
                    "Finalized checkpoint advanced";
                    "epoch" => post_state.finalized_checkpoint.epoch.as_u64(),
                );
                self.db.save_finalized_block(&block)?;
                self.db.save_finalized_state(&state)?;
                self.fork_choice.lock().update_finalized(root)?;
                self.op_pool.prune_finalized_attestations(&state);
                // Deposits sealed under the finalized state leave the
                // pending set for good.
                for index in 0..state.deposit_index {
                    self.db.remove_pending_deposit(index);
                }
                *self.finalized_checkpoint.write() = post_state.finalized_checkpoint;
            }
        }

        Ok(())
    }

    /// Re-runs the GHOST walk and publishes the winning block as the head.
    fn update_canonical_head(&self) -> Result<(), Error> {
        let head_root = self.fork_choice.lock().find_head()?;

        if head_root == self.head().beacon_block_root {
            return Ok(());
        }

        let head_block = self
            .db
            .get_block(&head_root)?
            .ok_or(Error::MissingBlock(head_root))?;
        let head_state = self
            .db
            .get_historical_state(&head_root)?
            .ok_or(Error::MissingState(head_root))?;

        self.db.update_chain_head(&head_block, &head_state)?;
        *self.canonical_head.write() = CheckPoint::new(head_block, head_state);
        self.notify_state_update();

        Ok(())
    }

    /// The data a validator should attest with right now, for `shard`.
    pub fn produce_attestation_data(&self, shard: Shard) -> Result<AttestationData, Error> {
        if shard >= self.spec.shard_count {
            return Err(Error::BeaconState(BeaconStateError::ShardOutOfBounds));
        }
        let head = self.head();

        Ok(AttestationData {
            slot: head.beacon_state.slot,
            beacon_block_root: head.beacon_block_root,
            source: head.beacon_state.current_justified_checkpoint,
            target: Checkpoint {
                epoch: head.beacon_state.current_epoch(&self.spec),
                root: head.beacon_block_root,
            },
            shard,
            previous_crosslink: head.beacon_state.latest_crosslinks[shard as usize].clone(),
            crosslink_data_root: self.spec.zero_hash,
        })
    }

    /// The state root a block proposed on top of our chain would commit to.
    pub fn produce_state_root(&self, block: &BeaconBlock) -> Result<Hash256, Error> {
        let state = self
            .db
            .get_historical_state(&block.parent_root)?
            .ok_or(Error::ParentUnknown(block.parent_root))?;
        Ok(compute_state_root(&state, block, &self.spec)?)
    }

    /// The vote-annotated block tree from the last finalized block forward.
    pub fn block_tree(
        &self,
        from_slot: Option<Slot>,
        to_slot: Option<Slot>,
    ) -> Result<Vec<BlockTreeNode>, Error> {
        Ok(self.fork_choice.lock().block_tree(from_slot, to_slot)?)
    }

    /// A tick stream that fires whenever the canonical head (and therefore
    /// the state) changes. Used by the activation watchers.
    pub fn subscribe_state_updates(&self) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel(1);
        self.state_update_txs.lock().push(tx);
        rx
    }

    fn notify_state_update(&self) {
        self.state_update_txs
            .lock()
            .retain(|tx| match tx.clone().try_send(()) {
                Ok(()) => true,
                Err(e) if e.is_full() => true,
                // Receiver hung up.
                Err(_) => false,
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::MemoryStore;
    use eth1::MockEth1Observer;
    use int_to_bytes::int_to_bytes32;
    use slog::o;
    use state_processing::process_slots;
    use tree_hash::{SignedRoot, TreeHash};
    use types::test_utils::TestingBeaconStateBuilder;

    type TestChain = BeaconChain<MemoryStore, MockEth1Observer>;

    fn test_chain() -> (TestChain, Vec<Keypair>) {
        let spec = ChainSpec::few_validators();
        let (genesis_state, keypairs) =
            TestingBeaconStateBuilder::from_default_keypairs(16, &spec).build();

        let chain = BeaconChain::from_genesis(
            Arc::new(BeaconDB::new(MemoryStore::open())),
            Arc::new(OperationPool::new()),
            Arc::new(MockEth1Observer::new()),
            Arc::new(ChainStartLatch::new()),
            genesis_state,
            spec,
            slog::Logger::root(slog::Discard, o!()),
        )
        .unwrap();

        (chain, keypairs)
    }

    /// A fully signed empty block extending the current head at `slot`.
    fn block_on_head(chain: &TestChain, keypairs: &[Keypair], slot: Slot) -> BeaconBlock {
        let spec = &chain.spec;
        let head = chain.head();

        let mut advanced = head.beacon_state.clone();
        process_slots(&mut advanced, slot, spec).unwrap();
        let proposer_index = advanced.get_beacon_proposer_index(slot, spec).unwrap();
        let keypair = &keypairs[proposer_index];
        let epoch = slot.epoch(spec.slots_per_epoch);

        let mut block = BeaconBlock::empty(spec);
        block.slot = slot;
        block.parent_root = advanced.latest_block_header.canonical_root();
        block.body.randao_reveal = Signature::new(
            &int_to_bytes32(epoch.as_u64()),
            spec.get_domain(epoch, Domain::Randao, &advanced.fork),
            &keypair.sk,
        );
        block.state_root = chain.produce_state_root(&block).unwrap();
        let domain = spec.get_domain(epoch, Domain::Proposal, &advanced.fork);
        block.signature = Signature::new(&block.signed_root(), domain, &keypair.sk);
        block
    }

    #[test]
    fn genesis_is_the_first_head() {
        let (chain, _) = test_chain();
        let head = chain.head();

        assert_eq!(head.beacon_block.slot, chain.spec.genesis_slot);
        assert_eq!(
            chain.db.chain_head().unwrap().unwrap().canonical_root(),
            head.beacon_block_root
        );
    }

    #[test]
    fn processing_a_block_moves_the_head() {
        let (chain, keypairs) = test_chain();

        let block = block_on_head(&chain, &keypairs, Slot::new(1));
        let root = chain.process_block(&block).unwrap();

        let head = chain.head();
        assert_eq!(head.beacon_block_root, root);
        assert_eq!(head.beacon_state.slot, Slot::new(1));
        // The stored head observes the same post-state.
        assert_eq!(
            chain.db.head_state().unwrap().unwrap(),
            head.beacon_state
        );
    }

    #[test]
    fn chain_of_blocks_extends() {
        let (chain, keypairs) = test_chain();

        let first = block_on_head(&chain, &keypairs, Slot::new(1));
        chain.process_block(&first).unwrap();
        // Slot 2 is skipped entirely.
        let second = block_on_head(&chain, &keypairs, Slot::new(3));
        let second_root = chain.process_block(&second).unwrap();

        assert_eq!(chain.head().beacon_block_root, second_root);
        assert_eq!(second.parent_root, first.canonical_root());
    }

    #[test]
    fn orphan_blocks_are_rejected() {
        let (chain, keypairs) = test_chain();

        let mut block = block_on_head(&chain, &keypairs, Slot::new(1));
        block.parent_root = Hash256::from_low_u64_be(99);

        assert_eq!(
            chain.process_block(&block),
            Err(Error::ParentUnknown(Hash256::from_low_u64_be(99)))
        );
        // Nothing was stored.
        assert_eq!(chain.db.get_block(&block.canonical_root()).unwrap(), None);
    }

    #[test]
    fn attestation_data_names_the_head() {
        let (chain, keypairs) = test_chain();
        let block = block_on_head(&chain, &keypairs, Slot::new(1));
        chain.process_block(&block).unwrap();

        let data = chain.produce_attestation_data(3).unwrap();
        assert_eq!(data.beacon_block_root, chain.head().beacon_block_root);
        assert_eq!(data.slot, Slot::new(1));
        assert_eq!(data.shard, 3);

        assert!(chain.produce_attestation_data(chain.spec.shard_count).is_err());
    }

    #[test]
    fn attestations_enter_pool_and_fork_choice() {
        let (chain, keypairs) = test_chain();
        let block = block_on_head(&chain, &keypairs, Slot::new(1));
        chain.process_block(&block).unwrap();

        let head = chain.head();
        let data = chain.produce_attestation_data(0).unwrap();
        // produce_attestation_data names shard 0's committee only if one
        // attests at this slot; use the committee that actually does.
        let committees = head
            .beacon_state
            .get_crosslink_committees_at_slot(data.slot, &chain.spec)
            .unwrap();
        let committee = &committees[0];
        let mut data = data;
        data.shard = committee.shard;

        let message = AttestationDataAndCustodyBit {
            data: data.clone(),
            custody_bit: false,
        }
        .tree_hash_root();
        let domain = chain.spec.get_domain(
            data.slot.epoch(chain.spec.slots_per_epoch),
            Domain::Attestation,
            &head.beacon_state.fork,
        );

        let mut aggregation_bitfield = Bitfield::with_capacity(committee.committee.len());
        aggregation_bitfield.set(0, true);
        let mut aggregate_signature = AggregateSignature::new();
        aggregate_signature.add(&Signature::new(
            &message,
            domain,
            &keypairs[committee.committee[0]].sk,
        ));

        let attestation = Attestation {
            aggregation_bitfield,
            data,
            custody_bitfield: Bitfield::with_capacity(committee.committee.len()),
            aggregate_signature,
        };

        let root = chain.process_attestation(attestation.clone()).unwrap();
        assert_eq!(root, attestation.canonical_root());
        assert_eq!(chain.op_pool.num_attestations(), 1);
    }
}
