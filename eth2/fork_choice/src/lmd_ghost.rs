use crate::{AttestationTarget, ForkChoice, ForkChoiceError};
use db::{BeaconDB, Store};
use log::trace;
use std::collections::HashMap;
use std::sync::Arc;
use types::{BeaconBlock, BeaconState, ChainSpec, Hash256, Slot};

/// One node of the cached block tree. Edges are parent roots; the arena is
/// keyed by block root, so no node owns another.
struct Node {
    slot: Slot,
    parent_root: Hash256,
    children: Vec<Hash256>,
}

/// A node of the vote-annotated tree served over RPC.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockTreeNode {
    pub block: BeaconBlock,
    pub block_root: Hash256,
    /// `max_deposit_amount` for every validator whose latest target is this
    /// block.
    pub participated_votes: u64,
    /// The proposer's effective balance in the block's post-state.
    pub total_votes: u64,
}

/// LMD-GHOST over the cached tree, rooted at the latest justified block.
///
/// The caller (the chain service) wraps the whole structure in a mutex;
/// methods take `&mut self` and assume they run inside that critical
/// section, which is what keeps per-validator targets monotone under
/// concurrent writers.
pub struct LmdGhost<S: Store> {
    db: Arc<BeaconDB<S>>,
    spec: ChainSpec,
    justified_root: Hash256,
    /// Snapshot of the justified block's post-state; the balances that
    /// weight the walk.
    justified_state: BeaconState,
    latest_targets: HashMap<u64, AttestationTarget>,
    nodes: HashMap<Hash256, Node>,
}

impl<S: Store> LmdGhost<S> {
    /// Roots the tree at the justified block.
    pub fn new(
        db: Arc<BeaconDB<S>>,
        justified_block: &BeaconBlock,
        justified_state: BeaconState,
        spec: ChainSpec,
    ) -> Self {
        let justified_root = justified_block.canonical_root();
        let mut nodes = HashMap::new();
        nodes.insert(
            justified_root,
            Node {
                slot: justified_block.slot,
                parent_root: justified_block.parent_root,
                children: vec![],
            },
        );

        Self {
            db,
            spec,
            justified_root,
            justified_state,
            latest_targets: HashMap::new(),
            nodes,
        }
    }

    pub fn justified_root(&self) -> Hash256 {
        self.justified_root
    }

    /// Re-roots the tree at a newer justified block.
    pub fn update_justified(&mut self, justified_block: &BeaconBlock, justified_state: BeaconState) {
        let justified_root = justified_block.canonical_root();
        self.justified_state = justified_state;
        self.justified_root = justified_root;
        self.nodes.entry(justified_root).or_insert(Node {
            slot: justified_block.slot,
            parent_root: justified_block.parent_root,
            children: vec![],
        });
    }

    pub fn latest_target(&self, validator_index: u64) -> Option<&AttestationTarget> {
        self.latest_targets.get(&validator_index)
    }

    /// True if climbing the parent edges from `descendant` reaches
    /// `ancestor` before leaving the arena.
    fn descends_from(&self, descendant: Hash256, ancestor: Hash256) -> bool {
        let mut current = descendant;
        loop {
            if current == ancestor {
                return true;
            }
            match self.nodes.get(&current) {
                Some(node) if current != self.justified_root => current = node.parent_root,
                _ => return false,
            }
        }
    }

    /// The vote-annotated tree from the tree root forward, optionally
    /// filtered to `from_slot..=to_slot`. The root itself is not reported.
    pub fn block_tree(
        &self,
        from_slot: Option<Slot>,
        to_slot: Option<Slot>,
    ) -> Result<Vec<BlockTreeNode>, ForkChoiceError> {
        let mut tree = vec![];

        for (&block_root, node) in &self.nodes {
            if block_root == self.justified_root {
                continue;
            }
            if from_slot.map_or(false, |from| node.slot < from)
                || to_slot.map_or(false, |to| node.slot > to)
            {
                continue;
            }

            let block = self
                .db
                .get_block(&block_root)?
                .ok_or(ForkChoiceError::UnknownRoot(block_root))?;

            let participated_votes = self
                .latest_targets
                .values()
                .filter(|target| target.block_root == block_root)
                .count() as u64
                * self.spec.max_deposit_amount;

            let historical_state = self
                .db
                .get_historical_state(&block_root)?
                .ok_or(ForkChoiceError::MissingHistoricalState(block_root))?;
            let proposer_index =
                historical_state.get_beacon_proposer_index(node.slot, &self.spec)?;
            let total_votes = historical_state.get_effective_balance(proposer_index)?;

            tree.push(BlockTreeNode {
                block,
                block_root,
                participated_votes,
                total_votes,
            });
        }

        Ok(tree)
    }
}

impl<S: Store> ForkChoice for LmdGhost<S> {
    fn add_block(&mut self, block: &BeaconBlock, block_root: Hash256) -> Result<(), ForkChoiceError> {
        if self.nodes.contains_key(&block_root) {
            return Ok(());
        }

        let parent = self
            .nodes
            .get_mut(&block.parent_root)
            .ok_or(ForkChoiceError::MissingParent(block.parent_root))?;
        parent.children.push(block_root);

        self.nodes.insert(
            block_root,
            Node {
                slot: block.slot,
                parent_root: block.parent_root,
                children: vec![],
            },
        );

        Ok(())
    }

    fn add_attestation_target(&mut self, validator_index: u64, target: AttestationTarget) {
        match self.latest_targets.get(&validator_index) {
            // An equal or older slot never displaces the stored target.
            Some(stored) if target.slot <= stored.slot => {
                trace!(
                    "stale target for validator {}: {} <= {}",
                    validator_index,
                    target.slot,
                    stored.slot
                );
            }
            _ => {
                self.latest_targets.insert(validator_index, target);
            }
        }
    }

    /// From the justified block, repeatedly descend to the child whose
    /// subtree accumulates the most attested balance. Ties go to the
    /// lexicographically greater block root.
    fn find_head(&mut self) -> Result<Hash256, ForkChoiceError> {
        let mut head_root = self.justified_root;

        loop {
            let children: Vec<Hash256> = self
                .nodes
                .get(&head_root)
                .ok_or(ForkChoiceError::UnknownRoot(head_root))?
                .children
                .clone();

            match children.len() {
                0 => return Ok(head_root),
                1 => {
                    head_root = children[0];
                    continue;
                }
                _ => {}
            }

            let mut best: Option<(u64, Hash256)> = None;
            for &child in &children {
                let weight = self.child_weight(child);
                trace!("child {} weighs {}", child, weight);
                let candidate = (weight, child);
                if best.map_or(true, |current| candidate > current) {
                    best = Some(candidate);
                }
            }

            // children is non-empty here
            head_root = best.expect("at least two children").1;
        }
    }

    fn update_finalized(&mut self, finalized_root: Hash256) -> Result<(), ForkChoiceError> {
        if !self.nodes.contains_key(&finalized_root) {
            return Err(ForkChoiceError::UnknownRoot(finalized_root));
        }

        let keep: Vec<Hash256> = self
            .nodes
            .keys()
            .filter(|&&root| self.descends_from(root, finalized_root))
            .cloned()
            .collect();
        self.nodes.retain(|root, _| keep.contains(root));

        // A pruned target only disappears with its validator; an active
        // validator's vote re-attaches once it votes inside the new tree.
        let current_epoch = self.justified_state.current_epoch(&self.spec);
        let justified_state = &self.justified_state;
        let nodes = &self.nodes;
        self.latest_targets.retain(|&validator_index, target| {
            nodes.contains_key(&target.block_root)
                || justified_state
                    .validator_registry
                    .get(validator_index as usize)
                    .map_or(false, |v| v.is_active_at(current_epoch))
        });

        // The walk must start inside the surviving tree.
        if !self.descends_from(self.justified_root, finalized_root) {
            self.justified_root = finalized_root;
        }

        Ok(())
    }
}

impl<S: Store> LmdGhost<S> {
    /// The weight of one child: the effective balance of every validator
    /// whose latest target descends through it.
    fn child_weight(&self, child: Hash256) -> u64 {
        let mut weight = 0;
        for (&validator_index, target) in &self.latest_targets {
            if self.descends_from(target.block_root, child) {
                weight += self
                    .justified_state
                    .get_effective_balance(validator_index as usize)
                    .unwrap_or(0);
            }
        }
        weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::MemoryStore;
    use std::collections::HashMap;
    use types::test_utils::TestingBeaconStateBuilder;
    use types::{BeaconBlock, ChainSpec};

    struct TestRig {
        fork_choice: LmdGhost<MemoryStore>,
        db: Arc<BeaconDB<MemoryStore>>,
        spec: ChainSpec,
        justified_root: Hash256,
    }

    /// A justified block at the genesis slot, eleven attesters' worth of
    /// balance behind it.
    fn rig() -> TestRig {
        let spec = ChainSpec::few_validators();
        let db = Arc::new(BeaconDB::new(MemoryStore::open()));

        let justified_block = BeaconBlock::empty(&spec);
        let justified_root = db.save_block(&justified_block).unwrap();
        let (justified_state, _) =
            TestingBeaconStateBuilder::from_default_keypairs(11, &spec).build();

        let fork_choice = LmdGhost::new(
            db.clone(),
            &justified_block,
            justified_state,
            spec.clone(),
        );

        TestRig {
            fork_choice,
            db,
            spec,
            justified_root,
        }
    }

    /// A block at `slot` off `parent_root`, labelled via its state root so
    /// roots sort in label order. Its post-state is stored alongside.
    fn add_labelled_block(rig: &mut TestRig, label: u64, slot: u64, parent_root: Hash256) -> Hash256 {
        let mut block = BeaconBlock::empty(&rig.spec);
        block.slot = Slot::new(slot);
        block.parent_root = parent_root;
        block.state_root = Hash256::from_low_u64_be(label);

        let root = rig.db.save_block(&block).unwrap();
        let (post_state, _) = TestingBeaconStateBuilder::from_default_keypairs(8, &rig.spec).build();
        rig.db.save_historical_state(&post_state, root).unwrap();

        rig.fork_choice.add_block(&block, root).unwrap();
        root
    }

    fn target(slot: u64, block_root: Hash256, parent_root: Hash256) -> AttestationTarget {
        AttestationTarget {
            slot: Slot::new(slot),
            block_root,
            parent_root,
        }
    }

    /// The tree the vote-tally scenarios run over:
    ///
    /// ```text
    ///                /-> [A, slot 3, 3 votes] -> [B, slot 4, 3 votes]
    /// [justified] --> [C, slot 3, 2 votes]
    ///                \-> [D, slot 3, 2 votes] -> (skip) -> [E, slot 5, 1 vote]
    /// ```
    fn build_vote_tree(rig: &mut TestRig) -> HashMap<char, Hash256> {
        let justified = rig.justified_root;
        let a = add_labelled_block(rig, 1, 3, justified);
        let b = add_labelled_block(rig, 2, 4, a);
        let c = add_labelled_block(rig, 3, 3, justified);
        let d = add_labelled_block(rig, 4, 3, justified);
        let e = add_labelled_block(rig, 5, 5, d);

        let assignments: Vec<(u64, u64, Hash256, Hash256)> = vec![
            (0, 3, a, justified),
            (1, 3, a, justified),
            (2, 3, a, justified),
            (3, 3, c, justified),
            (4, 3, c, justified),
            (5, 3, d, justified),
            (6, 3, d, justified),
            (7, 4, b, a),
            (8, 4, b, a),
            (9, 4, b, a),
            (10, 5, e, d),
        ];
        for (validator, slot, root, parent) in assignments {
            rig.fork_choice
                .add_attestation_target(validator, target(slot, root, parent));
        }

        let mut roots = HashMap::new();
        roots.insert('a', a);
        roots.insert('b', b);
        roots.insert('c', c);
        roots.insert('d', d);
        roots.insert('e', e);
        roots
    }

    #[test]
    fn block_tree_reports_direct_votes_and_proposer_balance() {
        let mut rig = rig();
        let roots = build_vote_tree(&mut rig);

        let mut tree = rig.fork_choice.block_tree(None, None).unwrap();
        tree.sort_by_key(|node| node.block.state_root);

        let labels: Vec<Hash256> = tree.iter().map(|n| n.block.state_root).collect();
        assert_eq!(
            labels,
            (1..=5).map(Hash256::from_low_u64_be).collect::<Vec<_>>(),
            "nodes sort into [A, B, C, D, E]"
        );

        let unit = rig.spec.max_deposit_amount;
        let participated: Vec<u64> = tree.iter().map(|n| n.participated_votes).collect();
        assert_eq!(participated, vec![3 * unit, 3 * unit, 2 * unit, 2 * unit, unit]);

        for node in &tree {
            assert_eq!(node.total_votes, unit);
        }
        assert_eq!(roots.len(), 5);
    }

    #[test]
    fn block_tree_slot_range_filters() {
        let mut rig = rig();
        build_vote_tree(&mut rig);

        let tree = rig
            .fork_choice
            .block_tree(Some(Slot::new(3)), Some(Slot::new(4)))
            .unwrap();
        assert_eq!(tree.len(), 4);
        assert!(tree.iter().all(|n| n.block.slot <= Slot::new(4)));
    }

    #[test]
    fn head_follows_the_heaviest_subtree() {
        let mut rig = rig();
        let roots = build_vote_tree(&mut rig);

        // A carries its own three votes plus B's three; D only five total.
        assert_eq!(rig.fork_choice.find_head().unwrap(), roots[&'b']);
        // No intervening updates: the head is stable.
        assert_eq!(rig.fork_choice.find_head().unwrap(), roots[&'b']);
    }

    #[test]
    fn votes_move_the_head() {
        let mut rig = rig();
        let roots = build_vote_tree(&mut rig);

        // Five validators move to E at a later slot; D's subtree now
        // carries eight of eleven votes.
        for validator in 0..5 {
            rig.fork_choice
                .add_attestation_target(validator, target(6, roots[&'e'], roots[&'d']));
        }
        assert_eq!(rig.fork_choice.find_head().unwrap(), roots[&'e']);
    }

    #[test]
    fn targets_are_monotone_in_slot() {
        let mut rig = rig();
        let roots = build_vote_tree(&mut rig);

        // Validator 7 voted for B at slot 4; an older vote must not stick.
        rig.fork_choice
            .add_attestation_target(7, target(3, roots[&'c'], rig.justified_root));
        assert_eq!(
            rig.fork_choice.latest_target(7).unwrap().block_root,
            roots[&'b']
        );

        // A newer vote does.
        rig.fork_choice
            .add_attestation_target(7, target(6, roots[&'e'], roots[&'d']));
        assert_eq!(
            rig.fork_choice.latest_target(7).unwrap().block_root,
            roots[&'e']
        );
    }

    #[test]
    fn orphans_are_rejected() {
        let mut rig = rig();
        let mut block = BeaconBlock::empty(&rig.spec);
        block.slot = Slot::new(3);
        block.parent_root = Hash256::from_low_u64_be(999);

        assert_eq!(
            rig.fork_choice.add_block(&block, block.canonical_root()),
            Err(ForkChoiceError::MissingParent(block.parent_root))
        );
    }

    #[test]
    fn finalization_prunes_disjoint_branches() {
        let mut rig = rig();
        let roots = build_vote_tree(&mut rig);

        rig.fork_choice.update_finalized(roots[&'d']).unwrap();

        // Only D's branch survives the prune. D is the new tree root and,
        // like the justified block before it, is not itself reported.
        let tree = rig.fork_choice.block_tree(None, None).unwrap();
        let remaining: Vec<Hash256> = tree.iter().map(|n| n.block_root).collect();
        assert_eq!(remaining, vec![roots[&'e']]);

        assert_eq!(rig.fork_choice.find_head().unwrap(), roots[&'e']);
    }
}
