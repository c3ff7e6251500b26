use crate::{spawn_fail, spawn_ok};
use beacon_chain::BeaconChain;
use db::Store;
use eth1::Eth1Observer;
use futures::{Future, Sink, Stream};
use grpcio::{RpcContext, RpcStatusCode, ServerStreamingSink, UnarySink, WriteFlags};
use protos::services::{
    Attestation as AttestationProto, BeaconBlock as BeaconBlockProto, BlockTreeResponse,
    BlockTreeResponse_TreeNode, ChainStartResponse, Deposit as DepositProto, Empty,
    Eth1DataResponse, ForkResponse, PendingDepositsResponse, TreeBlockSlotRequest,
};
use protos::services_grpc::BeaconService;
use slog::{trace, warn, Logger};
use ssz::Encode;
use std::sync::Arc;
use types::Slot;

pub struct BeaconServiceInstance<S: Store, E: Eth1Observer> {
    pub chain: Arc<BeaconChain<S, E>>,
    pub log: Logger,
}

#[derive(Debug, PartialEq)]
pub enum Eth1SelectionError {
    /// The observer has not seen any ETH1 block yet.
    UnknownLatestBlock,
    /// The follow-distance ancestor's hash is not known to the observer.
    AncestorUnavailable,
}

/// The deposits eligible for the next block: only deposits logged at least
/// a follow distance behind the ETH1 head, in merkle index order, from the
/// state's deposit index, capped per block.
pub fn select_pending_deposits<S: Store, E: Eth1Observer>(
    chain: &BeaconChain<S, E>,
) -> Result<Vec<types::Deposit>, Eth1SelectionError> {
    let latest_block = chain
        .eth1
        .latest_block_number()
        .ok_or(Eth1SelectionError::UnknownLatestBlock)?;

    let state = chain.head().beacon_state;
    let before_block = latest_block.saturating_sub(chain.spec.eth1_follow_distance);

    Ok(chain.db.pending_deposits(
        Some(before_block),
        state.deposit_index,
        chain.spec.max_deposits as usize,
    ))
}

/// Selects the ETH1 data for the next block. With no votes queued, the
/// accumulator root is paired with the follow-distance ancestor hash;
/// otherwise the vote with the highest count wins, ties broken by the
/// greater ETH1 block number. A hash the observer cannot place loses any
/// tie.
pub fn select_eth1_data<S: Store, E: Eth1Observer>(
    chain: &BeaconChain<S, E>,
) -> Result<types::Eth1Data, Eth1SelectionError> {
    let state = chain.head().beacon_state;

    if state.eth1_data_votes.is_empty() {
        let latest_block = chain
            .eth1
            .latest_block_number()
            .ok_or(Eth1SelectionError::UnknownLatestBlock)?;
        let ancestor = latest_block.saturating_sub(chain.spec.eth1_follow_distance);
        let block_hash = chain
            .eth1
            .block_hash_by_number(ancestor)
            .ok_or(Eth1SelectionError::AncestorUnavailable)?;

        return Ok(types::Eth1Data {
            deposit_root: chain.eth1.deposit_root(),
            block_hash,
        });
    }

    let mut best: Option<(&types::Eth1DataVote, i64)> = None;
    for vote in &state.eth1_data_votes {
        let height = chain
            .eth1
            .block_number_by_hash(&vote.eth1_data.block_hash)
            .map(|number| number as i64)
            .unwrap_or(-1);
        let better = match best {
            None => true,
            Some((leader, leader_height)) => {
                vote.vote_count > leader.vote_count
                    || (vote.vote_count == leader.vote_count && height > leader_height)
            }
        };
        if better {
            best = Some((vote, height));
        }
    }

    // eth1_data_votes is non-empty here
    Ok(best.expect("at least one vote").0.eth1_data.clone())
}

impl<S: Store, E: Eth1Observer> Clone for BeaconServiceInstance<S, E> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            log: self.log.clone(),
        }
    }
}

impl<S: Store, E: Eth1Observer + 'static> BeaconServiceInstance<S, E> {
    /// Builds the vote-annotated tree response for the given slot range.
    fn tree_response(
        &self,
        from_slot: Option<Slot>,
        to_slot: Option<Slot>,
        ctx: RpcContext,
        sink: UnarySink<BlockTreeResponse>,
    ) {
        match self.chain.block_tree(from_slot, to_slot) {
            Ok(nodes) => {
                let mut resp = BlockTreeResponse::new();
                for node in nodes {
                    let mut block_proto = BeaconBlockProto::new();
                    block_proto.set_ssz(node.block.as_ssz_bytes());

                    let mut tree_node = BlockTreeResponse_TreeNode::new();
                    tree_node.set_block(block_proto);
                    tree_node.set_block_root(node.block_root.as_bytes().to_vec());
                    tree_node.set_participated_votes(node.participated_votes);
                    tree_node.set_total_votes(node.total_votes);
                    resp.mut_tree().push(tree_node);
                }
                spawn_ok(&ctx, sink, resp, &self.log);
            }
            Err(e) => spawn_fail(
                &ctx,
                sink,
                RpcStatusCode::Internal,
                format!("could not compute the block tree: {:?}", e),
                &self.log,
            ),
        }
    }
}

impl<S: Store, E: Eth1Observer + 'static> BeaconService for BeaconServiceInstance<S, E> {
    /// Streams one `{started, genesis_time}` message once the deposit
    /// threshold has been crossed, replaying immediately if it already has,
    /// then closes.
    fn wait_for_chain_start(
        &mut self,
        ctx: RpcContext,
        _req: Empty,
        sink: ServerStreamingSink<ChainStartResponse>,
    ) {
        trace!(self.log, "RPC request"; "endpoint" => "WaitForChainStart");

        let responses = self
            .chain
            .chain_start
            .subscribe()
            .map(|genesis_time| {
                let mut resp = ChainStartResponse::new();
                resp.set_started(true);
                resp.set_genesis_time(genesis_time);
                (resp, WriteFlags::default())
            })
            .map_err(|_| grpcio::Error::RemoteStopped);

        let log = self.log.clone();
        let f = sink
            .send_all(responses)
            .map(|_| ())
            .map_err(move |e| {
                // Cancellation lands here; the subscriber handle drops with
                // the stream and the latch skips it on the next fan-out.
                warn!(log, "ChainStart stream closed"; "error" => format!("{:?}", e))
            });
        ctx.spawn(f)
    }

    /// The current head block from fork choice.
    fn canonical_head(&mut self, ctx: RpcContext, _req: Empty, sink: UnarySink<BeaconBlockProto>) {
        trace!(self.log, "RPC request"; "endpoint" => "CanonicalHead");

        let mut resp = BeaconBlockProto::new();
        resp.set_ssz(self.chain.head().beacon_block.as_ssz_bytes());
        spawn_ok(&ctx, sink, resp, &self.log);
    }

    /// Streams every aggregate the pool hands over, at most once each.
    /// Back-pressure propagates into the pool's rendezvous channel.
    fn latest_attestation(
        &mut self,
        ctx: RpcContext,
        _req: Empty,
        sink: ServerStreamingSink<AttestationProto>,
    ) {
        trace!(self.log, "RPC request"; "endpoint" => "LatestAttestation");

        let responses = self
            .chain
            .op_pool
            .register_attestation_subscriber()
            .map(|attestation| {
                let mut resp = AttestationProto::new();
                resp.set_ssz(attestation.as_ssz_bytes());
                (resp, WriteFlags::default())
            })
            .map_err(|_| grpcio::Error::RemoteStopped);

        let log = self.log.clone();
        let f = sink
            .send_all(responses)
            .map(|_| ())
            .map_err(move |e| {
                warn!(log, "LatestAttestation stream closed"; "error" => format!("{:?}", e))
            });
        ctx.spawn(f)
    }

    /// The deposits eligible for the next block: outside the follow-distance
    /// window they stay invisible; inside it they come back in merkle index
    /// order, from the state's deposit index, capped per block.
    fn pending_deposits(
        &mut self,
        ctx: RpcContext,
        _req: Empty,
        sink: UnarySink<PendingDepositsResponse>,
    ) {
        trace!(self.log, "RPC request"; "endpoint" => "PendingDeposits");

        match select_pending_deposits(&self.chain) {
            Ok(deposits) => {
                let mut resp = PendingDepositsResponse::new();
                for deposit in deposits {
                    let mut proto = DepositProto::new();
                    proto.set_ssz(deposit.as_ssz_bytes());
                    resp.mut_pending_deposits().push(proto);
                }
                spawn_ok(&ctx, sink, resp, &self.log);
            }
            Err(Eth1SelectionError::UnknownLatestBlock) => spawn_fail(
                &ctx,
                sink,
                RpcStatusCode::Unavailable,
                "latest ETH1 block number is unknown".to_string(),
                &self.log,
            ),
            Err(Eth1SelectionError::AncestorUnavailable) => spawn_fail(
                &ctx,
                sink,
                RpcStatusCode::Unavailable,
                "could not fetch the follow-distance ancestor hash".to_string(),
                &self.log,
            ),
        }
    }

    /// Selects the ETH1 data for the next block. With no votes queued, the
    /// accumulator root is paired with the follow-distance ancestor hash;
    /// otherwise the vote with the highest count wins, ties broken by the
    /// greater ETH1 block number. A hash the observer cannot place loses
    /// any tie.
    fn eth1_data(&mut self, ctx: RpcContext, _req: Empty, sink: UnarySink<Eth1DataResponse>) {
        trace!(self.log, "RPC request"; "endpoint" => "Eth1Data");

        match select_eth1_data(&self.chain) {
            Ok(eth1_data) => {
                let mut resp = Eth1DataResponse::new();
                resp.set_deposit_root(eth1_data.deposit_root.as_bytes().to_vec());
                resp.set_block_hash(eth1_data.block_hash.as_bytes().to_vec());
                spawn_ok(&ctx, sink, resp, &self.log);
            }
            Err(Eth1SelectionError::UnknownLatestBlock) => spawn_fail(
                &ctx,
                sink,
                RpcStatusCode::Unavailable,
                "latest ETH1 block number is unknown".to_string(),
                &self.log,
            ),
            Err(Eth1SelectionError::AncestorUnavailable) => spawn_fail(
                &ctx,
                sink,
                RpcStatusCode::Unavailable,
                "could not fetch the follow-distance ancestor hash".to_string(),
                &self.log,
            ),
        }
    }

    /// The current fork descriptor from the head state.
    fn fork_data(&mut self, ctx: RpcContext, _req: Empty, sink: UnarySink<ForkResponse>) {
        trace!(self.log, "RPC request"; "endpoint" => "ForkData");

        let fork = self.chain.head().beacon_state.fork;
        let mut resp = ForkResponse::new();
        resp.set_previous_version(fork.previous_version);
        resp.set_current_version(fork.current_version);
        resp.set_epoch(fork.epoch.as_u64());
        spawn_ok(&ctx, sink, resp, &self.log);
    }

    /// Every tree node from the last finalized block forward.
    fn block_tree(&mut self, ctx: RpcContext, _req: Empty, sink: UnarySink<BlockTreeResponse>) {
        trace!(self.log, "RPC request"; "endpoint" => "BlockTree");
        self.tree_response(None, None, ctx, sink);
    }

    /// Tree nodes with `slot_from <= slot <= slot_to`.
    fn block_tree_by_slots(
        &mut self,
        ctx: RpcContext,
        req: TreeBlockSlotRequest,
        sink: UnarySink<BlockTreeResponse>,
    ) {
        trace!(
            self.log,
            "RPC request";
            "endpoint" => "BlockTreeBySlots",
            "from" => req.get_slot_from(),
            "to" => req.get_slot_to(),
        );

        let (from, to) = match validate_slot_range(req.get_slot_from(), req.get_slot_to()) {
            Ok(range) => range,
            Err(message) => {
                return spawn_fail(&ctx, sink, RpcStatusCode::InvalidArgument, message, &self.log);
            }
        };

        self.tree_response(Some(from), Some(to), ctx, sink);
    }
}

/// A slot range is a closed interval; an inverted one is a caller error.
pub fn validate_slot_range(slot_from: u64, slot_to: u64) -> Result<(Slot, Slot), String> {
    if slot_to < slot_from {
        Err("upper limit of the slot range is below the lower limit".to_string())
    } else {
        Ok((Slot::new(slot_from), Slot::new(slot_to)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::{BeaconDB, MemoryStore};
    use eth1::{ChainStartLatch, MockEth1Observer};
    use operation_pool::OperationPool;
    use slog::o;
    use types::test_utils::TestingBeaconStateBuilder;
    use types::*;

    type TestChain = BeaconChain<MemoryStore, MockEth1Observer>;

    fn test_chain(mutate_state: impl FnOnce(&mut BeaconState)) -> Arc<TestChain> {
        let spec = ChainSpec::few_validators();
        let (mut genesis_state, _) =
            TestingBeaconStateBuilder::from_default_keypairs(8, &spec).build();
        mutate_state(&mut genesis_state);

        Arc::new(
            BeaconChain::from_genesis(
                Arc::new(BeaconDB::new(MemoryStore::open())),
                Arc::new(OperationPool::new()),
                Arc::new(MockEth1Observer::new()),
                Arc::new(ChainStartLatch::new()),
                genesis_state,
                spec,
                slog::Logger::root(slog::Discard, o!()),
            )
            .unwrap(),
        )
    }

    fn deposit(index: u64) -> Deposit {
        Deposit {
            proof: vec![],
            index,
            deposit_data: DepositData {
                pubkey: Keypair::random().pk,
                withdrawal_credentials: Hash256::zero(),
                amount: 32_000_000_000,
                signature: Signature::empty_signature(),
            },
        }
    }

    #[test]
    fn pending_deposits_unknown_eth1_block() {
        let chain = test_chain(|_| {});
        assert_eq!(
            select_pending_deposits(&chain),
            Err(Eth1SelectionError::UnknownLatestBlock)
        );
    }

    #[test]
    fn pending_deposits_outside_follow_window() {
        let chain = test_chain(|state| state.deposit_index = 2);
        let follow_distance = chain.spec.eth1_follow_distance;

        // The merkle index doubles as the deposit's ETH1 block number.
        for index in 0..4u64 {
            chain.db.insert_deposit(&deposit(index), index).unwrap();
        }
        for index in 2..4u64 {
            chain.db.insert_pending_deposit(&deposit(index), index);
        }

        chain.eth1.set_latest_block_number(follow_distance);
        assert_eq!(select_pending_deposits(&chain).unwrap().len(), 0);

        // Once the ETH1 chain advances past the window the recent deposits
        // surface, starting at the state's deposit index.
        chain.eth1.set_latest_block_number(follow_distance + 10_000);
        let deposits = select_pending_deposits(&chain).unwrap();
        let indices: Vec<u64> = deposits.iter().map(|d| d.index).collect();
        assert_eq!(indices, vec![2, 3]);
    }

    #[test]
    fn pending_deposits_cap_at_block_max() {
        let chain = test_chain(|state| state.deposit_index = 2);
        let follow_distance = chain.spec.eth1_follow_distance;

        for index in 0..22u64 {
            chain.db.insert_deposit(&deposit(index), index).unwrap();
            if index >= 2 {
                chain.db.insert_pending_deposit(&deposit(index), index);
            }
        }
        chain.eth1.set_latest_block_number(follow_distance + 10_000);

        let deposits = select_pending_deposits(&chain).unwrap();
        assert_eq!(deposits.len(), chain.spec.max_deposits as usize);
        assert_eq!(deposits[0].index, 2);
    }

    #[test]
    fn eth1_data_empty_votes_reads_the_accumulator() {
        let deposit_root = Hash256::from_low_u64_be(0xd0);
        let ancestor_hash = Hash256::from_low_u64_be(0xa0);
        let chain = test_chain(|_| {});
        let follow_distance = chain.spec.eth1_follow_distance;

        chain.eth1.set_latest_block_number(follow_distance + 3);
        chain.eth1.set_deposit_root(deposit_root);
        chain.eth1.set_block_hash(3, ancestor_hash);

        let eth1_data = select_eth1_data(&chain).unwrap();
        assert_eq!(eth1_data.deposit_root, deposit_root);
        assert_eq!(eth1_data.block_hash, ancestor_hash);
    }

    #[test]
    fn eth1_data_empty_votes_unknown_ancestor() {
        let chain = test_chain(|_| {});
        chain
            .eth1
            .set_latest_block_number(chain.spec.eth1_follow_distance + 3);

        assert_eq!(
            select_eth1_data(&chain),
            Err(Eth1SelectionError::AncestorUnavailable)
        );
    }

    #[test]
    fn eth1_data_tie_breaks_by_block_number() {
        let block_2 = Hash256::from_low_u64_be(0xb2);
        let block_4 = Hash256::from_low_u64_be(0xb4);

        let chain = test_chain(|state| {
            state.eth1_data_votes = vec![
                Eth1DataVote {
                    eth1_data: Eth1Data {
                        deposit_root: Hash256::from_low_u64_be(0xd2),
                        block_hash: block_2,
                    },
                    vote_count: 3,
                },
                Eth1DataVote {
                    eth1_data: Eth1Data {
                        deposit_root: Hash256::from_low_u64_be(0xd4),
                        block_hash: block_4,
                    },
                    vote_count: 3,
                },
            ];
        });

        // The equal-count votes resolve by ETH1 height: block_2 sits higher.
        chain.eth1.set_block_hash(4, block_2);
        chain.eth1.set_block_hash(3, block_4);

        let eth1_data = select_eth1_data(&chain).unwrap();
        assert_eq!(eth1_data.block_hash, block_2);
        assert_eq!(eth1_data.deposit_root, Hash256::from_low_u64_be(0xd2));
    }

    #[test]
    fn eth1_data_unknown_hash_loses_the_tie() {
        let known = Hash256::from_low_u64_be(1);
        let unknown = Hash256::from_low_u64_be(2);

        let chain = test_chain(|state| {
            state.eth1_data_votes = vec![
                Eth1DataVote {
                    eth1_data: Eth1Data {
                        deposit_root: Hash256::zero(),
                        block_hash: unknown,
                    },
                    vote_count: 3,
                },
                Eth1DataVote {
                    eth1_data: Eth1Data {
                        deposit_root: Hash256::zero(),
                        block_hash: known,
                    },
                    vote_count: 3,
                },
            ];
        });
        chain.eth1.set_block_hash(1, known);

        assert_eq!(select_eth1_data(&chain).unwrap().block_hash, known);
    }

    #[test]
    fn inverted_slot_range_is_invalid() {
        assert!(validate_slot_range(4, 3).is_err());
        assert!(validate_slot_range(3, 4).is_ok());
        assert!(validate_slot_range(3, 3).is_ok());
    }

    #[test]
    fn higher_vote_count_beats_height() {
        let low = Hash256::from_low_u64_be(1);
        let high = Hash256::from_low_u64_be(2);

        let chain = test_chain(|state| {
            state.eth1_data_votes = vec![
                Eth1DataVote {
                    eth1_data: Eth1Data {
                        deposit_root: Hash256::zero(),
                        block_hash: low,
                    },
                    vote_count: 5,
                },
                Eth1DataVote {
                    eth1_data: Eth1Data {
                        deposit_root: Hash256::zero(),
                        block_hash: high,
                    },
                    vote_count: 2,
                },
            ];
        });
        // Height favours the minority vote; count must still win.
        chain.eth1.set_block_hash(9, high);

        assert_eq!(select_eth1_data(&chain).unwrap().block_hash, low);
    }
}
