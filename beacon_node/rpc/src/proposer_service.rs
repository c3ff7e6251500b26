use crate::{spawn_fail, spawn_ok};
use beacon_chain::{BeaconChain, BeaconChainError};
use db::Store;
use eth1::Eth1Observer;
use grpcio::{RpcContext, RpcStatusCode, UnarySink};
use protos::services::{
    ComputeStateRootRequest, IndexResponse, ProposeRequest, ProposeResponse,
    ProposerIndexRequest, StateRootResponse,
};
use protos::services_grpc::ProposerService;
use slog::{info, trace, Logger};
use ssz::Decode;
use std::sync::Arc;
use types::{BeaconBlock, Slot};

pub struct ProposerServiceInstance<S: Store, E: Eth1Observer> {
    pub chain: Arc<BeaconChain<S, E>>,
    pub log: Logger,
}

impl<S: Store, E: Eth1Observer> Clone for ProposerServiceInstance<S, E> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            log: self.log.clone(),
        }
    }
}

impl<S: Store, E: Eth1Observer + 'static> ProposerService for ProposerServiceInstance<S, E> {
    /// Accepts a fully signed block: verifies it, runs the transition,
    /// persists block and post-state and updates the chain head. Returns
    /// the block root.
    fn propose_block(
        &mut self,
        ctx: RpcContext,
        req: ProposeRequest,
        sink: UnarySink<ProposeResponse>,
    ) {
        trace!(self.log, "RPC request"; "endpoint" => "ProposeBlock");

        let block = match BeaconBlock::from_ssz_bytes(req.get_block().get_ssz()) {
            Ok(block) => block,
            Err(e) => {
                return spawn_fail(
                    &ctx,
                    sink,
                    RpcStatusCode::InvalidArgument,
                    format!("invalid block SSZ: {:?}", e),
                    &self.log,
                );
            }
        };

        match self.chain.process_block(&block) {
            Ok(root) => {
                info!(
                    self.log,
                    "Valid block proposed";
                    "slot" => block.slot.as_u64(),
                    "root" => format!("{:?}", root),
                );
                let mut resp = ProposeResponse::new();
                resp.set_block_root(root.as_bytes().to_vec());
                spawn_ok(&ctx, sink, resp, &self.log);
            }
            Err(BeaconChainError::StateTransition(e)) => spawn_fail(
                &ctx,
                sink,
                RpcStatusCode::FailedPrecondition,
                format!("block failed the state transition: {:?}", e),
                &self.log,
            ),
            Err(e) => spawn_fail(
                &ctx,
                sink,
                RpcStatusCode::FailedPrecondition,
                format!("block rejected: {:?}", e),
                &self.log,
            ),
        }
    }

    /// The post-state root of a block template, for the proposer to seal
    /// into the block before signing.
    fn compute_state_root(
        &mut self,
        ctx: RpcContext,
        req: ComputeStateRootRequest,
        sink: UnarySink<StateRootResponse>,
    ) {
        trace!(self.log, "RPC request"; "endpoint" => "ComputeStateRoot");

        let block = match BeaconBlock::from_ssz_bytes(req.get_block().get_ssz()) {
            Ok(block) => block,
            Err(e) => {
                return spawn_fail(
                    &ctx,
                    sink,
                    RpcStatusCode::InvalidArgument,
                    format!("invalid block SSZ: {:?}", e),
                    &self.log,
                );
            }
        };

        match self.chain.produce_state_root(&block) {
            Ok(root) => {
                let mut resp = StateRootResponse::new();
                resp.set_state_root(root.as_bytes().to_vec());
                spawn_ok(&ctx, sink, resp, &self.log);
            }
            Err(e) => spawn_fail(
                &ctx,
                sink,
                RpcStatusCode::FailedPrecondition,
                format!("could not compute the state root: {:?}", e),
                &self.log,
            ),
        }
    }

    /// The validator that proposes at `slot`.
    fn proposer_index(
        &mut self,
        ctx: RpcContext,
        req: ProposerIndexRequest,
        sink: UnarySink<IndexResponse>,
    ) {
        trace!(self.log, "RPC request"; "endpoint" => "ProposerIndex", "slot" => req.get_slot());

        let state = self.chain.head().beacon_state;
        match state.get_beacon_proposer_index(Slot::new(req.get_slot()), &self.chain.spec) {
            Ok(index) => {
                let mut resp = IndexResponse::new();
                resp.set_index(index as u64);
                spawn_ok(&ctx, sink, resp, &self.log);
            }
            Err(e) => spawn_fail(
                &ctx,
                sink,
                RpcStatusCode::FailedPrecondition,
                format!("could not find the proposer: {:?}", e),
                &self.log,
            ),
        }
    }
}
