use crate::{spawn_fail, spawn_ok};
use beacon_chain::BeaconChain;
use db::Store;
use eth1::Eth1Observer;
use grpcio::{RpcContext, RpcStatusCode, UnarySink};
use protos::services::{
    AttestRequest, AttestResponse, AttestationData as AttestationDataProto,
    AttestationDataRequest, AttestationDataResponse,
};
use protos::services_grpc::AttesterService;
use slog::{trace, Logger};
use ssz::{Decode, Encode};
use std::sync::Arc;
use types::Attestation;

pub struct AttesterServiceInstance<S: Store, E: Eth1Observer> {
    pub chain: Arc<BeaconChain<S, E>>,
    pub log: Logger,
}

impl<S: Store, E: Eth1Observer> Clone for AttesterServiceInstance<S, E> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            log: self.log.clone(),
        }
    }
}

impl<S: Store, E: Eth1Observer + 'static> AttesterService for AttesterServiceInstance<S, E> {
    /// Accepts a signed aggregate from a validator, feeds it to the pool
    /// and fork choice, and returns its root.
    fn attest_head(&mut self, ctx: RpcContext, req: AttestRequest, sink: UnarySink<AttestResponse>) {
        trace!(self.log, "RPC request"; "endpoint" => "AttestHead");

        let attestation = match Attestation::from_ssz_bytes(req.get_attestation().get_ssz()) {
            Ok(attestation) => attestation,
            Err(e) => {
                return spawn_fail(
                    &ctx,
                    sink,
                    RpcStatusCode::InvalidArgument,
                    format!("invalid attestation SSZ: {:?}", e),
                    &self.log,
                );
            }
        };

        match self.chain.process_attestation(attestation) {
            Ok(root) => {
                let mut resp = AttestResponse::new();
                resp.set_attestation_root(root.as_bytes().to_vec());
                spawn_ok(&ctx, sink, resp, &self.log);
            }
            Err(e) => spawn_fail(
                &ctx,
                sink,
                RpcStatusCode::InvalidArgument,
                format!("attestation rejected: {:?}", e),
                &self.log,
            ),
        }
    }

    /// The data a validator should sign when attesting for `shard` at the
    /// current head slot.
    fn attestation_data_at_slot(
        &mut self,
        ctx: RpcContext,
        req: AttestationDataRequest,
        sink: UnarySink<AttestationDataResponse>,
    ) {
        trace!(
            self.log,
            "RPC request";
            "endpoint" => "AttestationDataAtSlot",
            "shard" => req.get_shard(),
            "slot" => req.get_slot(),
        );

        let head_slot = self.chain.head().beacon_state.slot;
        if req.get_slot() != head_slot.as_u64() {
            return spawn_fail(
                &ctx,
                sink,
                RpcStatusCode::OutOfRange,
                format!(
                    "attestation data requested for slot {} but the head is at slot {}",
                    req.get_slot(),
                    head_slot
                ),
                &self.log,
            );
        }

        match self.chain.produce_attestation_data(req.get_shard()) {
            Ok(data) => {
                let mut data_proto = AttestationDataProto::new();
                data_proto.set_ssz(data.as_ssz_bytes());
                let mut resp = AttestationDataResponse::new();
                resp.set_attestation_data(data_proto);
                spawn_ok(&ctx, sink, resp, &self.log);
            }
            Err(e) => spawn_fail(
                &ctx,
                sink,
                RpcStatusCode::InvalidArgument,
                format!("could not produce attestation data: {:?}", e),
                &self.log,
            ),
        }
    }
}
