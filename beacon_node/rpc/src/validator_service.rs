use crate::{spawn_fail, spawn_ok};
use beacon_chain::BeaconChain;
use db::Store;
use eth1::Eth1Observer;
use futures::{stream, Future, Sink, Stream};
use grpcio::{RpcContext, RpcStatusCode, ServerStreamingSink, UnarySink, WriteFlags};
use protos::services::{
    CommitteeAssignmentRequest, CommitteeAssignmentResponse,
    CommitteeAssignmentResponse_CommitteeAssignment, ExitedValidatorsRequest,
    ExitedValidatorsResponse, IndexResponse, ValidatorActivationRequest,
    ValidatorActivationResponse, ValidatorIndexRequest, ValidatorPerformanceRequest,
    ValidatorPerformanceResponse, ValidatorStatus, ValidatorStatusResponse,
};
use protos::services_grpc::ValidatorService;
use slog::{trace, warn, Logger};
use std::sync::Arc;
use types::{BeaconState, ChainSpec, Epoch, PublicKey};

pub struct ValidatorServiceInstance<S: Store, E: Eth1Observer> {
    pub chain: Arc<BeaconChain<S, E>>,
    pub log: Logger,
}

impl<S: Store, E: Eth1Observer> Clone for ValidatorServiceInstance<S, E> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            log: self.log.clone(),
        }
    }
}

/// The subset of `pubkeys` that has reached an active-or-later status in
/// `chain`'s head state.
fn activated_keys<S: Store, E: Eth1Observer>(
    chain: &BeaconChain<S, E>,
    pubkeys: &[Vec<u8>],
) -> Vec<Vec<u8>> {
    let state = chain.head().beacon_state;
    let current_epoch = state.current_epoch(&chain.spec);

    pubkeys
        .iter()
        .filter(|bytes| {
            PublicKey::from_bytes(bytes)
                .ok()
                .and_then(|pubkey| state.get_validator_index(&pubkey))
                .map_or(false, |index| {
                    state.validator_registry[index].activation_epoch <= current_epoch
                })
        })
        .cloned()
        .collect()
}

/// Maps a validator's epochs onto the wire status enum.
fn status_of(state: &BeaconState, index: usize, spec: &ChainSpec) -> ValidatorStatus {
    let validator = &state.validator_registry[index];
    let current_epoch = state.current_epoch(spec);

    if current_epoch >= validator.withdrawable_epoch {
        ValidatorStatus::WITHDRAWABLE
    } else if current_epoch >= validator.exit_epoch {
        ValidatorStatus::EXITED
    } else if validator.exit_epoch != spec.far_future_epoch {
        ValidatorStatus::INITIATED_EXIT
    } else if validator.is_active_at(current_epoch) {
        ValidatorStatus::ACTIVE
    } else if validator.activation_eligibility_epoch != spec.far_future_epoch {
        ValidatorStatus::PENDING_ACTIVE
    } else {
        ValidatorStatus::UNKNOWN_STATUS
    }
}

impl<S: Store, E: Eth1Observer + 'static> ValidatorServiceInstance<S, E> {
    fn parse_pubkey(&self, bytes: &[u8]) -> Result<PublicKey, String> {
        PublicKey::from_bytes(bytes).map_err(|e| format!("invalid public key: {:?}", e))
    }
}

impl<S: Store, E: Eth1Observer + 'static> ValidatorService for ValidatorServiceInstance<S, E> {
    /// The registry index of a public key.
    fn validator_index(
        &mut self,
        ctx: RpcContext,
        req: ValidatorIndexRequest,
        sink: UnarySink<IndexResponse>,
    ) {
        trace!(self.log, "RPC request"; "endpoint" => "ValidatorIndex");

        let pubkey = match self.parse_pubkey(req.get_public_key()) {
            Ok(pubkey) => pubkey,
            Err(message) => {
                return spawn_fail(&ctx, sink, RpcStatusCode::InvalidArgument, message, &self.log);
            }
        };

        match self.chain.head().beacon_state.get_validator_index(&pubkey) {
            Some(index) => {
                let mut resp = IndexResponse::new();
                resp.set_index(index as u64);
                spawn_ok(&ctx, sink, resp, &self.log);
            }
            None => spawn_fail(
                &ctx,
                sink,
                RpcStatusCode::NotFound,
                "public key is not in the registry".to_string(),
                &self.log,
            ),
        }
    }

    /// Where a validator sits in its lifecycle.
    fn validator_status(
        &mut self,
        ctx: RpcContext,
        req: ValidatorIndexRequest,
        sink: UnarySink<ValidatorStatusResponse>,
    ) {
        trace!(self.log, "RPC request"; "endpoint" => "ValidatorStatus");

        let pubkey = match self.parse_pubkey(req.get_public_key()) {
            Ok(pubkey) => pubkey,
            Err(message) => {
                return spawn_fail(&ctx, sink, RpcStatusCode::InvalidArgument, message, &self.log);
            }
        };

        let state = self.chain.head().beacon_state;
        let mut resp = ValidatorStatusResponse::new();
        match state.get_validator_index(&pubkey) {
            Some(index) => resp.set_status(status_of(&state, index, &self.chain.spec)),
            None => resp.set_status(ValidatorStatus::UNKNOWN_STATUS),
        }
        spawn_ok(&ctx, sink, resp, &self.log);
    }

    /// The committee each requested validator serves on in the epoch
    /// starting at `epoch_start`.
    fn committee_assignment(
        &mut self,
        ctx: RpcContext,
        req: CommitteeAssignmentRequest,
        sink: UnarySink<CommitteeAssignmentResponse>,
    ) {
        trace!(
            self.log,
            "RPC request";
            "endpoint" => "CommitteeAssignment",
            "epoch_start" => req.get_epoch_start(),
        );

        let state = self.chain.head().beacon_state;
        let requested_epoch = Epoch::new(req.get_epoch_start());
        if requested_epoch != state.current_epoch(&self.chain.spec) {
            return spawn_fail(
                &ctx,
                sink,
                RpcStatusCode::OutOfRange,
                format!(
                    "assignments are only known for the current epoch {}",
                    state.current_epoch(&self.chain.spec)
                ),
                &self.log,
            );
        }

        let mut resp = CommitteeAssignmentResponse::new();
        for bytes in req.get_public_keys() {
            let mut assignment = CommitteeAssignmentResponse_CommitteeAssignment::new();

            let index = self
                .parse_pubkey(bytes)
                .ok()
                .and_then(|pubkey| state.get_validator_index(&pubkey));
            let index = match index {
                Some(index) => index,
                None => {
                    assignment.set_public_key_known(false);
                    resp.mut_assignment().push(assignment);
                    continue;
                }
            };

            match state.get_attestation_duties(index, &self.chain.spec) {
                Ok(Some(duty)) => {
                    let committees = state
                        .get_crosslink_committees_at_slot(duty.slot, &self.chain.spec)
                        .unwrap_or_default();
                    if let Some(committee) = committees.iter().find(|c| c.shard == duty.shard) {
                        assignment
                            .set_committee(committee.committee.iter().map(|&i| i as u64).collect());
                    }
                    assignment.set_shard(duty.shard);
                    assignment.set_slot(duty.slot.as_u64());
                    let proposer = state
                        .get_beacon_proposer_index(duty.slot, &self.chain.spec)
                        .ok();
                    assignment.set_is_proposer(proposer == Some(index));
                    assignment.set_public_key_known(true);
                }
                Ok(None) | Err(_) => {
                    warn!(self.log, "assignment requested for an inactive validator");
                    assignment.set_public_key_known(true);
                }
            }
            resp.mut_assignment().push(assignment);
        }

        spawn_ok(&ctx, sink, resp, &self.log);
    }

    /// Balance context for one validator against the whole active set.
    fn validator_performance(
        &mut self,
        ctx: RpcContext,
        req: ValidatorPerformanceRequest,
        sink: UnarySink<ValidatorPerformanceResponse>,
    ) {
        trace!(self.log, "RPC request"; "endpoint" => "ValidatorPerformance");

        let pubkey = match self.parse_pubkey(req.get_public_key()) {
            Ok(pubkey) => pubkey,
            Err(message) => {
                return spawn_fail(&ctx, sink, RpcStatusCode::InvalidArgument, message, &self.log);
            }
        };

        let state = self.chain.head().beacon_state;
        let index = match state.get_validator_index(&pubkey) {
            Some(index) => index,
            None => {
                return spawn_fail(
                    &ctx,
                    sink,
                    RpcStatusCode::NotFound,
                    "public key is not in the registry".to_string(),
                    &self.log,
                );
            }
        };

        let active = state.get_active_validator_indices(state.current_epoch(&self.chain.spec));
        let total_active_balance: u64 = active
            .iter()
            .map(|&i| state.validator_balances[i])
            .sum();

        let mut resp = ValidatorPerformanceResponse::new();
        resp.set_balance(state.validator_balances[index]);
        resp.set_total_validators(state.validator_registry.len() as u64);
        resp.set_total_active_validators(active.len() as u64);
        if !active.is_empty() {
            resp.set_average_active_validator_balance(total_active_balance / active.len() as u64);
        }
        spawn_ok(&ctx, sink, resp, &self.log);
    }

    /// Streams once any requested key reaches an active-or-later status,
    /// watching every head update, then closes.
    fn wait_for_activation(
        &mut self,
        ctx: RpcContext,
        req: ValidatorActivationRequest,
        sink: ServerStreamingSink<ValidatorActivationResponse>,
    ) {
        trace!(self.log, "RPC request"; "endpoint" => "WaitForActivation");

        let pubkeys: Vec<Vec<u8>> = req.get_public_keys().to_vec();
        let chain = self.chain.clone();
        let updates = chain.subscribe_state_updates();

        // An initial tick checks the current state before waiting on head
        // updates.
        let responses = stream::once(Ok(()))
            .chain(updates)
            .filter_map(move |_| {
                let activated = activated_keys(&chain, &pubkeys);
                if activated.is_empty() {
                    None
                } else {
                    Some(activated)
                }
            })
            .take(1)
            .map(|activated| {
                let mut resp = ValidatorActivationResponse::new();
                resp.set_activated_public_keys(activated.into());
                (resp, WriteFlags::default())
            })
            .map_err(|_| grpcio::Error::RemoteStopped);

        let log = self.log.clone();
        let f = sink
            .send_all(responses)
            .map(|_| ())
            .map_err(move |e| {
                warn!(log, "WaitForActivation stream closed"; "error" => format!("{:?}", e))
            });
        ctx.spawn(f)
    }

    /// The subset of the requested keys that has initiated or completed an
    /// exit.
    fn exited_validators(
        &mut self,
        ctx: RpcContext,
        req: ExitedValidatorsRequest,
        sink: UnarySink<ExitedValidatorsResponse>,
    ) {
        trace!(self.log, "RPC request"; "endpoint" => "ExitedValidators");

        let state = self.chain.head().beacon_state;
        let exited: Vec<Vec<u8>> = req
            .get_public_keys()
            .iter()
            .filter(|bytes| {
                PublicKey::from_bytes(bytes)
                    .ok()
                    .and_then(|pubkey| state.get_validator_index(&pubkey))
                    .map_or(false, |index| {
                        state.validator_registry[index].has_exited(self.chain.spec.far_future_epoch)
                    })
            })
            .cloned()
            .collect();

        let mut resp = ExitedValidatorsResponse::new();
        resp.set_public_keys(exited.into());
        spawn_ok(&ctx, sink, resp, &self.log);
    }
}
