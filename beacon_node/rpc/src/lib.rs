//! The gRPC services validator clients drive the node through: duties,
//! block templates, submission of signed blocks and attestations, and the
//! chain-start / latest-attestation streams.

mod attester_service;
mod beacon_service;
pub mod config;
mod proposer_service;
mod validator_service;

pub use self::attester_service::AttesterServiceInstance;
pub use self::beacon_service::BeaconServiceInstance;
pub use self::proposer_service::ProposerServiceInstance;
pub use self::validator_service::ValidatorServiceInstance;
pub use config::Config as RPCConfig;

use beacon_chain::BeaconChain;
use db::Store;
use eth1::Eth1Observer;
use futures::Future;
use grpcio::{Environment, RpcContext, RpcStatus, RpcStatusCode, Server, ServerBuilder, UnarySink};
use protos::services_grpc::{
    create_attester_service, create_beacon_service, create_proposer_service,
    create_validator_service,
};
use slog::{info, o};
use std::sync::Arc;

/// Builds and starts the gRPC server; the caller keeps the returned handle
/// alive for the lifetime of the node.
pub fn start_server<S: Store, E: Eth1Observer + 'static>(
    config: &RPCConfig,
    beacon_chain: Arc<BeaconChain<S, E>>,
    log: &slog::Logger,
) -> Result<Server, grpcio::Error> {
    let log = log.new(o!("Service" => "RPC"));
    let env = Arc::new(Environment::new(1));

    let beacon_service = create_beacon_service(BeaconServiceInstance {
        chain: beacon_chain.clone(),
        log: log.clone(),
    });
    let attester_service = create_attester_service(AttesterServiceInstance {
        chain: beacon_chain.clone(),
        log: log.clone(),
    });
    let proposer_service = create_proposer_service(ProposerServiceInstance {
        chain: beacon_chain.clone(),
        log: log.clone(),
    });
    let validator_service = create_validator_service(ValidatorServiceInstance {
        chain: beacon_chain,
        log: log.clone(),
    });

    let mut server = ServerBuilder::new(env)
        .register_service(beacon_service)
        .register_service(attester_service)
        .register_service(proposer_service)
        .register_service(validator_service)
        .bind(config.listen_address.to_string(), config.port)
        .build()?;
    server.start();

    for &(ref host, port) in server.bind_addrs() {
        info!(log, "gRPC API started"; "port" => port, "host" => host);
    }

    Ok(server)
}

/// Fails a unary call with `code`, logging if even the failure cannot be
/// delivered.
pub(crate) fn spawn_fail<T>(
    ctx: &RpcContext,
    sink: UnarySink<T>,
    code: RpcStatusCode,
    message: String,
    log: &slog::Logger,
) {
    let log = log.clone();
    let f = sink
        .fail(RpcStatus::new(code, Some(message)))
        .map_err(move |e| slog::warn!(log, "failed to reply"; "error" => format!("{:?}", e)));
    ctx.spawn(f)
}

/// Completes a unary call, logging delivery failures.
pub(crate) fn spawn_ok<T>(ctx: &RpcContext, sink: UnarySink<T>, resp: T, log: &slog::Logger) {
    let log = log.clone();
    let f = sink
        .success(resp)
        .map_err(move |e| slog::warn!(log, "failed to reply"; "error" => format!("{:?}", e)));
    ctx.spawn(f)
}
