mod genesis_file;

use beacon_chain::BeaconChain;
use clap::{App, Arg};
use db::{BeaconDB, DiskStore};
use eth1::{ChainStartLatch, DisabledEth1Observer};
use operation_pool::OperationPool;
use slog::{crit, info, o, Drain};
use state_processing::get_genesis_beacon_state;
use std::path::PathBuf;
use std::sync::Arc;
use types::{beacon_config, override_beacon_config, ChainSpec, Eth1Data};

fn main() {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let log = slog::Logger::root(drain, o!());

    let matches = App::new("pharos")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Davide Ferrari <davide@pharos.dev>")
        .about("Beacon chain consensus node")
        .arg(
            Arg::with_name("chain-config")
                .long("chain-config")
                .value_name("NAME")
                .help("The chain parameter preset to run with")
                .possible_values(&["foundation", "few-validators"])
                .default_value("foundation")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("datadir")
                .long("datadir")
                .value_name("DIR")
                .help("The directory holding the chain database")
                .default_value(".pharos")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("genesis-json")
                .long("genesis-json")
                .value_name("FILE")
                .help("A JSON file with the chain-start deposits and genesis time")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("rpc-address")
                .long("rpc-address")
                .value_name("ADDRESS")
                .help("The address the gRPC server listens on")
                .default_value("127.0.0.1")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("rpc-port")
                .long("rpc-port")
                .value_name("PORT")
                .help("The port the gRPC server listens on")
                .default_value("5051")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("eth1-endpoint")
                .long("eth1-endpoint")
                .value_name("URL")
                .help("The ETH1 JSON-RPC endpoint the deposit follower connects to")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("deposit-contract")
                .long("deposit-contract")
                .value_name("ADDRESS")
                .help("The address of the deposit contract on the ETH1 chain")
                .takes_value(true),
        )
        .get_matches();

    let spec = match matches.value_of("chain-config") {
        Some("few-validators") => ChainSpec::few_validators(),
        _ => ChainSpec::foundation(),
    };
    override_beacon_config(spec);
    let spec = beacon_config();

    let datadir = PathBuf::from(matches.value_of("datadir").expect("has a default"));
    if let Err(e) = std::fs::create_dir_all(&datadir) {
        crit!(log, "Could not create the data directory"; "error" => format!("{:?}", e));
        return;
    }
    let store = match DiskStore::open(&datadir.join("chain_db")) {
        Ok(store) => store,
        Err(e) => {
            crit!(log, "Could not open the database"; "error" => format!("{:?}", e));
            return;
        }
    };

    let genesis_path = matches.value_of("genesis-json").expect("required");
    let genesis = match genesis_file::load(genesis_path) {
        Ok(genesis) => genesis,
        Err(e) => {
            crit!(log, "Could not load the genesis file"; "error" => e, "path" => genesis_path);
            return;
        }
    };

    info!(
        log,
        "Starting from a genesis file";
        "deposits" => genesis.deposits.len(),
        "genesis_time" => genesis.genesis_time,
    );

    let genesis_state = get_genesis_beacon_state(
        &genesis.deposits,
        genesis.genesis_time,
        Eth1Data::default(),
        &spec,
    );

    let chain_start = Arc::new(ChainStartLatch::new());
    chain_start.fire(genesis.genesis_time);

    let chain = match BeaconChain::from_genesis(
        Arc::new(BeaconDB::new(store)),
        Arc::new(OperationPool::new()),
        // TODO(eth1): swap in the deposit-log follower once it can speak to
        // `--eth1-endpoint`.
        Arc::new(DisabledEth1Observer),
        chain_start,
        genesis_state,
        (*spec).clone(),
        log.clone(),
    ) {
        Ok(chain) => Arc::new(chain),
        Err(e) => {
            crit!(log, "Could not initialize the beacon chain"; "error" => format!("{:?}", e));
            return;
        }
    };

    let rpc_config = rpc::RPCConfig {
        enabled: true,
        listen_address: matches
            .value_of("rpc-address")
            .and_then(|a| a.parse().ok())
            .unwrap_or_else(|| std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: matches
            .value_of("rpc-port")
            .and_then(|p| p.parse().ok())
            .unwrap_or(5051),
    };

    let _server = match rpc::start_server(&rpc_config, chain, &log) {
        Ok(server) => server,
        Err(e) => {
            crit!(log, "Could not start the RPC server"; "error" => format!("{:?}", e));
            return;
        }
    };

    // The RPC server runs on its own event loops; this thread only has to
    // stay alive.
    loop {
        std::thread::park();
    }
}
