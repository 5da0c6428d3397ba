use clap::{App, Arg};
use flux::logging::{self, info};
use flux::SharedRng;
use parcel_server::acceptor::Acceptor;
use parcel_server::config::ServerConfig;
use parcel_server::registry::Registry;
use parcel_server::store::Store;
use parcel_server::worker::{self, WorkerContext};
use std::net::TcpListener;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

fn main() -> ExitCode {
    let matches = App::new("parcel-server")
        .about("Per-user file storage server")
        .arg(Arg::with_name("port").short("p").takes_value(true).help("listen port"))
        .arg(Arg::with_name("threads").short("c").takes_value(true).help("worker thread count"))
        .arg(Arg::with_name("seed").short("s").takes_value(true).help("RNG seed"))
        .arg(Arg::with_name("config").short("f").long("config").takes_value(true).help("TOML config file"))
        .arg(Arg::with_name("verbose").short("v").long("verbose").help("debug logging"))
        .get_matches();

    let log = logging::init(matches.is_present("verbose"));

    let mut config = match matches.value_of("config") {
        Some(path) => match ServerConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("failed to load config {path}: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => ServerConfig::default(),
    };

    if let Some(port) = matches.value_of("port") {
        let host = config.address.rsplit_once(':').map(|(host, _)| host).unwrap_or("127.0.0.1");
        config.address = format!("{host}:{port}");
    }
    if let Some(threads) = matches.value_of("threads") {
        match threads.parse() {
            Ok(n) => config.thread_count = n,
            Err(_) => {
                eprintln!("invalid thread count: {threads}");
                return ExitCode::FAILURE;
            }
        }
    }
    if let Some(seed) = matches.value_of("seed") {
        match seed.parse() {
            Ok(n) => config.seed = Some(n),
            Err(_) => {
                eprintln!("invalid seed: {seed}");
                return ExitCode::FAILURE;
            }
        }
    }

    let rng = SharedRng::new(config.resolved_seed());

    let registry = match Registry::load("db.bin") {
        Ok(registry) => Arc::new(Mutex::new(registry)),
        Err(err) => {
            eprintln!("failed to load db.bin: {err}");
            return ExitCode::FAILURE;
        }
    };

    let listener = match TcpListener::bind(&config.address) {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("failed to bind {}: {err}", config.address);
            return ExitCode::FAILURE;
        }
    };

    let store = Arc::new(Store::new("."));
    let ctx = WorkerContext {
        registry: registry.clone(),
        store,
        rng,
        log: log.clone(),
    };

    let workers = (0..config.thread_count).map(|id| worker::spawn(id, ctx.clone())).collect();

    println!("> Server ready with {} user stored", registry.lock().unwrap().len());
    info!(log, "listening"; "address" => &config.address, "threads" => config.thread_count);

    let mut acceptor = match Acceptor::new(listener, workers, registry, log.clone()) {
        Ok(acceptor) => acceptor,
        Err(err) => {
            eprintln!("failed to prepare listener: {err}");
            return ExitCode::FAILURE;
        }
    };

    match acceptor.run() {
        Ok(count) => {
            println!("> Server closed with {count} user stored");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("server loop failed: {err}");
            ExitCode::FAILURE
        }
    }
}
