mod commands;

use clap::{App, Arg};
use flux::logging;
use flux::SharedRng;
use std::io::{self, BufRead, Write};
use std::net::TcpStream;
use std::process::ExitCode;
use transport::codec::MessageChannel;
use transport::handshake;

fn main() -> ExitCode {
    let matches = App::new("parcel-client")
        .about("Interactive client for the file storage service")
        .arg(Arg::with_name("address").short("a").takes_value(true).help("server host"))
        .arg(Arg::with_name("port").short("p").takes_value(true).help("server port"))
        .arg(Arg::with_name("seed").short("s").takes_value(true).help("RNG seed"))
        .arg(Arg::with_name("verbose").short("v").long("verbose").help("debug logging"))
        .get_matches();

    let log = logging::init(matches.is_present("verbose"));

    let host = matches.value_of("address").unwrap_or("127.0.0.1");
    let port = matches.value_of("port").unwrap_or("25565");
    let address = format!("{host}:{port}");

    let seed = matches
        .value_of("seed")
        .map(|s| s.parse().expect("seed must be an integer"))
        .unwrap_or_else(flux::seed::wall_clock);
    let mut rng = SharedRng::new(seed);

    let mut stream = match TcpStream::connect(&address) {
        Ok(stream) => stream,
        Err(err) => {
            eprintln!("failed to connect to {address}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let (keypair, peer_public) = match handshake::client_handshake(&mut stream, &mut rng, &log) {
        Ok(pair) => pair,
        Err(err) => {
            eprintln!("handshake failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut channel = MessageChannel::new(stream, keypair.private, peer_public);
    println!("connected to {address}");

    run_prompt(&mut channel);
    ExitCode::SUCCESS
}

/// Reads commands from stdin until one does not start with a recognized verb.
/// The first four characters of the line select the command; the argument is
/// everything after a single space (spec §6).
fn run_prompt(channel: &mut MessageChannel) {
    let stdin = io::stdin();
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim_end_matches('\n');

        let verb = line.get(..4).unwrap_or(line);
        let argument = line.get(5..).unwrap_or("");

        let result = match verb {
            "name" => commands::cmd_name(channel, argument),
            "send" => commands::cmd_send(channel, argument),
            "list" => commands::cmd_list(channel),
            "pull" => commands::cmd_pull(channel, argument),
            "help" => {
                print_help();
                Ok(())
            }
            _ => {
                commands::cmd_quit(channel);
                break;
            }
        };

        if let Err(err) = result {
            eprintln!("error: {err}");
        }
    }
}

fn print_help() {
    println!("name X   set display name to X");
    println!("send P   upload the file at path P");
    println!("list     list uploaded entries");
    println!("pull N   download the first entry whose name contains N");
    println!("help     show this message");
    println!("anything else quits");
}
