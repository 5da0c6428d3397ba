//! Exercises the worker dispatch loop end-to-end over a real loopback socket,
//! covering scenarios S1-S3 from the request/response contract.

use flux::logging;
use flux::SharedRng;
use parcel_server::registry::Registry;
use parcel_server::store::Store;
use parcel_server::worker::{self, WorkerContext};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use transport::buffer::Buffer;
use transport::codec::MessageChannel;
use transport::handshake;
use transport::protocol::{ExpectPayload, Request, Response, Status};

fn connect(addr: SocketAddr, seed: u64) -> MessageChannel {
    let mut stream = TcpStream::connect(addr).unwrap();
    let mut rng = SharedRng::new(seed);
    let log = logging::init(false);
    let (keypair, peer_public) = handshake::client_handshake(&mut stream, &mut rng, &log).unwrap();
    MessageChannel::new(stream, keypair.private, peer_public)
}

fn roundtrip(channel: &mut MessageChannel, request: Request, expect: ExpectPayload) -> Response {
    let mut buf = Buffer::new(8192);
    request.encode(&mut buf).unwrap();
    channel.send(&buf).unwrap();
    let mut incoming = channel.recv().unwrap();
    Response::decode(&mut incoming, expect).unwrap()
}

/// Binds a loopback listener and one worker sharing `dir` as storage root. The
/// caller is responsible for accepting one connection and assigning it.
fn make_listener_and_worker(dir: &std::path::Path) -> (TcpListener, parcel_server::worker::WorkerHandle) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let registry = Arc::new(Mutex::new(Registry::load(dir.join("db.bin")).unwrap()));
    let store = Arc::new(Store::new(dir));
    let ctx = WorkerContext {
        registry,
        store,
        rng: SharedRng::new(1),
        log: logging::init(false),
    };
    (listener, worker::spawn(0, ctx))
}

#[test]
fn s1_name_send_list_pull() {
    let dir = tempfile::tempdir().unwrap();
    let (listener, worker) = make_listener_and_worker(dir.path());
    let addr = listener.local_addr().unwrap();

    let client = thread::spawn(move || {
        let mut channel = connect(addr, 42);

        let resp = roundtrip(&mut channel, Request::Name { name: b"alice".to_vec() }, ExpectPayload::None);
        assert_eq!(resp, Response::Status(Status::Ok));

        let resp = roundtrip(
            &mut channel,
            Request::Send {
                name: b"./hello.txt".to_vec(),
                content: b"Hi!".to_vec(),
            },
            ExpectPayload::None,
        );
        assert_eq!(resp, Response::Status(Status::Ok));

        let resp = roundtrip(&mut channel, Request::List, ExpectPayload::List);
        assert_eq!(resp, Response::List(vec![b"./hello.txt".to_vec()]));

        let resp = roundtrip(&mut channel, Request::Pull { name: b"hello".to_vec() }, ExpectPayload::Pull);
        assert_eq!(resp, Response::Pull(b"Hi!".to_vec()));

        // S3: a miss after a hit still replies BAD
        let resp = roundtrip(&mut channel, Request::Pull { name: b"zzz".to_vec() }, ExpectPayload::Pull);
        assert_eq!(resp, Response::Status(Status::Bad));
    });

    let (stream, _) = listener.accept().unwrap();
    worker.assign(stream);
    client.join().unwrap();
}

#[test]
fn s2_precondition_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let (listener, worker) = make_listener_and_worker(dir.path());
    let addr = listener.local_addr().unwrap();

    let client = thread::spawn(move || {
        let mut channel = connect(addr, 7);
        let resp = roundtrip(&mut channel, Request::List, ExpectPayload::List);
        assert_eq!(resp, Response::Status(Status::BadName));
    });

    let (stream, _) = listener.accept().unwrap();
    worker.assign(stream);
    client.join().unwrap();
}
