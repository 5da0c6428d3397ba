//! Thread-pool worker lifecycle (spec §4.8): `pending -> init -> running -> alt`.
//!
//! The reference implementation has the worker spin, polling its own status under a
//! mutex until the acceptor flips it from `pending` to `init`. The design notes flag
//! this as a busy-wait that should become a channel handoff instead: each worker
//! blocks on an `mpsc::Receiver` until the acceptor sends it a socket (or a shutdown
//! token), so there is no polling loop at all. The `status` field survives as the
//! one piece of state the acceptor still reads across threads, to pick an idle
//! worker and to implement testable property 5 ("while W's status is not PENDING,
//! the acceptor never assigns it a socket").

use crate::registry::Registry;
use crate::store::Store;
use flux::logging::{debug, info, warn, Logger};
use flux::SharedRng;
use rand::Rng;
use std::io;
use std::net::TcpStream;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use transport::buffer::Buffer;
use transport::codec::MessageChannel;
use transport::handshake;
use transport::protocol::{Request, Response, Status};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WorkerStatus {
    Pending,
    Init,
    Running,
    Alt,
}

enum WorkerMessage {
    Connect(TcpStream),
    Shutdown,
}

pub struct WorkerHandle {
    id: usize,
    sender: mpsc::Sender<WorkerMessage>,
    status: Arc<Mutex<WorkerStatus>>,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn status(&self) -> WorkerStatus {
        *self.status.lock().unwrap()
    }

    /// Claims the worker and hands it the accepted socket. The status flip to
    /// `Init` happens here, synchronously, so a second `assign` cannot race a
    /// worker that has not woken up yet (testable property 5).
    pub fn assign(&self, stream: TcpStream) {
        *self.status.lock().unwrap() = WorkerStatus::Init;
        let _ = self.sender.send(WorkerMessage::Connect(stream));
    }

    pub fn request_shutdown(&self) {
        let _ = self.sender.send(WorkerMessage::Shutdown);
    }

    pub fn join(&mut self) {
        if let Some(handle) = self.join.take() {
            let _ = handle.join();
        }
    }
}

#[derive(Clone)]
pub struct WorkerContext {
    pub registry: Arc<Mutex<Registry>>,
    pub store: Arc<Store>,
    pub rng: SharedRng,
    pub log: Logger,
}

pub fn spawn(id: usize, ctx: WorkerContext) -> WorkerHandle {
    let (sender, receiver) = mpsc::channel();
    let status = Arc::new(Mutex::new(WorkerStatus::Pending));
    let status_for_thread = status.clone();

    let join = thread::Builder::new()
        .name(format!("worker-{id}"))
        .spawn(move || worker_loop(id, receiver, status_for_thread, ctx))
        .expect("failed to spawn worker thread");

    WorkerHandle {
        id,
        sender,
        status,
        join: Some(join),
    }
}

fn worker_loop(id: usize, receiver: mpsc::Receiver<WorkerMessage>, status: Arc<Mutex<WorkerStatus>>, ctx: WorkerContext) {
    loop {
        match receiver.recv() {
            Err(_) | Ok(WorkerMessage::Shutdown) => {
                *status.lock().unwrap() = WorkerStatus::Alt;
                debug!(ctx.log, "worker shutting down"; "worker_id" => id);
                return;
            }
            Ok(WorkerMessage::Connect(stream)) => {
                handle_connection(id, stream, &status, &ctx);
                *status.lock().unwrap() = WorkerStatus::Pending;
            }
        }
    }
}

fn handle_connection(id: usize, mut stream: TcpStream, status: &Arc<Mutex<WorkerStatus>>, ctx: &WorkerContext) {
    let mut rng = ctx.rng.clone();

    let handshake_result = handshake::server_handshake(&mut stream, &mut rng, &ctx.log);

    let (keypair, peer_public) = match handshake_result {
        Ok(pair) => pair,
        Err(err) => {
            warn!(ctx.log, "handshake failed, worker returns to pending"; "worker_id" => id, "error" => %err);
            return;
        }
    };

    *status.lock().unwrap() = WorkerStatus::Running;
    info!(ctx.log, "client connected"; "worker_id" => id);

    let mut channel = MessageChannel::new(stream, keypair.private, peer_public);
    let mut assigned_path: Option<String> = None;

    loop {
        let mut incoming = match channel.recv() {
            Ok(buf) => buf,
            Err(err) => {
                debug!(ctx.log, "transport lost, worker returns to pending"; "worker_id" => id, "error" => %err);
                return;
            }
        };

        let request = match Request::decode(&mut incoming) {
            Ok(Some(request)) => request,
            Ok(None) => continue, // unknown command: silently ignored (§7)
            Err(err) => {
                debug!(ctx.log, "protocol violation, worker returns to pending"; "worker_id" => id, "error" => %err);
                return;
            }
        };

        if matches!(request, Request::Quit) {
            info!(ctx.log, "client quit"; "worker_id" => id);
            return;
        }

        let response = if let Request::Name { name } = &request {
            match resolve_or_create_path(&ctx.registry, name, &mut rng) {
                Ok(path) => {
                    assigned_path = Some(path);
                    Response::Status(Status::Ok)
                }
                Err(err) => {
                    debug!(ctx.log, "registry insert failed, worker stays connected"; "worker_id" => id, "error" => %err);
                    Response::Status(Status::Bad)
                }
            }
        } else {
            dispatch(&request, &assigned_path, ctx)
        };

        if send_response(&mut channel, &response).is_err() {
            debug!(ctx.log, "transport lost while replying, worker returns to pending"; "worker_id" => id);
            return;
        }
    }
}

/// Looks up `name` in the registry, or mints a fresh entry for it. The
/// `db.bin` snapshot write inside `insert` can fail (disk full, permission
/// error, a racing rename); the caller degrades that into `BAD` for this one
/// client rather than letting the error unwind through the `MutexGuard` and
/// poison the registry for every other worker.
fn resolve_or_create_path(registry: &Arc<Mutex<Registry>>, name: &[u8], rng: &mut SharedRng) -> io::Result<String> {
    let mut registry = registry.lock().unwrap();
    match registry.lookup(name) {
        Some(path) => Ok(path),
        None => registry.insert(name, rng),
    }
}

/// Dispatches a decoded request and builds its response. `NAME` is handled by
/// the caller, since a failed registry insert needs to reply `BAD` instead of
/// the `OK` this function would otherwise hand back unconditionally. `SEND`/
/// `LIST`/`PULL` without a prior successful `NAME` reply `BAD_NAME` and return
/// immediately - the reference implementation replies `BAD_NAME` and then
/// keeps going as if a path had been assigned, reading through a null
/// pointer. That is a bug (design notes flag 2); this reimplementation
/// short-circuits.
fn dispatch(request: &Request, assigned_path: &Option<String>, ctx: &WorkerContext) -> Response {
    match request {
        Request::Quit => unreachable!("Quit is handled by the caller before dispatch"),
        Request::Name { .. } => unreachable!("Name is handled by the caller before dispatch"),
        Request::Send { name, content } => {
            let Some(path) = assigned_path else {
                return Response::Status(Status::BadName);
            };
            match ctx.store.append(path, name, content) {
                Ok(()) => Response::Status(Status::Ok),
                Err(_) => Response::Status(Status::Bad),
            }
        }
        Request::List => {
            let Some(path) = assigned_path else {
                return Response::Status(Status::BadName);
            };
            match ctx.store.list(path) {
                Ok(names) => Response::List(names),
                Err(_) => Response::Status(Status::Bad),
            }
        }
        Request::Pull { name } => {
            let Some(path) = assigned_path else {
                return Response::Status(Status::BadName);
            };
            match ctx.store.pull(path, name) {
                Ok(Some(content)) => Response::Pull(content),
                Ok(None) | Err(_) => Response::Status(Status::Bad),
            }
        }
    }
}

fn send_response(channel: &mut MessageChannel, response: &Response) -> transport::frame::Result<()> {
    let outgoing_len = response_len(response);
    let mut outgoing = Buffer::new(outgoing_len);
    response
        .encode(&mut outgoing)
        .map_err(|_| flux::TransportError(flux::ErrorKind::BufferFull))?;
    channel.send(&outgoing)
}

fn response_len(response: &Response) -> usize {
    match response {
        Response::Status(_) => 4,
        Response::List(names) => 8 + names.iter().map(|n| 4 + n.len()).sum::<usize>(),
        Response::Pull(content) => 8 + content.len(),
    }
}
