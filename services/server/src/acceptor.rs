//! Non-blocking accept loop, worker hand-off, and capacity refusal (spec §4.9).

use crate::registry::Registry;
use crate::worker::{WorkerHandle, WorkerStatus};
use flux::logging::{info, warn, Logger};
use std::io::{self, BufRead, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use transport::frame;

const REFUSAL_MESSAGE: &str = "Connection refused by the server.";
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct Acceptor {
    listener: TcpListener,
    workers: Vec<WorkerHandle>,
    registry: Arc<Mutex<Registry>>,
    log: Logger,
}

impl Acceptor {
    pub fn new(listener: TcpListener, workers: Vec<WorkerHandle>, registry: Arc<Mutex<Registry>>, log: Logger) -> io::Result<Acceptor> {
        listener.set_nonblocking(true)?;
        Ok(Acceptor {
            listener,
            workers,
            registry,
            log,
        })
    }

    /// Runs until an administrator types `quit`. Returns the number of users on
    /// record at shutdown, for the closing banner.
    pub fn run(&mut self) -> io::Result<usize> {
        let stdin = io::stdin();
        loop {
            if self.all_workers_pending() {
                match self.poll_admin_line(&stdin)? {
                    AdminCommand::Quit => break,
                    AdminCommand::Help | AdminCommand::Unrecognized | AdminCommand::None => {}
                }
            }

            match self.listener.accept() {
                Ok((stream, addr)) => {
                    info!(self.log, "accepted connection"; "peer" => %addr);
                    self.dispatch_or_refuse(stream);
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(IDLE_POLL_INTERVAL);
                }
                Err(err) => return Err(err),
            }
        }

        self.shutdown()
    }

    fn all_workers_pending(&self) -> bool {
        self.workers.iter().all(|w| w.status() == WorkerStatus::Pending)
    }

    fn poll_admin_line(&self, stdin: &io::Stdin) -> io::Result<AdminCommand> {
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(AdminCommand::None);
        }
        Ok(match line.trim() {
            "quit" => AdminCommand::Quit,
            "help" => {
                println!("commands: quit, help");
                AdminCommand::Help
            }
            _ => AdminCommand::Unrecognized,
        })
    }

    fn dispatch_or_refuse(&mut self, stream: TcpStream) {
        match self.workers.iter().find(|w| w.status() == WorkerStatus::Pending) {
            Some(worker) => worker.assign(stream),
            None => self.refuse(stream),
        }
    }

    /// S4: accept regardless, drain one framed message best-effort, send the plaintext
    /// refusal, close. The original implementation's reason for reading a message
    /// before refusing is unclear (open question, §9); preserved here for
    /// bug-for-bug compatibility with the documented scenario.
    fn refuse(&self, mut stream: TcpStream) {
        warn!(self.log, "pool saturated, refusing connection");
        let mut drained = Vec::new();
        let _ = frame::recv_framed(&mut stream, &mut drained);
        let _ = stream.write_all(REFUSAL_MESSAGE.as_bytes());
        let _ = stream.shutdown(std::net::Shutdown::Both);
    }

    fn shutdown(&mut self) -> io::Result<usize> {
        for worker in &self.workers {
            worker.request_shutdown();
        }
        for worker in &mut self.workers {
            worker.join();
        }
        let registry = self.registry.lock().unwrap();
        registry.snapshot()?;
        Ok(registry.len())
    }
}

enum AdminCommand {
    Quit,
    Help,
    Unrecognized,
    None,
}
