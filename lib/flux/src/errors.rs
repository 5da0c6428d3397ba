//! Shared error taxonomy. §7 of the design groups failures into a handful of kinds
//! rather than one type per fallible call; every crate in the workspace reuses this
//! enum instead of inventing its own.

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum ErrorKind {
    /// The peer closed the connection or a syscall returned a fatal errno.
    Io(io::ErrorKind),
    /// A length-prefixed field promised more bytes than the stream actually had.
    ShortRead,
    /// A write was attempted past a buffer's fixed capacity.
    BufferFull,
    /// A growable buffer could not be allocated.
    AllocationFailed,
}

/// Transport-lost / protocol-violation errors (§7). There is exactly one recovery
/// action for all of them: the caller abandons the connection.
#[derive(Debug)]
pub struct TransportError(pub ErrorKind);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ErrorKind::Io(kind) => write!(f, "transport lost: {kind:?}"),
            ErrorKind::ShortRead => write!(f, "transport lost: short read on a framed field"),
            ErrorKind::BufferFull => write!(f, "resource exhaustion: buffer full"),
            ErrorKind::AllocationFailed => write!(f, "resource exhaustion: allocation failed"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        TransportError(ErrorKind::Io(err.kind()))
    }
}

impl From<TransportError> for io::Error {
    fn from(err: TransportError) -> Self {
        match err.0 {
            ErrorKind::Io(kind) => io::Error::new(kind, "transport lost"),
            ErrorKind::ShortRead => io::Error::new(io::ErrorKind::UnexpectedEof, "short read"),
            ErrorKind::BufferFull | ErrorKind::AllocationFailed => {
                io::Error::new(io::ErrorKind::OutOfMemory, "buffer exhausted")
            }
        }
    }
}
