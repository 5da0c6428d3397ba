//! Thin wrapper around `slog`/`sloggers` so every binary in the workspace sets up
//! logging the same way instead of hand-rolling a `Drain` stack.

pub use slog::{debug, info, o, trace, warn, Logger};

use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::Severity;
use sloggers::Build;

/// Builds the terminal logger used by both the server and the client binaries.
///
/// `verbose` raises the level from `info` to `debug` (the `-v` flag on both CLIs).
pub fn init(verbose: bool) -> Logger {
    let mut builder = TerminalLoggerBuilder::new();
    builder.destination(Destination::Stderr);
    builder.level(if verbose { Severity::Debug } else { Severity::Info });

    builder
        .build()
        .unwrap_or_else(|_| Logger::root(slog::Discard, o!()))
}
