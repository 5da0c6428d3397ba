#![allow(clippy::new_without_default)]

pub mod errors;
pub mod logging;
pub mod rng;
pub mod seed;

pub use errors::{ErrorKind, TransportError};
pub use rng::SharedRng;
