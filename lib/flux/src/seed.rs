use std::time::{SystemTime, UNIX_EPOCH};

/// Default PRNG seed: wall-clock seconds since the epoch, used whenever the operator
/// does not pass `-s<seed>` on the server or client command line.
#[inline]
pub fn wall_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs()
}
