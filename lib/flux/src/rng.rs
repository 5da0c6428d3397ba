//! A `rand::Rng` shared across threads behind one mutex, mirroring the C
//! implementation's single `srand`/`rand()` pair: the whole process draws from one
//! seeded stream so a given `-s<seed>` reproduces the same key pairs and storage
//! path identifiers run to run.

use rand::rngs::StdRng;
use rand::{Error, RngCore, SeedableRng};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct SharedRng(Arc<Mutex<StdRng>>);

impl SharedRng {
    pub fn new(seed: u64) -> SharedRng {
        SharedRng(Arc::new(Mutex::new(StdRng::seed_from_u64(seed))))
    }
}

impl RngCore for SharedRng {
    fn next_u32(&mut self) -> u32 {
        self.0.lock().unwrap().next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.0.lock().unwrap().next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.lock().unwrap().fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.0.lock().unwrap().try_fill_bytes(dest)
    }
}
