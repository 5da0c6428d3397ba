//! Server configuration: CLI flags layered on top of defaults, with an optional TOML
//! file for operators who don't want to repeat flags every launch (spec §6
//! "Environment" says no environment variables are consulted; it says nothing about
//! a config file, so this is additive ambient plumbing in the style of
//! `GameConfig::load`).

use serde_derive::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:25565";
pub const DEFAULT_THREAD_COUNT: usize = 4;

#[derive(Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub thread_count: usize,
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> ServerConfig {
        ServerConfig {
            address: DEFAULT_ADDRESS.to_string(),
            thread_count: DEFAULT_THREAD_COUNT,
            seed: None,
        }
    }
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ServerConfig, serdeconv::Error> {
        serdeconv::from_toml_file(path)
    }

    pub fn resolved_seed(&self) -> u64 {
        self.seed.unwrap_or_else(flux::seed::wall_clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = ServerConfig::default();
        assert_eq!(config.address, "127.0.0.1:25565");
        assert_eq!(config.thread_count, 4);
    }
}
