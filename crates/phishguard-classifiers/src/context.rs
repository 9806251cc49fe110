use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Per-run state handed to every component instead of process-wide globals.
#[derive(Debug, Clone)]
pub struct RunContext {
    seed: u64,
    artifact_root: PathBuf,
    log_target: String,
}

impl RunContext {
    pub fn new(seed: u64, artifact_root: impl Into<PathBuf>) -> Self {
        Self {
            seed,
            artifact_root: artifact_root.into(),
            log_target: "phishguard".to_string(),
        }
    }

    /// Route this run's log lines to a different `log` target.
    pub fn with_log_target(mut self, target: impl Into<String>) -> Self {
        self.log_target = target.into();
        self
    }

    pub fn artifact_root(&self) -> &Path {
        &self.artifact_root
    }

    pub fn log_target(&self) -> &str {
        &self.log_target
    }

    /// A fresh generator for one consumer. `stream` separates consumers so
    /// that adding randomness to one stage never shifts another.
    pub fn rng(&self, stream: u64) -> StdRng {
        StdRng::seed_from_u64(self.seed.wrapping_add(stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)))
    }
}
