use std::sync::Arc;
use std::time::Duration;

use derive_builder::Builder;

use crate::error::Error;
use crate::merkle::{Keccak256Hasher, LeafMode, NodeHasher};

/// Configuration of a [`MerkleProofWorker`](super::MerkleProofWorker).
#[derive(Builder, Debug, Clone)]
#[builder(pattern = "owned")]
pub struct WorkerConfig {
    /// Worker threads draining the shared job queue.
    #[builder(default = "1")]
    pub threads: usize,
    /// Jobs that may wait in the queue before submission reports `QueueFull`.
    #[builder(default = "64")]
    pub queue_capacity: usize,
    /// How long a caller waits for a response before giving up.
    #[builder(default = "Duration::from_secs(30)")]
    pub response_timeout: Duration,
    #[builder(default)]
    pub leaf_mode: LeafMode,
    #[builder(default = "Arc::new(Keccak256Hasher)")]
    pub hasher: Arc<dyn NodeHasher>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            queue_capacity: 64,
            response_timeout: Duration::from_secs(30),
            leaf_mode: LeafMode::default(),
            hasher: Arc::new(Keccak256Hasher),
        }
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.threads == 0 {
            return Err(Error::InvalidConfig("threads must be >= 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::InvalidConfig("queue_capacity must be >= 1".into()));
        }
        if self.response_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "response_timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl WorkerConfigBuilder {
    pub fn build_validated(self) -> Result<WorkerConfig, Error> {
        let config = self
            .build()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::Sha256Hasher;

    #[test]
    fn builder_defaults_match_default() {
        let built = WorkerConfigBuilder::default()
            .build_validated()
            .expect("defaults are valid");
        let default = WorkerConfig::default();
        assert_eq!(built.threads, default.threads);
        assert_eq!(built.queue_capacity, default.queue_capacity);
        assert_eq!(built.response_timeout, default.response_timeout);
        assert_eq!(built.leaf_mode, LeafMode::Prehashed);
    }

    #[test]
    fn builder_overrides() {
        let config = WorkerConfigBuilder::default()
            .threads(4)
            .response_timeout(Duration::from_millis(250))
            .leaf_mode(LeafMode::Rehash)
            .hasher(Arc::new(Sha256Hasher))
            .build_validated()
            .expect("valid");
        assert_eq!(config.threads, 4);
        assert_eq!(config.leaf_mode, LeafMode::Rehash);
    }

    #[test]
    fn rejects_degenerate_settings() {
        for builder in [
            WorkerConfigBuilder::default().threads(0),
            WorkerConfigBuilder::default().queue_capacity(0),
            WorkerConfigBuilder::default().response_timeout(Duration::ZERO),
        ] {
            let err = builder.build_validated().expect_err("invalid");
            assert!(matches!(err, Error::InvalidConfig(_)));
        }
    }
}
