//! Configuration for the scan pipeline

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

fn default_queue_multiplier() -> usize {
    4
}

fn default_connections_per_host() -> u32 {
    1
}

/// Process-wide pipeline configuration, fixed for the pipeline's lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of concurrent scan workers
    pub workers: usize,

    /// Queue capacity = workers * queue_multiplier
    #[serde(default = "default_queue_multiplier")]
    pub queue_multiplier: usize,

    /// Destination port for all connections
    pub port: u16,

    /// Idle timeout in seconds for dial/read/write; 0 disables deadlines
    #[serde(default)]
    pub idle_timeout_secs: u64,

    /// Number of independent connection-runs per target
    #[serde(default = "default_connections_per_host")]
    pub connections_per_host: u32,

    /// Keep running later probes after one returns an error
    #[serde(default)]
    pub continue_on_error: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            queue_multiplier: default_queue_multiplier(),
            port: 80,
            idle_timeout_secs: 10,
            connections_per_host: 1,
            continue_on_error: false,
        }
    }
}

impl PipelineConfig {
    /// Create a configuration for the given destination port
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Set the worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the queue capacity multiplier
    pub fn with_queue_multiplier(mut self, multiplier: usize) -> Self {
        self.queue_multiplier = multiplier;
        self
    }

    /// Set the idle timeout in seconds (0 disables deadlines)
    pub fn with_idle_timeout_secs(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }

    /// Set the number of connection-runs per target
    pub fn with_connections_per_host(mut self, count: u32) -> Self {
        self.connections_per_host = count;
        self
    }

    /// Set the continue-on-error policy
    pub fn with_continue_on_error(mut self, enabled: bool) -> Self {
        self.continue_on_error = enabled;
        self
    }

    /// Idle timeout as a Duration; None when deadlines are disabled
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_secs > 0 {
            Some(Duration::from_secs(self.idle_timeout_secs))
        } else {
            None
        }
    }

    /// Capacity of the target and result queues
    pub fn queue_capacity(&self) -> usize {
        self.workers * self.queue_multiplier
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| crate::ScanError::Config(format!("failed to read config file: {}", e)))?;

        let config: PipelineConfig = toml::from_str(&content)
            .map_err(|e| crate::ScanError::Config(format!("failed to parse TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.workers == 0 {
            return Err(crate::ScanError::Config(
                "worker count must be greater than 0".to_string(),
            ));
        }

        if self.queue_multiplier == 0 {
            return Err(crate::ScanError::Config(
                "queue multiplier must be greater than 0".to_string(),
            ));
        }

        if self.connections_per_host == 0 {
            return Err(crate::ScanError::Config(
                "connections per host must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_capacity_follows_multiplier() {
        let config = PipelineConfig::new(80).with_workers(8);
        assert_eq!(config.queue_capacity(), 32);

        let config = config.with_queue_multiplier(2);
        assert_eq!(config.queue_capacity(), 16);
    }

    #[test]
    fn zero_timeout_disables_deadlines() {
        let config = PipelineConfig::new(443).with_idle_timeout_secs(0);
        assert!(config.idle_timeout().is_none());

        let config = config.with_idle_timeout_secs(5);
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn validation_rejects_zero_workers() {
        let config = PipelineConfig::new(80).with_workers(0);
        assert!(config.validate().is_err());

        let config = PipelineConfig::new(80).with_connections_per_host(0);
        assert!(config.validate().is_err());
    }
}
