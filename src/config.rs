//! Gate configuration.
//!
//! Read once at construction; there is no hot reload. Limiter state is
//! process-local and resets on restart.

use std::time::Duration;

use serde::Deserialize;

/// Invalid construction-time configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("max_concurrent_requests must be at least 1")]
    ZeroConcurrency,

    #[error("queue_timeout_ms must be at least 1")]
    ZeroQueueTimeout,
}

/// Configuration for an [`AdmissionGate`](crate::AdmissionGate).
///
/// Defaults match a mid-size deployment: 100 general slots, 2 heavy
/// slots, a 50-deep wait queue, and a 5 second queue timeout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Upper bound on concurrently executing handlers.
    pub max_concurrent_requests: u32,
    /// Upper bound on concurrently executing heavy handlers. May be 0 to
    /// shed all heavy traffic.
    pub max_heavy_concurrent: u32,
    /// Combined capacity of the priority and normal wait queues. May be 0
    /// to disable queuing entirely.
    pub max_queue_size: usize,
    /// How long a queued request waits for a slot before being denied.
    pub queue_timeout_ms: u64,
    /// Paths with any of these prefixes are serviced from the priority queue.
    pub priority_path_prefixes: Vec<String>,
    /// Paths with any of these prefixes count against the heavy sub-pool.
    pub heavy_path_prefixes: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 100,
            max_heavy_concurrent: 2,
            max_queue_size: 50,
            queue_timeout_ms: 5_000,
            priority_path_prefixes: Vec::new(),
            heavy_path_prefixes: Vec::new(),
        }
    }
}

impl GateConfig {
    pub fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout_ms)
    }

    /// Reject configurations the gate cannot meaningfully run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_requests == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.queue_timeout_ms == 0 {
            return Err(ConfigError::ZeroQueueTimeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GateConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = GateConfig {
            max_concurrent_requests: 0,
            ..GateConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroConcurrency)
        ));
    }

    #[test]
    fn test_zero_queue_timeout_rejected() {
        let config = GateConfig {
            queue_timeout_ms: 0,
            ..GateConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroQueueTimeout)
        ));
    }

    #[test]
    fn test_zero_heavy_pool_is_allowed() {
        let config = GateConfig {
            max_heavy_concurrent: 0,
            ..GateConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_document() {
        let config: GateConfig = serde_json::from_str(
            r#"{
                "max_concurrent_requests": 8,
                "heavy_path_prefixes": ["/api/reports"]
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_concurrent_requests, 8);
        assert_eq!(config.heavy_path_prefixes, vec!["/api/reports"]);
        // Unlisted fields keep their defaults.
        assert_eq!(config.max_queue_size, 50);
        assert_eq!(config.queue_timeout(), Duration::from_secs(5));
    }
}
