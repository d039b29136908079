use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::infrastructure::error::{Result, TransportError};

/// Largest payload the platform's UDP path carries
pub const DEFAULT_MAX_PACKET_BYTES: usize = 65_507;

/// Configuration for a transport role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Registry capacity (server only)
    pub max_connections: usize,

    /// Receive loop cadence in milliseconds
    pub tick_rate_ms: u64,

    /// Client handshake budget in milliseconds
    pub timeout_ms: u64,

    /// Packets this long or longer are dropped
    pub max_packet_bytes: usize,

    /// Queue depth that triggers a backpressure warning
    pub queue_warn_threshold: usize,

    /// Minimum gap between two backpressure warnings
    pub queue_warn_cooldown_secs: u64,

    /// A dispatch batch slower than this logs a warning
    pub slow_dispatch_warn_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_connections: 16,
            tick_rate_ms: 10,
            timeout_ms: 15_000,
            max_packet_bytes: DEFAULT_MAX_PACKET_BYTES,
            queue_warn_threshold: 1_000,
            queue_warn_cooldown_secs: 5,
            slow_dispatch_warn_ms: 50,
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_tick_rate(mut self, ms: u64) -> Self {
        self.tick_rate_ms = ms;
        self
    }

    pub fn with_timeout(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    pub fn with_max_packet_bytes(mut self, bytes: usize) -> Self {
        self.max_packet_bytes = bytes;
        self
    }

    pub fn with_queue_warning(mut self, threshold: usize, cooldown_secs: u64) -> Self {
        self.queue_warn_threshold = threshold;
        self.queue_warn_cooldown_secs = cooldown_secs;
        self
    }

    pub fn with_slow_dispatch_warning(mut self, ms: u64) -> Self {
        self.slow_dispatch_warn_ms = ms;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_rate_ms == 0 {
            return Err(TransportError::InvalidConfig(
                "tick_rate_ms must be at least 1".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(TransportError::InvalidConfig(
                "timeout_ms must be at least 1".to_string(),
            ));
        }
        // One tag byte plus at least one payload byte must fit below the ceiling
        if self.max_packet_bytes < 3 {
            return Err(TransportError::InvalidConfig(format!(
                "max_packet_bytes {} is too small",
                self.max_packet_bytes
            )));
        }
        Ok(())
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn queue_warn_cooldown(&self) -> Duration {
        Duration::from_secs(self.queue_warn_cooldown_secs)
    }

    pub fn slow_dispatch_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_dispatch_warn_ms)
    }
}
