//! Session Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a diagnostic session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Route hardware operations to the simulated vehicle
    pub use_mock_mode: bool,
    /// Simulated adapter handshake time (ms)
    pub mock_connect_latency_ms: u64,
    /// Wait after starting the adapter reader before checking status (ms)
    pub adapter_settle_ms: u64,
    /// Simulated trouble-code read time (ms)
    pub mock_dtc_delay_ms: u64,
    /// Simulated trouble-code clear time (ms)
    pub mock_clear_delay_ms: u64,
    /// Upper bound on a single adapter call (ms)
    pub adapter_timeout_ms: u64,
    /// Upper bound on opening the adapter (ms)
    pub open_timeout_ms: u64,
    /// How long notifications stay on screen (ms)
    pub notification_duration_ms: u64,
    /// Buffered live samples before new ones are dropped
    pub live_channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            use_mock_mode: false,
            mock_connect_latency_ms: 2000,
            adapter_settle_ms: 3000,
            mock_dtc_delay_ms: 1500,
            mock_clear_delay_ms: 2000,
            adapter_timeout_ms: 10_000,
            open_timeout_ms: 15_000,
            notification_duration_ms: 3000,
            live_channel_capacity: 256,
        }
    }
}

impl SessionConfig {
    /// Config for a simulated vehicle
    pub fn mock() -> Self {
        Self {
            use_mock_mode: true,
            ..Default::default()
        }
    }

    pub fn mock_connect_latency(&self) -> Duration {
        Duration::from_millis(self.mock_connect_latency_ms)
    }

    pub fn adapter_settle(&self) -> Duration {
        Duration::from_millis(self.adapter_settle_ms)
    }

    pub fn mock_dtc_delay(&self) -> Duration {
        Duration::from_millis(self.mock_dtc_delay_ms)
    }

    pub fn mock_clear_delay(&self) -> Duration {
        Duration::from_millis(self.mock_clear_delay_ms)
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_millis(self.adapter_timeout_ms)
    }

    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }
}
