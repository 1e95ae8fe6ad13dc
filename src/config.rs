//! Monitoring configuration and tunable defaults

use crate::error::{ProcbenchError, Result};
use std::time::Duration;

pub mod defaults {
    use std::time::Duration;

    pub const SAMPLING_INTERVAL_MS: u64 = 100;
    pub const TIMEOUT_SECS: f64 = 60.0;

    /// Time a process gets to exit after SIGTERM before it is killed.
    pub const TERMINATE_GRACE: Duration = Duration::from_secs(3);
    /// Bound on reaping a process the monitor saw exit on its own.
    pub const POST_EXIT_WAIT: Duration = Duration::from_secs(1);
    pub const WAIT_POLL: Duration = Duration::from_millis(10);
}

/// Settings for a single monitoring run
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub sampling_interval: Duration,
    pub timeout: Duration,
    pub include_children: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sampling_interval: Duration::from_millis(defaults::SAMPLING_INTERVAL_MS),
            timeout: Duration::from_secs_f64(defaults::TIMEOUT_SECS),
            include_children: false,
        }
    }
}

impl MonitorConfig {
    pub fn builder() -> MonitorConfigBuilder {
        MonitorConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.sampling_interval.is_zero() {
            return Err(ProcbenchError::InvalidConfiguration(
                "sampling interval must be greater than zero".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ProcbenchError::InvalidConfiguration(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MonitorConfigBuilder {
    config: MonitorConfig,
}

impl MonitorConfigBuilder {
    pub fn sampling_interval_ms(mut self, ms: u64) -> Self {
        self.config.sampling_interval = Duration::from_millis(ms);
        self
    }

    /// Non-finite, negative or out-of-range values are rejected by `build`.
    pub fn timeout_secs(mut self, secs: f64) -> Self {
        self.config.timeout = Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO);
        self
    }

    pub fn include_children(mut self, include: bool) -> Self {
        self.config.include_children = include;
        self
    }

    pub fn build(self) -> Result<MonitorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
