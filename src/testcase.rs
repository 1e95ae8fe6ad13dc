//! Test-case definitions loaded from JSON files

use crate::config::{defaults, MonitorConfig};
use crate::core::process_runner::LaunchSpec;
use crate::error::{ProcbenchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

fn default_sampling_interval_ms() -> u64 {
    defaults::SAMPLING_INTERVAL_MS
}

fn default_timeout_sec() -> f64 {
    defaults::TIMEOUT_SECS
}

/// A command to run and how to monitor it
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TestCase {
    pub id: String,
    pub command: Vec<String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default = "default_sampling_interval_ms")]
    pub sampling_interval_ms: u64,
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: f64,
    #[serde(default)]
    pub include_children: bool,
}

impl TestCase {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let invalid = |reason: String| ProcbenchError::InvalidTestCase {
            path: path.to_path_buf(),
            reason,
        };

        let contents = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let testcase: TestCase =
            serde_json::from_str(&contents).map_err(|e| invalid(e.to_string()))?;
        testcase.validate().map_err(|e| invalid(e.to_string()))?;
        Ok(testcase)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ProcbenchError::InvalidConfiguration(
                "test case id cannot be empty".to_string(),
            ));
        }
        if self.command.is_empty() || self.command[0].is_empty() {
            return Err(ProcbenchError::InvalidConfiguration(
                "command cannot be empty".to_string(),
            ));
        }
        self.monitor_config().map(|_| ())
    }

    pub fn monitor_config(&self) -> Result<MonitorConfig> {
        MonitorConfig::builder()
            .sampling_interval_ms(self.sampling_interval_ms)
            .timeout_secs(self.timeout_sec)
            .include_children(self.include_children)
            .build()
    }

    pub fn launch_spec(&self) -> LaunchSpec {
        LaunchSpec {
            command: self.command.clone(),
            cwd: self.cwd.clone(),
            env: self.env.clone(),
        }
    }
}
