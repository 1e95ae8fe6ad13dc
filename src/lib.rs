//! Run a command and record its resource-usage trajectory.
//!
//! ```no_run
//! use procbench::{summarize, LaunchSpec, MonitorConfig, ProcessMonitor, ProcessRunner};
//!
//! # fn main() -> procbench::Result<()> {
//! let mut runner = ProcessRunner::new(LaunchSpec::new(vec!["sleep".into(), "1".into()]));
//! let pid = runner.start()?;
//! let result = ProcessMonitor::new(pid, MonitorConfig::default())?.run();
//! runner.wait(std::time::Duration::from_secs(1))?;
//! let summary = summarize(
//!     &result.samples,
//!     result.start_time,
//!     result.end_time,
//!     runner.info().exit_code,
//!     result.status,
//! );
//! println!("peak rss: {:?}", summary.rss_peak_bytes);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod output;
pub mod session;
pub mod summary;
pub mod testcase;

pub use crate::config::MonitorConfig;
pub use crate::core::{
    LaunchSpec, MonitorResult, MonitorStatus, ProcessInfo, ProcessMonitor, ProcessRunner, Sample,
};
pub use crate::error::{ProcbenchError, Result};
pub use crate::output::{OutputWriter, TestCaseResult};
pub use crate::session::{run_session, run_test_case, ErrorPolicy, SessionReport};
pub use crate::summary::{summarize, Summary};
pub use crate::testcase::TestCase;
