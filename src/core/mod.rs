//! Core process execution and sampling
//!
//! `ProcessRunner` owns the child, `ProcessMonitor` observes it through a
//! `ResourceProbe` on a `Clock`-driven cadence.

pub mod clock;
pub mod probe;
pub mod process_monitor;
pub mod process_runner;

// Re-export main types
pub use clock::{Clock, MonotonicClock};
pub use probe::{ProbeError, ResourceProbe, Snapshot, SysinfoProbe};
pub use process_monitor::{MonitorResult, MonitorStatus, ProcessMonitor, Sample};
pub use process_runner::{LaunchSpec, ProcessInfo, ProcessRunner};
