//! Fixed-cadence sampling of a live process
//!
//! The monitor only observes. On timeout it reports `MonitorStatus::Timeout`
//! and leaves stopping the process to whoever owns it.

use crate::config::MonitorConfig;
use crate::core::clock::{Clock, MonotonicClock};
use crate::core::probe::{ProbeError, ResourceProbe, Snapshot, SysinfoProbe};
use crate::error::Result;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Running,
    Completed,
    Timeout,
    Error,
}

impl MonitorStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Timeout => "timeout",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resource-usage observation
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Sample {
    /// Seconds on the monitor's monotonic clock.
    pub timestamp: f64,
    pub cpu_percent: f32,
    pub rss_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vms_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descendants: Option<Vec<u32>>,
}

impl Sample {
    pub fn from_snapshot(timestamp: Duration, snapshot: Snapshot) -> Self {
        Self {
            timestamp: timestamp.as_secs_f64(),
            cpu_percent: snapshot.cpu_percent,
            rss_bytes: snapshot.rss_bytes,
            vms_bytes: snapshot.vms_bytes,
            thread_count: snapshot.thread_count,
            descendants: snapshot.descendants,
        }
    }
}

/// Everything a finished monitoring run produced
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorResult {
    pub pid: u32,
    pub samples: Vec<Sample>,
    pub start_time: f64,
    pub end_time: f64,
    pub status: MonitorStatus,
    /// Why sampling failed, for `MonitorStatus::Error`.
    pub error: Option<String>,
}

impl MonitorResult {
    pub fn duration_sec(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn last_sample(&self) -> Option<&Sample> {
        self.samples.last()
    }
}

pub struct ProcessMonitor<P = SysinfoProbe, C = MonotonicClock> {
    pid: u32,
    config: MonitorConfig,
    probe: P,
    clock: C,
}

impl ProcessMonitor {
    /// Monitor `pid` with the `sysinfo` probe and a real clock.
    pub fn new(pid: u32, config: MonitorConfig) -> Result<Self> {
        Self::with_parts(pid, config, SysinfoProbe::new(), MonotonicClock::new())
    }
}

impl<P: ResourceProbe, C: Clock> ProcessMonitor<P, C> {
    pub fn with_parts(pid: u32, config: MonitorConfig, probe: P, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pid,
            config,
            probe,
            clock,
        })
    }

    pub fn get_pid(&self) -> u32 {
        self.pid
    }

    /// Sample until the process exits, the timeout passes or sampling fails.
    pub fn run(mut self) -> MonitorResult {
        let pid = self.pid;
        let interval = self.config.sampling_interval;
        let start = self.clock.now();
        let deadline = start + self.config.timeout;
        let mut samples: Vec<Sample> = Vec::new();

        let (status, error) = loop {
            if !self.probe.is_alive(pid) {
                break (MonitorStatus::Completed, None);
            }

            let now = self.clock.now();
            if now >= deadline {
                break (MonitorStatus::Timeout, None);
            }

            match self.probe.snapshot(pid, self.config.include_children) {
                Ok(snapshot) => {
                    let sample = Sample::from_snapshot(self.clock.now(), snapshot);
                    debug!(
                        "pid {} sample #{}: cpu {:.1}% rss {} bytes",
                        pid,
                        samples.len() + 1,
                        sample.cpu_percent,
                        sample.rss_bytes
                    );
                    samples.push(sample);
                }
                Err(ProbeError::Gone) => break (MonitorStatus::Completed, None),
                Err(ProbeError::Failed(reason)) => break (MonitorStatus::Error, Some(reason)),
            }

            let now = self.clock.now();
            let pause = until_next_tick(now - start, interval).min(deadline.saturating_sub(now));
            if !pause.is_zero() {
                self.clock.sleep(pause);
            }
        };

        let end = self.clock.now();
        match status {
            MonitorStatus::Timeout => warn!(
                "pid {} still running after {:?}, giving up",
                pid, self.config.timeout
            ),
            MonitorStatus::Error => warn!(
                "sampling pid {} failed: {}",
                pid,
                error.as_deref().unwrap_or("unknown")
            ),
            _ => info!("pid {} finished after {} samples", pid, samples.len()),
        }

        MonitorResult {
            pid,
            samples,
            start_time: start.as_secs_f64(),
            end_time: end.as_secs_f64(),
            status,
            error,
        }
    }
}

/// Time left until the next tick boundary, with ticks anchored at the
/// loop's start. Overrunning a tick skips to the following boundary rather
/// than firing a burst of catch-up samples.
fn until_next_tick(elapsed: Duration, interval: Duration) -> Duration {
    let interval_ns = interval.as_nanos().max(1);
    let elapsed_ns = elapsed.as_nanos();
    let next_ns = (elapsed_ns / interval_ns + 1) * interval_ns;
    Duration::from_nanos((next_ns - elapsed_ns) as u64)
}
