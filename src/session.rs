//! Running test cases one after another
//!
//! Each test case runs the full pipeline in isolation: spawn, monitor,
//! reconcile, summarize. A failure is contained to its own test case and
//! the `ErrorPolicy` decides whether the rest of the session still runs.

use crate::config::defaults;
use crate::core::process_monitor::{MonitorStatus, ProcessMonitor};
use crate::core::process_runner::ProcessRunner;
use crate::error::{ProcbenchError, Result};
use crate::output::{OutputWriter, TestCaseResult};
use crate::summary::Summary;
use crate::testcase::TestCase;
use log::{error, info, warn};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    #[default]
    Continue,
    Stop,
}

/// A test case that did not produce a clean result
#[derive(Debug)]
pub struct Failure {
    pub source: PathBuf,
    pub id: Option<String>,
    pub error: ProcbenchError,
}

#[derive(Debug, Default)]
pub struct SessionReport {
    pub start_time: f64,
    pub end_time: f64,
    pub results: Vec<TestCaseResult>,
    pub failures: Vec<Failure>,
    /// Set when `ErrorPolicy::Stop` cut the session short.
    pub stopped_early: bool,
}

impl SessionReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn write(&self, writer: &OutputWriter, path: &Path) -> Result<()> {
        writer.write(path, self.start_time, self.end_time, &self.results)
    }
}

/// Run one test case through spawn, monitor, reconcile and summarize.
///
/// A spawn failure returns `Err` before any monitoring. A sampling failure
/// still yields the partial result.
pub fn run_test_case(testcase: &TestCase, writer: &OutputWriter) -> Result<TestCaseResult> {
    let config = testcase.monitor_config()?;
    let mut runner = ProcessRunner::new(testcase.launch_spec());
    let pid = runner.start()?;
    info!("running test case {} as pid {}", testcase.id, pid);

    let monitor = ProcessMonitor::new(pid, config)?.run();

    if monitor.status == MonitorStatus::Timeout {
        warn!("timeout reached, terminating pid {}", pid);
        runner.terminate()?;
    } else if !runner.wait(defaults::POST_EXIT_WAIT)? {
        warn!(
            "pid {} still alive after monitoring ended ({}), terminating",
            pid, monitor.status
        );
        runner.terminate()?;
    }

    let process_info = runner.info();
    let summary = Summary::from_result(&monitor, process_info.exit_code);
    info!(
        "test case {} finished with status={} samples={}",
        testcase.id, monitor.status, summary.sample_count
    );

    Ok(writer.build_testcase_result(testcase, process_info, monitor, summary))
}

/// Load and run every test case in order.
pub fn run_session(paths: &[PathBuf], policy: ErrorPolicy, writer: &OutputWriter) -> SessionReport {
    let mut report = SessionReport {
        start_time: unix_now(),
        ..SessionReport::default()
    };

    for path in paths {
        info!("loading test case {}", path.display());
        let (id, outcome) = match TestCase::load_from_file(path) {
            Ok(testcase) => (Some(testcase.id.clone()), run_contained(&testcase, writer)),
            Err(e) => (None, Err(e)),
        };

        let error = match outcome {
            Ok(result) => {
                let monitor_error = (result.monitor.status == MonitorStatus::Error).then(|| {
                    ProcbenchError::Monitor {
                        pid: result.process_info.pid.unwrap_or_default(),
                        reason: result.monitor.error.clone().unwrap_or_default(),
                    }
                });
                report.results.push(result);
                monitor_error
            }
            Err(e) => Some(e),
        };

        if let Some(error) = error {
            error!("[{}] {}: {}", error.severity(), path.display(), error);
            report.failures.push(Failure {
                source: path.clone(),
                id,
                error,
            });
            if policy == ErrorPolicy::Stop {
                report.stopped_early = true;
                break;
            }
        }
    }

    report.end_time = unix_now();
    report
}

/// Run a test case, turning a panic into an unexpected error.
fn run_contained(testcase: &TestCase, writer: &OutputWriter) -> Result<TestCaseResult> {
    panic::catch_unwind(AssertUnwindSafe(|| run_test_case(testcase, writer))).unwrap_or_else(
        |payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic with non-string payload".to_string());
            Err(ProcbenchError::Unexpected(message))
        },
    )
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
