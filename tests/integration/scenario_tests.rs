//! End-to-end runs of the spawn / monitor / reconcile / summarize pipeline

use procbench::core::probe::{ResourceProbe, SysinfoProbe};
use procbench::{
    summarize, LaunchSpec, MonitorConfig, MonitorResult, MonitorStatus, ProcbenchError,
    ProcessInfo, ProcessMonitor, ProcessRunner,
};
use std::time::Duration;

fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

fn config(interval_ms: u64, timeout_secs: f64, include_children: bool) -> MonitorConfig {
    MonitorConfig::builder()
        .sampling_interval_ms(interval_ms)
        .timeout_secs(timeout_secs)
        .include_children(include_children)
        .build()
        .unwrap()
}

/// Run the whole pipeline the way the session does.
fn monitor_command(
    command: Vec<String>,
    config: MonitorConfig,
) -> procbench::Result<(MonitorResult, ProcessInfo, u32)> {
    let mut runner = ProcessRunner::new(LaunchSpec::new(command));
    let pid = runner.start()?;
    let result = ProcessMonitor::new(pid, config)?.run();
    if result.status == MonitorStatus::Timeout {
        runner.terminate()?;
    } else {
        runner.wait(Duration::from_secs(1))?;
    }
    Ok((result, runner.info(), pid))
}

fn assert_time_invariants(result: &MonitorResult) {
    assert!(result.end_time >= result.start_time);
    for pair in result.samples.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
    for sample in &result.samples {
        assert!(sample.timestamp >= result.start_time && sample.timestamp <= result.end_time);
    }
}

#[test]
fn test_near_instant_command_completes() -> procbench::Result<()> {
    let (result, info, _) = monitor_command(vec!["true".to_string()], config(100, 5.0, false))?;

    assert_eq!(result.status, MonitorStatus::Completed);
    assert_eq!(info.exit_code, Some(0));
    assert!(result.sample_count() <= 1, "got {} samples", result.sample_count());
    assert_time_invariants(&result);

    let summary = summarize(
        &result.samples,
        result.start_time,
        result.end_time,
        info.exit_code,
        result.status,
    );
    assert_eq!(summary.sample_count, result.sample_count());
    assert_eq!(summary.exit_code, Some(0));
    Ok(())
}

#[test]
fn test_long_command_times_out_and_is_terminated() -> procbench::Result<()> {
    let (result, info, pid) = monitor_command(sh("sleep 3"), config(100, 1.0, false))?;

    assert_eq!(result.status, MonitorStatus::Timeout);
    let duration = result.duration_sec();
    assert!((1.0..=1.2).contains(&duration), "duration was {duration}");
    assert!(result.sample_count() >= 5);
    assert_time_invariants(&result);

    assert!(info.terminated_by_runner);
    assert_eq!(info.exit_code, None);
    assert!(info.terminated_by_signal.is_some());
    assert!(!SysinfoProbe::new().is_alive(pid), "pid {pid} survived termination");
    Ok(())
}

#[test]
fn test_exit_code_is_reported() -> procbench::Result<()> {
    let (result, info, _) = monitor_command(sh("sleep 0.2; exit 7"), config(50, 5.0, false))?;

    assert_eq!(result.status, MonitorStatus::Completed);
    assert_eq!(info.exit_code, Some(7));
    assert!(!info.terminated_by_runner);
    Ok(())
}

#[test]
fn test_children_are_aggregated() -> procbench::Result<()> {
    let script = "sleep 0.6 & wait";
    let (alone, _, _) = monitor_command(sh(script), config(100, 5.0, false))?;
    let (tree, _, _) = monitor_command(sh(script), config(100, 5.0, true))?;

    assert!(alone.samples.iter().all(|s| s.descendants.is_none()));
    let baseline = alone
        .samples
        .iter()
        .map(|s| s.rss_bytes)
        .min()
        .expect("parent-only run should have samples");

    let with_child = tree
        .samples
        .iter()
        .find(|s| s.descendants.as_ref().is_some_and(|d| !d.is_empty()))
        .expect("at least one sample should include the child");
    assert!(with_child.rss_bytes >= baseline);
    Ok(())
}

#[test]
fn test_missing_executable_fails_before_monitoring() {
    let err = monitor_command(
        vec!["/definitely/not/a/real/binary".to_string()],
        config(100, 5.0, false),
    )
    .unwrap_err();
    assert!(matches!(err, ProcbenchError::Spawn { .. }));
    assert!(err.is_domain());
}
