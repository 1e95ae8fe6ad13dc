//! Aggregate statistics over a sample sequence

use crate::core::process_monitor::{MonitorResult, MonitorStatus, Sample};
use serde::Serialize;

/// Peak and mean resource usage of one monitoring run.
///
/// Aggregates are `None` when there were no samples to aggregate.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Summary {
    pub sample_count: usize,
    pub duration_sec: f64,
    pub cpu_peak_percent: Option<f32>,
    pub cpu_mean_percent: Option<f64>,
    pub rss_peak_bytes: Option<u64>,
    pub rss_mean_bytes: Option<f64>,
    pub vms_peak_bytes: Option<u64>,
    pub thread_peak: Option<usize>,
    pub exit_code: Option<i32>,
    pub status: MonitorStatus,
}

impl Summary {
    pub fn from_result(result: &MonitorResult, exit_code: Option<i32>) -> Self {
        summarize(
            &result.samples,
            result.start_time,
            result.end_time,
            exit_code,
            result.status,
        )
    }
}

pub fn summarize(
    samples: &[Sample],
    start_time: f64,
    end_time: f64,
    exit_code: Option<i32>,
    status: MonitorStatus,
) -> Summary {
    let count = samples.len();
    let mean = |total: f64| (count > 0).then(|| total / count as f64);

    let cpu_total: f64 = samples.iter().map(|s| f64::from(s.cpu_percent)).sum();
    let rss_total: f64 = samples.iter().map(|s| s.rss_bytes as f64).sum();

    Summary {
        sample_count: count,
        duration_sec: (end_time - start_time).max(0.0),
        cpu_peak_percent: samples.iter().map(|s| s.cpu_percent).reduce(f32::max),
        cpu_mean_percent: mean(cpu_total),
        rss_peak_bytes: samples.iter().map(|s| s.rss_bytes).max(),
        rss_mean_bytes: mean(rss_total),
        vms_peak_bytes: samples.iter().filter_map(|s| s.vms_bytes).max(),
        thread_peak: samples.iter().filter_map(|s| s.thread_count).max(),
        exit_code,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(timestamp: f64, cpu_percent: f32, rss_bytes: u64) -> Sample {
        Sample {
            timestamp,
            cpu_percent,
            rss_bytes,
            vms_bytes: None,
            thread_count: None,
            descendants: None,
        }
    }

    #[test]
    fn test_summary_aggregates() {
        let mut samples = vec![
            sample(0.1, 10.0, 1000),
            sample(0.2, 50.0, 3000),
            sample(0.3, 30.0, 2000),
        ];
        samples[1].vms_bytes = Some(9000);
        samples[2].thread_count = Some(4);

        let summary = summarize(&samples, 0.0, 0.5, Some(0), MonitorStatus::Completed);

        assert_eq!(summary.sample_count, 3);
        assert!((summary.duration_sec - 0.5).abs() < 1e-12);
        assert_eq!(summary.cpu_peak_percent, Some(50.0));
        assert!((summary.cpu_mean_percent.unwrap() - 30.0).abs() < 1e-9);
        assert_eq!(summary.rss_peak_bytes, Some(3000));
        assert!((summary.rss_mean_bytes.unwrap() - 2000.0).abs() < 1e-9);
        assert_eq!(summary.vms_peak_bytes, Some(9000));
        assert_eq!(summary.thread_peak, Some(4));
        assert_eq!(summary.exit_code, Some(0));
        assert_eq!(summary.status, MonitorStatus::Completed);
    }

    #[test]
    fn test_empty_samples() {
        let summary = summarize(&[], 2.0, 2.0, None, MonitorStatus::Completed);

        assert_eq!(summary.sample_count, 0);
        assert_eq!(summary.duration_sec, 0.0);
        assert_eq!(summary.cpu_peak_percent, None);
        assert_eq!(summary.cpu_mean_percent, None);
        assert_eq!(summary.rss_peak_bytes, None);
        assert_eq!(summary.rss_mean_bytes, None);
        assert_eq!(summary.vms_peak_bytes, None);
    }

    #[test]
    fn test_summary_is_idempotent() {
        let samples = vec![sample(0.0, 12.5, 4096), sample(0.1, 7.5, 8192)];
        let first = summarize(&samples, 0.0, 0.2, Some(7), MonitorStatus::Timeout);
        let second = summarize(&samples, 0.0, 0.2, Some(7), MonitorStatus::Timeout);
        assert_eq!(first, second);
        assert_eq!(first.exit_code, Some(7));
        assert_eq!(first.status, MonitorStatus::Timeout);
    }

    #[test]
    fn test_from_result() {
        let result = MonitorResult {
            pid: 10,
            samples: vec![sample(1.0, 5.0, 100)],
            start_time: 1.0,
            end_time: 3.0,
            status: MonitorStatus::Error,
            error: Some("denied".to_string()),
        };
        let summary = Summary::from_result(&result, None);
        assert_eq!(summary.sample_count, 1);
        assert!((summary.duration_sec - 2.0).abs() < 1e-12);
        assert_eq!(summary.status, MonitorStatus::Error);
    }
}
