//! The JSON result document

use crate::core::process_monitor::{MonitorResult, MonitorStatus, Sample};
use crate::core::process_runner::ProcessInfo;
use crate::error::Result;
use crate::summary::Summary;
use crate::testcase::TestCase;
use log::debug;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub const SCHEMA_VERSION: &str = "1.0";

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MonitorMeta {
    pub status: MonitorStatus,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything recorded for one test case
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TestCaseResult {
    pub testcase: TestCase,
    pub process_info: ProcessInfo,
    pub monitor: MonitorMeta,
    pub samples: Vec<Sample>,
    pub summary: Summary,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SessionMeta {
    /// Unix epoch seconds.
    pub start_time: f64,
    pub end_time: f64,
    pub duration_sec: f64,
}

#[derive(Serialize, Debug)]
pub struct SessionOutput<'a> {
    pub schema_version: &'a str,
    pub session: SessionMeta,
    pub results: &'a [TestCaseResult],
}

pub struct OutputWriter {
    schema_version: String,
}

impl Default for OutputWriter {
    fn default() -> Self {
        Self::new(SCHEMA_VERSION)
    }
}

impl OutputWriter {
    pub fn new(schema_version: impl Into<String>) -> Self {
        Self {
            schema_version: schema_version.into(),
        }
    }

    pub fn build_testcase_result(
        &self,
        testcase: &TestCase,
        process_info: ProcessInfo,
        monitor: MonitorResult,
        summary: Summary,
    ) -> TestCaseResult {
        TestCaseResult {
            testcase: testcase.clone(),
            process_info,
            monitor: MonitorMeta {
                status: monitor.status,
                start_time: monitor.start_time,
                end_time: monitor.end_time,
                error: monitor.error,
            },
            samples: monitor.samples,
            summary,
        }
    }

    pub fn document<'a>(
        &'a self,
        session_start: f64,
        session_end: f64,
        results: &'a [TestCaseResult],
    ) -> SessionOutput<'a> {
        SessionOutput {
            schema_version: &self.schema_version,
            session: SessionMeta {
                start_time: session_start,
                end_time: session_end,
                duration_sec: (session_end - session_start).max(0.0),
            },
            results,
        }
    }

    /// Write the document to `path`, replacing it atomically.
    pub fn write(
        &self,
        path: &Path,
        session_start: f64,
        session_end: f64,
        results: &[TestCaseResult],
    ) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = Path::new(&tmp_name);

        {
            let mut writer = BufWriter::new(File::create(tmp_path)?);
            serde_json::to_writer_pretty(
                &mut writer,
                &self.document(session_start, session_end, results),
            )?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        fs::rename(tmp_path, path)?;
        debug!("wrote {} results to {}", results.len(), path.display());
        Ok(())
    }
}
