//! Error types for procbench
//!
//! Errors fall into two groups. Domain errors are known failure modes of a
//! single test case (it could not be spawned, monitored or loaded). Everything
//! else is unexpected and reported with a higher severity.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcbenchError>;

#[derive(Error, Debug)]
pub enum ProcbenchError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to monitor pid {pid}: {reason}")]
    Monitor { pid: u32, reason: String },

    #[error("invalid test case {}: {reason}", .path.display())]
    InvalidTestCase { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ProcbenchError {
    pub(crate) fn spawn(command: &[String], source: io::Error) -> Self {
        Self::Spawn {
            command: command.join(" "),
            source,
        }
    }

    /// Whether this is a known failure mode rather than a defect.
    pub fn is_domain(&self) -> bool {
        match self {
            Self::Spawn { .. }
            | Self::Monitor { .. }
            | Self::InvalidTestCase { .. }
            | Self::InvalidConfiguration(_) => true,
            Self::Io(_) | Self::Json(_) | Self::Unexpected(_) => false,
        }
    }

    /// Severity label used when reporting a failed test case.
    pub fn severity(&self) -> &'static str {
        if self.is_domain() {
            "ERROR"
        } else {
            "FATAL"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_classification() {
        let spawn = ProcbenchError::spawn(
            &["missing-binary".to_string(), "--flag".to_string()],
            io::Error::new(io::ErrorKind::NotFound, "not found"),
        );
        assert!(spawn.is_domain());
        assert_eq!(spawn.severity(), "ERROR");
        assert!(spawn.to_string().contains("missing-binary --flag"));

        let monitor = ProcbenchError::Monitor {
            pid: 42,
            reason: "permission denied".to_string(),
        };
        assert!(monitor.is_domain());

        let unexpected = ProcbenchError::Unexpected("boom".to_string());
        assert!(!unexpected.is_domain());
        assert_eq!(unexpected.severity(), "FATAL");

        let io_err: ProcbenchError = io::Error::new(io::ErrorKind::Other, "disk").into();
        assert_eq!(io_err.severity(), "FATAL");
    }
}
