//! Spawning, terminating and reaping the monitored child process

use crate::config::defaults;
use crate::error::{ProcbenchError, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

/// What to launch and where
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchSpec {
    pub command: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Merged onto the inherited environment, overriding on conflict.
    pub env: BTreeMap<String, String>,
}

impl LaunchSpec {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            ..Self::default()
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Exit metadata reported by the runner
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProcessInfo {
    pub pid: Option<u32>,
    pub command: Vec<String>,
    /// Numeric exit code; absent while running or when killed by a signal.
    pub exit_code: Option<i32>,
    /// Signal that ended the process, if it did not exit normally.
    pub terminated_by_signal: Option<i32>,
    /// Whether the runner had to terminate the process itself.
    pub terminated_by_runner: bool,
    pub duration_sec: f64,
}

/// Owns the lifetime of exactly one child process.
///
/// Dropping a runner whose process is still alive kills and reaps it.
pub struct ProcessRunner {
    spec: LaunchSpec,
    child: Option<Child>,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
    exit_status: Option<ExitStatus>,
    terminated: bool,
}

impl ProcessRunner {
    pub fn new(spec: LaunchSpec) -> Self {
        Self {
            spec,
            child: None,
            started_at: None,
            ended_at: None,
            exit_status: None,
            terminated: false,
        }
    }

    /// Launch the command. Does not wait for it to finish.
    pub fn start(&mut self) -> Result<u32> {
        if self.child.is_some() {
            return Err(ProcbenchError::InvalidConfiguration(
                "process runner was already started".to_string(),
            ));
        }

        let cmd = &self.spec.command;
        if cmd.is_empty() {
            return Err(ProcbenchError::spawn(
                cmd,
                io::Error::new(io::ErrorKind::InvalidInput, "command cannot be empty"),
            ));
        }

        let mut command = Command::new(&cmd[0]);
        command.args(&cmd[1..]);
        command.envs(&self.spec.env);

        if let Some(cwd) = &self.spec.cwd {
            if !cwd.is_dir() {
                return Err(ProcbenchError::spawn(
                    cmd,
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("working directory {} does not exist", cwd.display()),
                    ),
                ));
            }
            command.current_dir(cwd);
        }

        command.stdin(Stdio::null());
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());

        let child = command
            .spawn()
            .map_err(|e| ProcbenchError::spawn(cmd, e))?;
        let pid = child.id();
        info!("started pid {}: {}", pid, cmd.join(" "));

        self.started_at = Some(Instant::now());
        self.child = Some(child);
        Ok(pid)
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    pub fn has_exited(&self) -> bool {
        self.exit_status.is_some()
    }

    /// Wait up to `timeout` for the process to exit on its own.
    ///
    /// Returns `true` if it has exited. Calling this after exit is a no-op.
    pub fn wait(&mut self, timeout: Duration) -> Result<bool> {
        if self.exit_status.is_some() {
            return Ok(true);
        }
        if self.child.is_none() {
            return Ok(false);
        }

        let deadline = Instant::now() + timeout;
        loop {
            if self.poll()? {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            std::thread::sleep(defaults::WAIT_POLL.min(deadline - now));
        }
    }

    /// Ask the process to stop, killing it if it ignores the request.
    ///
    /// The process is reaped before this returns. A process that already
    /// exited is left alone.
    pub fn terminate(&mut self) -> Result<()> {
        self.terminate_with_grace(defaults::TERMINATE_GRACE)
    }

    pub fn terminate_with_grace(&mut self, grace: Duration) -> Result<()> {
        if self.child.is_none() || self.poll()? {
            return Ok(());
        }
        let pid = self.pid().unwrap_or_default();
        self.terminated = true;

        debug!("sending SIGTERM to pid {}", pid);
        self.request_stop()?;
        if self.wait(grace)? {
            return Ok(());
        }

        warn!("pid {} ignored SIGTERM for {:?}, killing", pid, grace);
        if let Some(child) = self.child.as_mut() {
            match child.kill() {
                Ok(()) => {}
                // Exited between the last poll and the kill.
                Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
                Err(e) => return Err(e.into()),
            }
            let status = child.wait()?;
            self.record_exit(status);
        }
        Ok(())
    }

    pub fn info(&self) -> ProcessInfo {
        let duration = match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        };

        ProcessInfo {
            pid: self.pid(),
            command: self.spec.command.clone(),
            exit_code: self.exit_status.and_then(|status| status.code()),
            terminated_by_signal: self.exit_status.and_then(exit_signal),
            terminated_by_runner: self.terminated,
            duration_sec: duration.as_secs_f64(),
        }
    }

    /// Non-blocking check for exit, recording the status if it happened.
    fn poll(&mut self) -> Result<bool> {
        if self.exit_status.is_some() {
            return Ok(true);
        }
        let Some(child) = self.child.as_mut() else {
            return Ok(false);
        };
        match child.try_wait()? {
            Some(status) => {
                self.record_exit(status);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn record_exit(&mut self, status: ExitStatus) {
        debug!("pid {:?} exited with {}", self.pid(), status);
        self.ended_at = Some(Instant::now());
        self.exit_status = Some(status);
    }

    #[cfg(unix)]
    fn request_stop(&mut self) -> Result<()> {
        let Some(pid) = self.pid() else {
            return Ok(());
        };
        // SAFETY: plain kill(2) on a pid we spawned and have not yet reaped,
        // so it cannot have been recycled.
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                return Err(err.into());
            }
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn request_stop(&mut self) -> Result<()> {
        // No graceful equivalent; go straight to a forced kill.
        if let Some(child) = self.child.as_mut() {
            child.kill()?;
        }
        Ok(())
    }
}

impl Drop for ProcessRunner {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if self.exit_status.is_none() {
                if let Ok(None) = child.try_wait() {
                    warn!("runner dropped with pid {} still alive, killing", child.id());
                    let _ = child.kill();
                }
                let _ = child.wait();
            }
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: ExitStatus) -> Option<i32> {
    None
}
