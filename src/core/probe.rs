//! Resource snapshots of a live process (and optionally its descendants)

use log::debug;
use std::collections::{HashMap, HashSet};
use std::io;
use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};

/// Point-in-time resource usage of a process, or of a process tree when
/// descendants are included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub cpu_percent: f32,
    pub rss_bytes: u64,
    pub vms_bytes: Option<u64>,
    pub thread_count: Option<usize>,
    pub descendants: Option<Vec<u32>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The process no longer exists. This is how a run normally ends.
    Gone,
    /// Anything else: permissions, unreadable accounting data.
    Failed(String),
}

pub trait ResourceProbe {
    fn is_alive(&mut self, pid: u32) -> bool;

    fn snapshot(&mut self, pid: u32, include_children: bool)
        -> std::result::Result<Snapshot, ProbeError>;
}

/// Probe backed by `sysinfo`.
///
/// Keeps one `System` across ticks so CPU usage is computed over the interval
/// since the previous snapshot.
pub struct SysinfoProbe {
    system: System,
    liveness: System,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            liveness: System::new(),
        }
    }

    fn refresh_kind() -> ProcessRefreshKind {
        ProcessRefreshKind::nothing().with_cpu().with_memory()
    }

    /// Current descendants of `root`, re-enumerated from the process table.
    fn descendants_of(&self, root: Pid) -> Vec<Pid> {
        let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
        for (pid, process) in self.system.processes() {
            if process.thread_kind().is_some() || !is_live_status(process.status()) {
                continue;
            }
            if let Some(parent) = process.parent() {
                children.entry(parent).or_default().push(*pid);
            }
        }

        let mut found = Vec::new();
        let mut seen = HashSet::from([root]);
        let mut stack = vec![root];
        while let Some(pid) = stack.pop() {
            for child in children.get(&pid).into_iter().flatten() {
                if seen.insert(*child) {
                    found.push(*child);
                    stack.push(*child);
                }
            }
        }
        found.sort();
        found
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProbe for SysinfoProbe {
    fn is_alive(&mut self, pid: u32) -> bool {
        let pid = Pid::from_u32(pid);
        self.liveness.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing(),
        );
        self.liveness
            .process(pid)
            .is_some_and(|process| is_live_status(process.status()))
    }

    fn snapshot(
        &mut self,
        pid: u32,
        include_children: bool,
    ) -> std::result::Result<Snapshot, ProbeError> {
        let root = Pid::from_u32(pid);
        if include_children {
            self.system
                .refresh_processes_specifics(ProcessesToUpdate::All, true, Self::refresh_kind());
        } else {
            self.system.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[root]),
                true,
                Self::refresh_kind(),
            );
        }

        let process = match self.system.process(root) {
            Some(process) if is_live_status(process.status()) => process,
            _ => return Err(ProbeError::Gone),
        };

        let mut snapshot = Snapshot {
            cpu_percent: process.cpu_usage(),
            rss_bytes: process.memory(),
            vms_bytes: Some(process.virtual_memory()),
            thread_count: thread_count(pid)?,
            descendants: None,
        };

        if include_children {
            let descendants = self.descendants_of(root);
            for child_pid in &descendants {
                if let Some(child) = self.system.process(*child_pid) {
                    snapshot.cpu_percent += child.cpu_usage();
                    snapshot.rss_bytes += child.memory();
                    snapshot.vms_bytes = snapshot
                        .vms_bytes
                        .map(|total| total + child.virtual_memory());
                }
                // A child may exit between enumeration and this read.
                if let (Some(total), Ok(Some(count))) =
                    (snapshot.thread_count, thread_count(child_pid.as_u32()))
                {
                    snapshot.thread_count = Some(total + count);
                }
            }
            debug!("pid {} has {} live descendants", pid, descendants.len());
            snapshot.descendants = Some(descendants.iter().map(|p| p.as_u32()).collect());
        }

        Ok(snapshot)
    }
}

fn is_live_status(status: ProcessStatus) -> bool {
    !matches!(status, ProcessStatus::Zombie | ProcessStatus::Dead)
}

/// Thread count for the process (Linux-specific)
#[cfg(target_os = "linux")]
fn thread_count(pid: u32) -> std::result::Result<Option<usize>, ProbeError> {
    match std::fs::read_dir(format!("/proc/{}/task", pid)) {
        Ok(entries) => Ok(Some(entries.count())),
        Err(e) => Err(classify_io_error(pid, e)),
    }
}

#[cfg(not(target_os = "linux"))]
fn thread_count(_pid: u32) -> std::result::Result<Option<usize>, ProbeError> {
    Ok(None)
}

pub(crate) fn classify_io_error(pid: u32, err: io::Error) -> ProbeError {
    match err.kind() {
        io::ErrorKind::NotFound => ProbeError::Gone,
        _ => ProbeError::Failed(format!("reading accounting data for pid {}: {}", pid, err)),
    }
}
