#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use proctree::{CpuTimes, Error, ProcessSource, RawProcess, Result};

/// In-memory process table. The n-th CPU reading of a pid is `cpu[pid][n]`;
/// a pid missing from a map fails that query.
#[derive(Default)]
pub struct ScriptedSource {
    pub processes: Vec<RawProcess>,
    pub fail_snapshot: bool,
    pub memory: HashMap<u32, u64>,
    pub command_lines: HashMap<u32, String>,
    pub owners: HashMap<u32, String>,
    pub cpu: HashMap<u32, Vec<CpuTimes>>,
    cpu_reads: RefCell<HashMap<u32, usize>>,
}

impl ScriptedSource {
    pub fn with_processes(processes: Vec<RawProcess>) -> Self {
        ScriptedSource {
            processes,
            ..Default::default()
        }
    }

    pub fn three_processes() -> Self {
        Self::with_processes(vec![
            RawProcess::new(4, 0, "system"),
            RawProcess::new(100, 4, "svc.exe"),
            RawProcess::new(200, 100, "child.exe"),
        ])
    }

    /// Opening the process table fails with access denied.
    pub fn failing_snapshot(mut self) -> Self {
        self.fail_snapshot = true;
        self
    }
}

impl ProcessSource for ScriptedSource {
    fn snapshot(&self) -> Result<Vec<RawProcess>> {
        if self.fail_snapshot {
            return Err(Error::snapshot(Some(5), "Access is denied."));
        }
        Ok(self.processes.clone())
    }

    fn memory_bytes(&self, pid: u32) -> Option<u64> {
        self.memory.get(&pid).copied()
    }

    fn command_line(&self, pid: u32) -> Option<String> {
        self.command_lines.get(&pid).cloned()
    }

    fn owner(&self, pid: u32) -> Option<String> {
        self.owners.get(&pid).cloned()
    }

    fn cpu_times(&self, pid: u32) -> Option<CpuTimes> {
        let mut reads = self.cpu_reads.borrow_mut();
        let n = reads.entry(pid).or_insert(0);
        let reading = self.cpu.get(&pid)?.get(*n).copied();
        *n += 1;
        reading
    }
}
