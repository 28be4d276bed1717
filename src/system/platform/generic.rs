use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind, Users};
use tracing::debug;

use super::ProcessSource;
use crate::system::error::{Error, Result};
use crate::system::process::{CpuTimes, RawProcess};

/// `sysinfo`-backed source for hosts without the Windows control-block walk.
///
/// CPU system time has no direct counter here, so it is derived from
/// monotonic wall time scaled by the logical CPU count. That is the same
/// quantity the Windows kernel+user system counters measure.
pub struct GenericSource {
    sys: Mutex<System>,
    users: OnceLock<Users>,
    epoch: Instant,
}

impl Default for GenericSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GenericSource {
    pub fn new() -> Self {
        GenericSource {
            sys: Mutex::new(System::new()),
            users: OnceLock::new(),
            epoch: Instant::now(),
        }
    }

    fn with_process<T>(
        &self,
        pid: u32,
        kind: ProcessRefreshKind,
        read: impl FnOnce(&Process) -> Option<T>,
    ) -> Option<T> {
        let mut sys = self.sys.lock().ok()?;
        let pid = Pid::from_u32(pid);
        sys.refresh_processes_specifics(ProcessesToUpdate::Some(&[pid]), true, kind);
        sys.process(pid).and_then(read)
    }

    fn system_time_ms(&self) -> u64 {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get() as u64)
            .unwrap_or(1);
        let elapsed = u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX);
        elapsed.saturating_mul(cpus)
    }
}

impl ProcessSource for GenericSource {
    fn snapshot(&self) -> Result<Vec<RawProcess>> {
        let mut sys = self
            .sys
            .lock()
            .map_err(|_| Error::snapshot(None, "process table state is poisoned"))?;
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().without_tasks(),
        );

        let mut processes: Vec<RawProcess> = sys
            .processes()
            .iter()
            .map(|(pid, process)| {
                RawProcess::new(
                    pid.as_u32(),
                    process.parent().map(|p| p.as_u32()).unwrap_or(0),
                    process.name().to_string_lossy(),
                )
            })
            .collect();
        // The proc table lists pids in ascending order.
        processes.sort_unstable_by_key(|p| p.pid);
        Ok(processes)
    }

    fn memory_bytes(&self, pid: u32) -> Option<u64> {
        self.with_process(pid, ProcessRefreshKind::nothing().with_memory(), |p| {
            Some(p.memory())
        })
    }

    fn command_line(&self, pid: u32) -> Option<String> {
        self.with_process(
            pid,
            ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
            |p| {
                let command = p
                    .cmd()
                    .iter()
                    .map(|s| s.to_string_lossy().to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                (!command.is_empty()).then_some(command)
            },
        )
    }

    fn owner(&self, pid: u32) -> Option<String> {
        let uid = self.with_process(
            pid,
            ProcessRefreshKind::nothing().with_user(UpdateKind::Always),
            |p| p.user_id().cloned(),
        )?;
        let users = self.users.get_or_init(Users::new_with_refreshed_list);
        match users.get_user_by_id(&uid) {
            Some(user) => Some(user.name().to_string()),
            None => {
                debug!(pid, "no account name for uid, falling back to raw id");
                let raw: String = format!("{uid:?}")
                    .chars()
                    .filter(char::is_ascii_digit)
                    .collect();
                (!raw.is_empty()).then_some(raw)
            }
        }
    }

    fn cpu_times(&self, pid: u32) -> Option<CpuTimes> {
        let process = self.with_process(pid, ProcessRefreshKind::nothing().with_cpu(), |p| {
            Some(p.accumulated_cpu_time())
        })?;
        Some(CpuTimes {
            process,
            system: self.system_time_ms(),
        })
    }
}
