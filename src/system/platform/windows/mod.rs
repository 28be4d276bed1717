mod command_line;
mod handle;
mod memory;
mod owner;
mod snapshot;
mod times;

use super::ProcessSource;
use crate::system::error::Result;
use crate::system::process::{CpuTimes, RawProcess};

/// Win32 / NT implementation of [`ProcessSource`].
#[derive(Debug, Default)]
pub struct WindowsSource;

impl WindowsSource {
    pub fn new() -> Self {
        WindowsSource
    }
}

impl ProcessSource for WindowsSource {
    fn snapshot(&self) -> Result<Vec<RawProcess>> {
        snapshot::walk_process_table()
    }

    fn memory_bytes(&self, pid: u32) -> Option<u64> {
        memory::working_set(pid)
    }

    fn command_line(&self, pid: u32) -> Option<String> {
        command_line::read_command_line(pid)
    }

    fn owner(&self, pid: u32) -> Option<String> {
        owner::token_owner(pid)
    }

    fn cpu_times(&self, pid: u32) -> Option<CpuTimes> {
        times::cpu_times(pid)
    }
}
