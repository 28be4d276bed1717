use crate::system::error::Result;
use crate::system::process::{CpuTimes, RawProcess};

/// Read-only view of the OS process table and per-process attributes.
///
/// `snapshot` is the only fallible call. Every per-pid query returns `None`
/// when the process cannot be opened or read, which is routine for protected
/// processes and for processes that exit mid-query. Implementations attempt
/// each query exactly once.
pub trait ProcessSource {
    /// Walk the process table once, in the order the OS reports it.
    fn snapshot(&self) -> Result<Vec<RawProcess>>;

    /// Current working-set size in bytes.
    fn memory_bytes(&self, pid: u32) -> Option<u64>;

    /// Full command line as the process was started.
    fn command_line(&self, pid: u32) -> Option<String>;

    /// Owning account, `DOMAIN\name` where the OS knows one, otherwise a raw
    /// identity string.
    fn owner(&self, pid: u32) -> Option<String>;

    /// Process and system CPU totals read together.
    fn cpu_times(&self, pid: u32) -> Option<CpuTimes>;
}

impl<S: ProcessSource + ?Sized> ProcessSource for &S {
    fn snapshot(&self) -> Result<Vec<RawProcess>> {
        (**self).snapshot()
    }

    fn memory_bytes(&self, pid: u32) -> Option<u64> {
        (**self).memory_bytes(pid)
    }

    fn command_line(&self, pid: u32) -> Option<String> {
        (**self).command_line(pid)
    }

    fn owner(&self, pid: u32) -> Option<String> {
        (**self).owner(pid)
    }

    fn cpu_times(&self, pid: u32) -> Option<CpuTimes> {
        (**self).cpu_times(pid)
    }
}

#[cfg(not(target_os = "windows"))]
mod generic;
#[cfg(target_os = "windows")]
mod windows;

#[cfg(not(target_os = "windows"))]
pub use generic::GenericSource as NativeSource;
#[cfg(target_os = "windows")]
pub use windows::WindowsSource as NativeSource;
