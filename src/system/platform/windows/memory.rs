use std::mem;

use windows_sys::Win32::System::ProcessStatus::{K32GetProcessMemoryInfo, PROCESS_MEMORY_COUNTERS};
use windows_sys::Win32::System::Threading::{PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_VM_READ};

use super::handle::OwnedHandle;

pub(super) fn working_set(pid: u32) -> Option<u64> {
    let process =
        OwnedHandle::open_process(pid, PROCESS_QUERY_LIMITED_INFORMATION | PROCESS_VM_READ)?;

    let size = mem::size_of::<PROCESS_MEMORY_COUNTERS>() as u32;
    // SAFETY: PROCESS_MEMORY_COUNTERS is plain data; all-zero is a valid value.
    let mut counters: PROCESS_MEMORY_COUNTERS = unsafe { mem::zeroed() };
    counters.cb = size;

    // SAFETY: `counters` is writable and `size` bytes long.
    let ok = unsafe { K32GetProcessMemoryInfo(process.raw(), &mut counters, size) };
    (ok != 0).then_some(counters.WorkingSetSize as u64)
}
