use windows_sys::Win32::Foundation::FILETIME;
use windows_sys::Win32::System::Threading::{
    GetProcessTimes, GetSystemTimes, PROCESS_QUERY_LIMITED_INFORMATION,
};

use super::handle::OwnedHandle;
use crate::system::process::CpuTimes;

const ZERO: FILETIME = FILETIME {
    dwLowDateTime: 0,
    dwHighDateTime: 0,
};

fn ticks(ft: FILETIME) -> u64 {
    (u64::from(ft.dwHighDateTime) << 32) | u64::from(ft.dwLowDateTime)
}

/// Kernel + user time of `pid` and of the whole system, in 100ns ticks.
pub(super) fn cpu_times(pid: u32) -> Option<CpuTimes> {
    let process = OwnedHandle::open_process(pid, PROCESS_QUERY_LIMITED_INFORMATION)?;

    let (mut creation, mut exit, mut kernel, mut user) = (ZERO, ZERO, ZERO, ZERO);
    // SAFETY: all out-pointers reference live FILETIMEs.
    let ok = unsafe {
        GetProcessTimes(
            process.raw(),
            &mut creation,
            &mut exit,
            &mut kernel,
            &mut user,
        )
    };
    if ok == 0 {
        return None;
    }

    let (mut idle, mut sys_kernel, mut sys_user) = (ZERO, ZERO, ZERO);
    // SAFETY: as above. System kernel time already includes idle time.
    let ok = unsafe { GetSystemTimes(&mut idle, &mut sys_kernel, &mut sys_user) };
    if ok == 0 {
        return None;
    }

    Some(CpuTimes {
        process: ticks(kernel).saturating_add(ticks(user)),
        system: ticks(sys_kernel).saturating_add(ticks(sys_user)),
    })
}
