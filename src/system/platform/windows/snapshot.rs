use std::io;
use std::mem;

use tracing::{debug, debug_span};
use windows_sys::Win32::Foundation::{ERROR_NO_MORE_FILES, GetLastError};
use windows_sys::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
    TH32CS_SNAPPROCESS,
};

use super::handle::OwnedHandle;
use crate::system::error::{Error, Result};
use crate::system::process::RawProcess;

/// Walk the toolhelp process table.
///
/// pid, parent pid and executable name all come from the table entry, so no
/// per-process handle is opened here. A walk that stops early keeps what it
/// collected.
pub(super) fn walk_process_table() -> Result<Vec<RawProcess>> {
    let _span = debug_span!("windows.toolhelp_walk").entered();

    // SAFETY: no pointer arguments.
    let raw = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) };
    let Some(snapshot) = OwnedHandle::new(raw) else {
        let err = io::Error::last_os_error();
        return Err(Error::snapshot(err.raw_os_error(), err.to_string()));
    };

    // SAFETY: PROCESSENTRY32W is plain data; all-zero is a valid value.
    let mut entry: PROCESSENTRY32W = unsafe { mem::zeroed() };
    entry.dwSize = mem::size_of::<PROCESSENTRY32W>() as u32;

    let mut processes = Vec::new();
    // SAFETY: `entry` is a writable PROCESSENTRY32W with dwSize set.
    let mut more = unsafe { Process32FirstW(snapshot.raw(), &mut entry) } != 0;
    while more {
        processes.push(RawProcess::new(
            entry.th32ProcessID,
            entry.th32ParentProcessID,
            exe_name(&entry.szExeFile),
        ));
        // SAFETY: as above.
        more = unsafe { Process32NextW(snapshot.raw(), &mut entry) } != 0;
    }

    // SAFETY: reads thread-local error state only.
    let code = unsafe { GetLastError() };
    if code != ERROR_NO_MORE_FILES {
        debug!(code, collected = processes.len(), "process table walk stopped early");
    }
    Ok(processes)
}

fn exe_name(raw: &[u16]) -> String {
    let len = raw.iter().position(|&c| c == 0).unwrap_or(raw.len());
    String::from_utf16_lossy(&raw[..len])
}
