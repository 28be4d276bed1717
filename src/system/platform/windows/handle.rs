use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::System::Threading::{OpenProcess, PROCESS_ACCESS_RIGHTS};

/// Kernel handle closed on drop, so every early return releases it.
pub(super) struct OwnedHandle(HANDLE);

impl OwnedHandle {
    /// Take ownership of `raw`. Both failure sentinels (null and
    /// `INVALID_HANDLE_VALUE`) give `None`.
    pub(super) fn new(raw: HANDLE) -> Option<Self> {
        if raw.is_null() || raw == INVALID_HANDLE_VALUE {
            None
        } else {
            Some(OwnedHandle(raw))
        }
    }

    pub(super) fn open_process(pid: u32, access: PROCESS_ACCESS_RIGHTS) -> Option<Self> {
        // SAFETY: no pointer arguments; the result is validated before use.
        let raw = unsafe { OpenProcess(access, 0, pid) };
        Self::new(raw)
    }

    pub(super) fn raw(&self) -> HANDLE {
        self.0
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        // SAFETY: the handle was valid when wrapped and is closed only here.
        unsafe {
            CloseHandle(self.0);
        }
    }
}
