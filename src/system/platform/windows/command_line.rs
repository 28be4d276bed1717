//! Command line of another process, read through its PEB.
//!
//! NtQueryInformationProcess(ProcessBasicInformation) -> PEB ->
//! RTL_USER_PROCESS_PARAMETERS -> CommandLine UNICODE_STRING -> buffer.
//! Only the leading fields of each NT structure are declared; their layout
//! has been stable for a long time but is not a documented contract.

use std::ffi::c_void;
use std::mem::{self, MaybeUninit};
use std::ptr;
use std::sync::OnceLock;

use tracing::{debug, warn};
use windows_sys::Win32::Foundation::HANDLE;
use windows_sys::Win32::System::Diagnostics::Debug::ReadProcessMemory;
use windows_sys::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};
use windows_sys::Win32::System::Threading::{PROCESS_QUERY_INFORMATION, PROCESS_VM_READ};

use super::handle::OwnedHandle;
use crate::system::command_line::{COMMAND_LINE_CAPACITY, bounded_units, decode_units};

type NtQueryInformationProcessFn =
    unsafe extern "system" fn(HANDLE, u32, *mut c_void, u32, *mut u32) -> i32;

const PROCESS_BASIC_INFORMATION_CLASS: u32 = 0;

static NT_QUERY_INFORMATION_PROCESS: OnceLock<Option<NtQueryInformationProcessFn>> =
    OnceLock::new();

#[repr(C)]
struct ProcessBasicInformation {
    _exit_status: i32,
    peb_base_address: *mut c_void,
    _affinity_mask: usize,
    _base_priority: i32,
    _unique_process_id: usize,
    _inherited_from_unique_process_id: usize,
}

/// PEB up to and including ProcessParameters.
#[repr(C)]
struct PebPrefix {
    _reserved1: [u8; 2],
    _being_debugged: u8,
    _reserved2: [u8; 1],
    _reserved3: [*mut c_void; 2],
    _ldr: *mut c_void,
    process_parameters: *mut c_void,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct UnicodeString {
    length: u16,
    _maximum_length: u16,
    buffer: *mut u16,
}

/// RTL_USER_PROCESS_PARAMETERS up to and including CommandLine.
#[repr(C)]
struct ProcessParametersPrefix {
    _reserved1: [u8; 16],
    _reserved2: [*mut c_void; 10],
    _image_path_name: UnicodeString,
    command_line: UnicodeString,
}

/// Resolved once per process. If ntdll does not export the entry point,
/// command lines are always absent.
fn nt_query_information_process() -> Option<NtQueryInformationProcessFn> {
    *NT_QUERY_INFORMATION_PROCESS.get_or_init(|| {
        let module: Vec<u16> = "ntdll.dll".encode_utf16().chain(Some(0)).collect();
        // SAFETY: `module` is NUL-terminated; ntdll is mapped into every process.
        let ntdll = unsafe { GetModuleHandleW(module.as_ptr()) };
        if ntdll.is_null() {
            warn!("ntdll.dll not loaded; command lines unavailable");
            return None;
        }
        // SAFETY: the name is a NUL-terminated ANSI string.
        let entry = unsafe { GetProcAddress(ntdll, b"NtQueryInformationProcess\0".as_ptr()) };
        match entry {
            // SAFETY: the export has exactly this signature.
            Some(f) => Some(unsafe {
                mem::transmute::<unsafe extern "system" fn() -> isize, NtQueryInformationProcessFn>(
                    f,
                )
            }),
            None => {
                warn!("NtQueryInformationProcess not exported; command lines unavailable");
                None
            }
        }
    })
}

/// Copy a `T` from `address` in `process`. Partial reads count as failure.
///
/// # Safety
///
/// `T` must be valid for any bit pattern.
unsafe fn read_remote<T>(process: &OwnedHandle, address: *const c_void) -> Option<T> {
    if address.is_null() {
        return None;
    }
    let mut value = MaybeUninit::<T>::uninit();
    let mut read = 0usize;
    // SAFETY: `value` has room for size_of::<T>() bytes.
    let ok = unsafe {
        ReadProcessMemory(
            process.raw(),
            address,
            value.as_mut_ptr().cast(),
            mem::size_of::<T>(),
            &mut read,
        )
    };
    if ok == 0 || read != mem::size_of::<T>() {
        return None;
    }
    // SAFETY: fully written above and T accepts any bit pattern.
    Some(unsafe { value.assume_init() })
}

pub(super) fn read_command_line(pid: u32) -> Option<String> {
    let query = nt_query_information_process()?;
    let process = OwnedHandle::open_process(pid, PROCESS_QUERY_INFORMATION | PROCESS_VM_READ)?;

    // SAFETY: plain data; all-zero is a valid value.
    let mut info: ProcessBasicInformation = unsafe { mem::zeroed() };
    // SAFETY: `info` is writable and exactly the size passed.
    let status = unsafe {
        query(
            process.raw(),
            PROCESS_BASIC_INFORMATION_CLASS,
            (&mut info as *mut ProcessBasicInformation).cast(),
            mem::size_of::<ProcessBasicInformation>() as u32,
            ptr::null_mut(),
        )
    };
    if status < 0 {
        debug!(pid, status, "NtQueryInformationProcess failed");
        return None;
    }

    // SAFETY: both prefixes are raw pointers and integers only.
    let peb: PebPrefix = unsafe { read_remote(&process, info.peb_base_address) }?;
    let params: ProcessParametersPrefix =
        unsafe { read_remote(&process, peb.process_parameters) }?;

    let descriptor = params.command_line;
    if descriptor.buffer.is_null() {
        return None;
    }
    // The remote length is only trusted up to our own capacity.
    let units = bounded_units(usize::from(descriptor.length), COMMAND_LINE_CAPACITY)?;
    let bytes = units * mem::size_of::<u16>();

    let mut buffer = vec![0u16; units];
    let mut read = 0usize;
    // SAFETY: `buffer` holds exactly `bytes` bytes.
    let ok = unsafe {
        ReadProcessMemory(
            process.raw(),
            descriptor.buffer as *const c_void,
            buffer.as_mut_ptr().cast(),
            bytes,
            &mut read,
        )
    };
    if ok == 0 || read != bytes {
        debug!(pid, "command line buffer read failed");
        return None;
    }

    let truncated = bytes < (usize::from(descriptor.length) & !1);
    decode_units(&buffer, truncated)
}
