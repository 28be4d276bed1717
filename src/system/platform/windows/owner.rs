use std::ffi::c_void;
use std::ptr;
use std::slice;

use tracing::debug;
use windows_sys::Win32::Foundation::{HANDLE, LocalFree};
use windows_sys::Win32::Security::Authorization::ConvertSidToStringSidW;
use windows_sys::Win32::Security::{
    GetTokenInformation, LookupAccountSidW, SID_NAME_USE, TOKEN_QUERY, TOKEN_USER, TokenUser,
};
use windows_sys::Win32::System::Threading::{OpenProcessToken, PROCESS_QUERY_LIMITED_INFORMATION};

use super::handle::OwnedHandle;
use crate::system::owner::qualified_account;

/// Owner of the primary token of `pid`: `DOMAIN\name`, or the string SID
/// when the account cannot be looked up.
pub(super) fn token_owner(pid: u32) -> Option<String> {
    let process = OwnedHandle::open_process(pid, PROCESS_QUERY_LIMITED_INFORMATION)?;

    let mut raw_token: HANDLE = ptr::null_mut();
    // SAFETY: `raw_token` is a writable HANDLE slot.
    if unsafe { OpenProcessToken(process.raw(), TOKEN_QUERY, &mut raw_token) } == 0 {
        return None;
    }
    let token = OwnedHandle::new(raw_token)?;

    let mut needed = 0u32;
    // SAFETY: size query; a null buffer of length 0 is allowed.
    unsafe { GetTokenInformation(token.raw(), TokenUser, ptr::null_mut(), 0, &mut needed) };
    if needed == 0 {
        return None;
    }

    // u64 backing keeps TOKEN_USER aligned.
    let mut buffer = vec![0u64; (needed as usize).div_ceil(8)];
    // SAFETY: `buffer` holds at least `needed` bytes.
    let ok = unsafe {
        GetTokenInformation(
            token.raw(),
            TokenUser,
            buffer.as_mut_ptr().cast(),
            needed,
            &mut needed,
        )
    };
    if ok == 0 {
        return None;
    }
    // SAFETY: on success the buffer starts with a TOKEN_USER whose SID
    // points into the same buffer, which outlives every use below.
    let sid = unsafe { (*buffer.as_ptr().cast::<TOKEN_USER>()).User.Sid };

    account_name(sid).or_else(|| {
        debug!(pid, "account lookup failed, using string SID");
        string_sid(sid)
    })
}

fn account_name(sid: *mut c_void) -> Option<String> {
    let mut name_len = 0u32;
    let mut domain_len = 0u32;
    let mut sid_use: SID_NAME_USE = 0;
    // SAFETY: size query with null buffers.
    unsafe {
        LookupAccountSidW(
            ptr::null(),
            sid,
            ptr::null_mut(),
            &mut name_len,
            ptr::null_mut(),
            &mut domain_len,
            &mut sid_use,
        )
    };
    if name_len == 0 {
        return None;
    }

    let mut name = vec![0u16; name_len as usize];
    let mut domain = vec![0u16; domain_len.max(1) as usize];
    domain_len = domain.len() as u32;
    // SAFETY: both buffers are as long as the lengths passed.
    let ok = unsafe {
        LookupAccountSidW(
            ptr::null(),
            sid,
            name.as_mut_ptr(),
            &mut name_len,
            domain.as_mut_ptr(),
            &mut domain_len,
            &mut sid_use,
        )
    };
    if ok == 0 {
        return None;
    }

    // On success the lengths exclude the terminating NUL.
    let name = String::from_utf16_lossy(&name[..(name_len as usize).min(name.len())]);
    let domain = String::from_utf16_lossy(&domain[..(domain_len as usize).min(domain.len())]);
    qualified_account(&domain, &name)
}

fn string_sid(sid: *mut c_void) -> Option<String> {
    let mut raw: *mut u16 = ptr::null_mut();
    // SAFETY: `raw` receives a LocalAlloc'd string freed below.
    if unsafe { ConvertSidToStringSidW(sid, &mut raw) } == 0 || raw.is_null() {
        return None;
    }
    // SAFETY: the string is NUL-terminated.
    let len = (0..).take_while(|&i| unsafe { *raw.add(i) } != 0).count();
    // SAFETY: `len` units before the terminator are initialised.
    let text = String::from_utf16_lossy(unsafe { slice::from_raw_parts(raw, len) });
    // SAFETY: allocated by ConvertSidToStringSidW with LocalAlloc.
    unsafe { LocalFree(raw.cast()) };
    (!text.is_empty()).then_some(text)
}
