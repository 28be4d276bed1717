//! Command line extraction.
//!
//! The OS side copies a length-prefixed UTF-16 buffer out of another
//! process. Lengths in that buffer descriptor come from memory the target
//! owns, so they are bounded here before anything is copied, and the copied
//! units are decoded strictly: a bad buffer yields `None`, never a mangled
//! string.

use tracing::debug;

use crate::system::platform::ProcessSource;

/// Most UTF-16 units copied out of a remote command line buffer. Longer
/// command lines are truncated to this many units.
pub const COMMAND_LINE_CAPACITY: usize = 32_767;

/// Command line of `pid`, or `None` if it cannot be read or is empty.
pub fn extract<S: ProcessSource + ?Sized>(source: &S, pid: u32) -> Option<String> {
    match source.command_line(pid) {
        Some(command) if !command.is_empty() => Some(command),
        Some(_) => {
            debug!(pid, "command line is empty");
            None
        }
        None => {
            debug!(pid, "command line unavailable");
            None
        }
    }
}

/// How many UTF-16 units to copy for a remote buffer whose descriptor
/// claims `reported_bytes` bytes, given room for `capacity` units locally.
///
/// Returns `None` when there is nothing to copy. An odd byte count is
/// rounded down to whole units.
pub fn bounded_units(reported_bytes: usize, capacity: usize) -> Option<usize> {
    let units = (reported_bytes / 2).min(capacity);
    (units > 0).then_some(units)
}

/// Decode a copied command line buffer.
///
/// `truncated` says whether the copy stopped short of the remote length; in
/// that case a high surrogate left dangling at the cut is dropped so the
/// prefix still decodes. Trailing NULs are ignored. Any other invalid UTF-16
/// makes the whole result `None`.
pub fn decode_units(units: &[u16], truncated: bool) -> Option<String> {
    let mut end = units.len();
    while end > 0 && units[end - 1] == 0 {
        end -= 1;
    }
    if truncated && end > 0 && (0xD800..=0xDBFF).contains(&units[end - 1]) {
        end -= 1;
    }
    if end == 0 {
        return None;
    }
    String::from_utf16(&units[..end]).ok()
}
