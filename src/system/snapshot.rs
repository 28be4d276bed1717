use std::collections::HashSet;

use tracing::{debug, debug_span};

use super::error::Result;
use super::platform::ProcessSource;
use super::process::{RawProcess, UNKNOWN_NAME};

/// Walk the process table once.
///
/// The idle pseudo-process (pid 0) is skipped, a pid is kept only the first
/// time it appears, and entries without a name get [`UNKNOWN_NAME`]. Order is
/// the order the OS reported. Failing to open the table is the only error.
pub fn enumerate<S: ProcessSource + ?Sized>(source: &S) -> Result<Vec<RawProcess>> {
    let _span = debug_span!("snapshot.enumerate").entered();

    let entries = source.snapshot()?;
    let mut seen = HashSet::with_capacity(entries.len());
    let mut processes = Vec::with_capacity(entries.len());

    for mut entry in entries {
        if entry.pid == 0 {
            continue;
        }
        if !seen.insert(entry.pid) {
            debug!(pid = entry.pid, "duplicate pid in process table");
            continue;
        }
        if entry.name.is_empty() {
            entry.name = UNKNOWN_NAME.to_string();
        }
        processes.push(entry);
    }

    debug!(count = processes.len(), "process table walked");
    Ok(processes)
}
