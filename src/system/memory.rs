use tracing::debug;

use crate::system::platform::ProcessSource;

/// Working-set size of `pid` in bytes.
pub fn sample<S: ProcessSource + ?Sized>(source: &S, pid: u32) -> Option<u64> {
    let memory = source.memory_bytes(pid);
    if memory.is_none() {
        debug!(pid, "working set unavailable");
    }
    memory
}
