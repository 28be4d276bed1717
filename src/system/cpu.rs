//! Delta-based CPU usage sampling.
//!
//! Two readings of process and system CPU totals are taken
//! [`CPU_SAMPLE_INTERVAL`] apart and the process share of the system delta
//! is reported as a percentage. The call blocks for the whole interval.
//!
//! A pid that exits and is reused by an unrelated process between the two
//! readings is not detected; the result then mixes both processes. A reused
//! pid whose totals went backwards yields `None`.

use std::collections::{HashMap, HashSet};
use std::thread;
use std::time::Duration;

use tracing::{debug, debug_span};

use super::platform::ProcessSource;
use super::process::CpuTimes;

/// Fixed gap between the two readings.
pub const CPU_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CpuSample {
    pub pid: u32,
    pub initial_process_time: Option<u64>,
    pub initial_system_time: Option<u64>,
    pub cpu_percent: Option<f64>,
}

impl CpuSample {
    fn new(pid: u32) -> Self {
        CpuSample {
            pid,
            initial_process_time: None,
            initial_system_time: None,
            cpu_percent: None,
        }
    }

    fn record_initial(&mut self, times: CpuTimes) {
        self.initial_process_time = Some(times.process);
        self.initial_system_time = Some(times.system);
    }

    fn initial(&self) -> Option<CpuTimes> {
        Some(CpuTimes {
            process: self.initial_process_time?,
            system: self.initial_system_time?,
        })
    }
}

/// Percentage of system CPU time spent in the process between two readings.
///
/// `None` when the system delta is zero, when either total went backwards,
/// or when the result is not a finite number.
pub fn cpu_percent(initial: CpuTimes, current: CpuTimes) -> Option<f64> {
    let process_delta = current.process.checked_sub(initial.process)?;
    let system_delta = current.system.checked_sub(initial.system)?;
    if system_delta == 0 {
        return None;
    }
    let percent = 100.0 * process_delta as f64 / system_delta as f64;
    percent.is_finite().then_some(percent)
}

/// Sample every pid in `pids`, blocking for [`CPU_SAMPLE_INTERVAL`].
///
/// Every requested pid is a key of the result; the value is `None` when
/// either reading failed or the percentage is undefined.
pub fn sample_batch<S: ProcessSource + ?Sized>(
    source: &S,
    pids: &[u32],
) -> HashMap<u32, Option<f64>> {
    sample_batch_with_interval(source, pids, CPU_SAMPLE_INTERVAL)
}

pub(crate) fn sample_batch_with_interval<S: ProcessSource + ?Sized>(
    source: &S,
    pids: &[u32],
    interval: Duration,
) -> HashMap<u32, Option<f64>> {
    let _span = debug_span!("cpu.sample_batch", pids = pids.len()).entered();

    let mut seen = HashSet::with_capacity(pids.len());
    let mut samples: Vec<CpuSample> = pids
        .iter()
        .copied()
        .filter(|pid| seen.insert(*pid))
        .map(CpuSample::new)
        .collect();
    if samples.is_empty() {
        return HashMap::new();
    }

    for sample in &mut samples {
        match source.cpu_times(sample.pid) {
            Some(times) => sample.record_initial(times),
            None => debug!(pid = sample.pid, "first cpu reading failed"),
        }
    }

    thread::sleep(interval);

    for sample in &mut samples {
        let Some(initial) = sample.initial() else {
            continue;
        };
        let Some(current) = source.cpu_times(sample.pid) else {
            debug!(pid = sample.pid, "second cpu reading failed");
            continue;
        };
        sample.cpu_percent = cpu_percent(initial, current);
        if sample.cpu_percent.is_none() {
            debug!(pid = sample.pid, "cpu usage undefined for this interval");
        }
    }

    samples
        .into_iter()
        .map(|sample| (sample.pid, sample.cpu_percent))
        .collect()
}
