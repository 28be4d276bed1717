use std::time::Duration;

use tracing::{debug, debug_span};

use super::command_line;
use super::cpu::{self, CPU_SAMPLE_INTERVAL};
use super::error::Result;
use super::memory;
use super::owner;
use super::platform::{NativeSource, ProcessSource};
use super::process::{ProcessDataFlags, ProcessRecord};
use super::snapshot;
use super::tree::{ProcessTreeNode, build_process_tree, filter_process_list};

/// Point-in-time process introspection.
///
/// Every call is synchronous and builds its result from scratch; nothing is
/// cached between calls. `sample_cpu` blocks for [`CPU_SAMPLE_INTERVAL`] and
/// `list_processes` may open hundreds of process handles, so callers with a
/// latency-sensitive thread should run them elsewhere.
pub struct Collector<S = NativeSource> {
    source: S,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector {
    pub fn new() -> Self {
        Collector {
            source: NativeSource::new(),
        }
    }
}

impl<S: ProcessSource> Collector<S> {
    pub fn with_source(source: S) -> Self {
        Collector { source }
    }

    /// Enumerate live processes and attach the enrichments named in `flags`.
    ///
    /// Fails only if the process table cannot be opened. A failed enrichment
    /// leaves that one field of that one record empty.
    pub fn list_processes(&self, flags: ProcessDataFlags) -> Result<Vec<ProcessRecord>> {
        let _span = debug_span!("collector.list_processes", %flags).entered();

        let raw = snapshot::enumerate(&self.source)?;
        let records: Vec<ProcessRecord> = raw
            .into_iter()
            .map(|entry| {
                let mut record = ProcessRecord::from(entry);
                if flags.contains(ProcessDataFlags::MEMORY) {
                    record.memory_bytes = memory::sample(&self.source, record.pid);
                }
                if flags.contains(ProcessDataFlags::COMMAND_LINE) {
                    record.command_line = command_line::extract(&self.source, record.pid);
                }
                if flags.contains(ProcessDataFlags::OWNER) {
                    record.owner = owner::resolve(&self.source, record.pid);
                }
                record
            })
            .collect();

        debug!(count = records.len(), "process list assembled");
        Ok(records)
    }

    /// Attach CPU usage to `records`, keeping their order.
    ///
    /// Blocks for [`CPU_SAMPLE_INTERVAL`]. Records whose pid could not be
    /// sampled come back with `cpu_percent` set to `None`.
    pub fn sample_cpu(&self, records: Vec<ProcessRecord>) -> Vec<ProcessRecord> {
        self.sample_cpu_with_interval(records, CPU_SAMPLE_INTERVAL)
    }

    pub(crate) fn sample_cpu_with_interval(
        &self,
        mut records: Vec<ProcessRecord>,
        interval: Duration,
    ) -> Vec<ProcessRecord> {
        let _span = debug_span!("collector.sample_cpu", records = records.len()).entered();

        let pids: Vec<u32> = records.iter().map(|r| r.pid).collect();
        let usage = cpu::sample_batch_with_interval(&self.source, &pids, interval);
        for record in &mut records {
            record.cpu_percent = usage.get(&record.pid).copied().flatten();
        }
        records
    }

    /// `root_pid` and all of its descendants, root first.
    ///
    /// `Ok(None)` when `root_pid` is not running.
    pub fn process_list(
        &self,
        root_pid: u32,
        flags: ProcessDataFlags,
    ) -> Result<Option<Vec<ProcessRecord>>> {
        let records = self.list_processes(flags)?;
        Ok(filter_process_list(root_pid, &records))
    }

    /// Nested tree rooted at `root_pid`.
    ///
    /// `Ok(None)` when `root_pid` is not running.
    pub fn process_tree(
        &self,
        root_pid: u32,
        flags: ProcessDataFlags,
    ) -> Result<Option<ProcessTreeNode>> {
        let records = self.list_processes(flags)?;
        Ok(build_process_tree(&records, root_pid))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::system::error::Error;
    use crate::system::process::{CpuTimes, RawProcess};

    /// Scripted source: the n-th CPU reading of a pid is `cpu[pid][n]`.
    #[derive(Default)]
    struct ScriptedSource {
        processes: Vec<RawProcess>,
        fail_snapshot: bool,
        memory: HashMap<u32, u64>,
        command_lines: HashMap<u32, String>,
        owners: HashMap<u32, String>,
        cpu: HashMap<u32, Vec<CpuTimes>>,
        cpu_reads: RefCell<HashMap<u32, usize>>,
    }

    impl ProcessSource for ScriptedSource {
        fn snapshot(&self) -> Result<Vec<RawProcess>> {
            if self.fail_snapshot {
                return Err(Error::snapshot(Some(5), "Access is denied."));
            }
            Ok(self.processes.clone())
        }

        fn memory_bytes(&self, pid: u32) -> Option<u64> {
            self.memory.get(&pid).copied()
        }

        fn command_line(&self, pid: u32) -> Option<String> {
            self.command_lines.get(&pid).cloned()
        }

        fn owner(&self, pid: u32) -> Option<String> {
            self.owners.get(&pid).cloned()
        }

        fn cpu_times(&self, pid: u32) -> Option<CpuTimes> {
            let mut reads = self.cpu_reads.borrow_mut();
            let n = reads.entry(pid).or_insert(0);
            let reading = self.cpu.get(&pid)?.get(*n).copied();
            *n += 1;
            reading
        }
    }

    fn three_processes() -> ScriptedSource {
        ScriptedSource {
            processes: vec![
                RawProcess::new(4, 0, "system"),
                RawProcess::new(100, 4, "svc.exe"),
                RawProcess::new(200, 100, "child.exe"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn snapshot_failure_is_fatal() {
        let source = ScriptedSource {
            fail_snapshot: true,
            ..three_processes()
        };
        let collector = Collector::with_source(source);
        assert!(matches!(
            collector.list_processes(ProcessDataFlags::all()),
            Err(Error::Snapshot { .. })
        ));
        assert!(collector.process_list(4, ProcessDataFlags::NONE).is_err());
    }

    #[test]
    fn memory_attached_only_when_requested() {
        let mut source = three_processes();
        source.memory.insert(100, 8192);
        let collector = Collector::with_source(source);

        let plain = collector.list_processes(ProcessDataFlags::NONE).unwrap();
        assert!(plain.iter().all(|r| r.memory_bytes.is_none()));

        let with_memory = collector.list_processes(ProcessDataFlags::MEMORY).unwrap();
        assert_eq!(with_memory[1].memory_bytes, Some(8192));
        assert_eq!(with_memory[0].memory_bytes, None);
        assert!(with_memory.iter().all(|r| r.command_line.is_none()));
    }

    #[test]
    fn empty_command_line_is_absent() {
        let mut source = three_processes();
        source.command_lines.insert(4, String::new());
        source.command_lines.insert(100, "svc.exe -k".into());
        let collector = Collector::with_source(source);

        let records = collector
            .list_processes(ProcessDataFlags::COMMAND_LINE)
            .unwrap();
        assert_eq!(records[0].command_line, None);
        assert_eq!(records[1].command_line.as_deref(), Some("svc.exe -k"));
    }

    #[test]
    fn cpu_sample_computes_percentage() {
        let mut source = three_processes();
        // 0.5s of process time over 1.0s of system time, in 100ns units.
        source.cpu.insert(
            100,
            vec![
                CpuTimes { process: 0, system: 0 },
                CpuTimes { process: 5_000_000, system: 10_000_000 },
            ],
        );
        let collector = Collector::with_source(source);
        let records = collector.list_processes(ProcessDataFlags::NONE).unwrap();
        let input: Vec<ProcessRecord> = records.into_iter().filter(|r| r.pid == 100).collect();

        let sampled = collector.sample_cpu_with_interval(input, Duration::ZERO);
        assert_eq!(sampled.len(), 1);
        let pct = sampled[0].cpu_percent.expect("cpu should be sampled");
        assert!((pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn cpu_sample_keeps_order_and_unsampled_records() {
        let mut source = three_processes();
        source.cpu.insert(
            200,
            vec![
                CpuTimes { process: 10, system: 1_000 },
                CpuTimes { process: 110, system: 2_000 },
            ],
        );
        let collector = Collector::with_source(source);
        let mut input = collector.list_processes(ProcessDataFlags::NONE).unwrap();
        input[0].cpu_percent = Some(99.0);

        let sampled = collector.sample_cpu_with_interval(input, Duration::ZERO);
        let pids: Vec<u32> = sampled.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![4, 100, 200]);
        assert_eq!(sampled[0].cpu_percent, None);
        assert_eq!(sampled[1].cpu_percent, None);
        assert_eq!(sampled[2].cpu_percent, Some(10.0));
    }

    #[test]
    fn duplicate_pid_is_sampled_once_and_shared() {
        let mut source = three_processes();
        // A second read pair would be a different percentage.
        source.cpu.insert(
            100,
            vec![
                CpuTimes { process: 0, system: 0 },
                CpuTimes { process: 5_000_000, system: 10_000_000 },
                CpuTimes { process: 5_000_000, system: 10_000_000 },
                CpuTimes { process: 5_000_000, system: 20_000_000 },
            ],
        );
        let collector = Collector::with_source(source);
        let input = vec![
            ProcessRecord::new(100, 4, "svc.exe"),
            ProcessRecord::new(100, 4, "svc.exe"),
        ];

        let sampled = collector.sample_cpu_with_interval(input, Duration::ZERO);
        let cpu: Vec<Option<f64>> = sampled.iter().map(|r| r.cpu_percent).collect();
        assert_eq!(cpu, vec![Some(50.0), Some(50.0)]);
        assert_eq!(collector.source.cpu_reads.borrow()[&100], 2);
    }

    #[test]
    fn process_list_for_missing_root_is_none() {
        let collector = Collector::with_source(three_processes());
        assert_eq!(
            collector
                .process_list(31337, ProcessDataFlags::NONE)
                .unwrap(),
            None
        );
        let subtree = collector
            .process_list(100, ProcessDataFlags::NONE)
            .unwrap()
            .unwrap();
        let pids: Vec<u32> = subtree.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![100, 200]);
    }
}
