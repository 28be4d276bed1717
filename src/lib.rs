//! Point-in-time process tree introspection.
//!
//! [`Collector`] walks the OS process table once and optionally attaches
//! working-set size, command line and owning account to each process.
//! CPU usage is a separate, blocking call against records you already have.
//!
//! ```no_run
//! use proctree::{Collector, ProcessDataFlags};
//!
//! let collector = Collector::new();
//! let records = collector.list_processes(ProcessDataFlags::MEMORY | ProcessDataFlags::OWNER)?;
//! let with_cpu = collector.sample_cpu(records);
//! # Ok::<(), proctree::Error>(())
//! ```

pub mod config;
pub mod format;
pub mod render;
pub mod system;

pub use system::collector::Collector;
pub use system::error::{Error, Result};
pub use system::platform::{NativeSource, ProcessSource};
pub use system::process::{CpuTimes, ProcessDataFlags, ProcessRecord, RawProcess};
pub use system::tree::{ProcessTreeNode, build_process_tree, filter_process_list};
