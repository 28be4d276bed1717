use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::Serialize;

/// Name reported when the OS table carries no executable name for a process.
pub const UNKNOWN_NAME: &str = "<unknown>";

/// Which optional attributes `Collector::list_processes` should attach.
///
/// Bits match the values host bindings have always passed around:
/// memory = 1, command line = 2, owner = 4.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ProcessDataFlags(u32);

impl ProcessDataFlags {
    pub const NONE: Self = Self(0);
    pub const MEMORY: Self = Self(1);
    pub const COMMAND_LINE: Self = Self(2);
    pub const OWNER: Self = Self(4);

    const ALL_BITS: u32 = Self::MEMORY.0 | Self::COMMAND_LINE.0 | Self::OWNER.0;

    pub const fn all() -> Self {
        Self(Self::ALL_BITS)
    }

    /// Unknown bits are dropped rather than rejected.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL_BITS)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ProcessDataFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ProcessDataFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ProcessDataFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::MEMORY) {
            names.push("memory");
        }
        if self.contains(Self::COMMAND_LINE) {
            names.push("command-line");
        }
        if self.contains(Self::OWNER) {
            names.push("owner");
        }
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

/// One row of the OS process table, before any enrichment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawProcess {
    pub pid: u32,
    pub ppid: u32,
    pub name: String,
}

impl RawProcess {
    pub fn new(pid: u32, ppid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            ppid,
            name: name.into(),
        }
    }
}

/// A live process as seen at snapshot time.
///
/// Every `Option` field is `None` unless the matching enrichment was both
/// requested and successful. `None` never stands in for zero, and zero never
/// stands in for "unknown".
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub ppid: u32,
    pub name: String,
    #[serde(rename = "memory", skip_serializing_if = "Option::is_none")]
    pub memory_bytes: Option<u64>,
    #[serde(rename = "commandLine", skip_serializing_if = "Option::is_none")]
    pub command_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(rename = "cpu", skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f64>,
}

impl ProcessRecord {
    pub fn new(pid: u32, ppid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            ppid,
            name: name.into(),
            memory_bytes: None,
            command_line: None,
            owner: None,
            cpu_percent: None,
        }
    }
}

impl From<RawProcess> for ProcessRecord {
    fn from(raw: RawProcess) -> Self {
        ProcessRecord::new(raw.pid, raw.ppid, raw.name)
    }
}

/// Cumulative CPU accounting read in one go for a single pid.
///
/// `process` is kernel + user time of the process, `system` is kernel + user
/// time of the whole machine (idle included, as the OS counters report it).
/// Both use the same unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CpuTimes {
    pub process: u64,
    pub system: u64,
}
