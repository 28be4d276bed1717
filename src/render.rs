//! Text and JSON output for process records and trees.

use std::collections::HashSet;
use std::fmt::Write;

use serde::Serialize;

use crate::format::{format_bytes, format_percent, pad_unicode, truncate_unicode};
use crate::system::process::{ProcessDataFlags, ProcessRecord};
use crate::system::tree::{ProcessTreeNode, build_process_tree};

const ABSENT: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Tree,
    Json,
}

impl OutputFormat {
    pub fn from_str_config(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "tree" => OutputFormat::Tree,
            "json" => OutputFormat::Json,
            _ => OutputFormat::Table,
        }
    }
}

/// Optional columns shown in table output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Columns {
    pub memory: bool,
    pub cpu: bool,
    pub owner: bool,
    pub command_line: bool,
}

impl Columns {
    pub fn from_flags(flags: ProcessDataFlags, cpu: bool) -> Self {
        Columns {
            memory: flags.contains(ProcessDataFlags::MEMORY),
            cpu,
            owner: flags.contains(ProcessDataFlags::OWNER),
            command_line: flags.contains(ProcessDataFlags::COMMAND_LINE),
        }
    }
}

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

/// Aligned table, one row per record, in record order.
///
/// The command line is the last column and is truncated to `command_width`.
pub fn render_table(records: &[ProcessRecord], columns: Columns, command_width: usize) -> String {
    let mut header = vec!["PID".to_string(), "PPID".to_string(), "NAME".to_string()];
    if columns.memory {
        header.push("MEMORY".to_string());
    }
    if columns.cpu {
        header.push("CPU".to_string());
    }
    if columns.owner {
        header.push("OWNER".to_string());
    }
    if columns.command_line {
        header.push("COMMAND".to_string());
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            let mut row = vec![r.pid.to_string(), r.ppid.to_string(), r.name.clone()];
            if columns.memory {
                row.push(r.memory_bytes.map(format_bytes).unwrap_or_else(absent));
            }
            if columns.cpu {
                row.push(r.cpu_percent.map(format_percent).unwrap_or_else(absent));
            }
            if columns.owner {
                row.push(r.owner.clone().unwrap_or_else(absent));
            }
            if columns.command_line {
                row.push(
                    r.command_line
                        .as_deref()
                        .map(|c| truncate_unicode(c, command_width))
                        .unwrap_or_else(absent),
                );
            }
            row
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(unicode_width::UnicodeWidthStr::width(cell.as_str()));
        }
    }

    let mut out = String::new();
    for row in std::iter::once(&header).chain(rows.iter()) {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| pad_unicode(cell, width))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Box-drawing view of one tree.
pub fn render_tree(root: &ProcessTreeNode, command_width: usize) -> String {
    let mut out = String::new();
    out.push_str(&node_label(root, command_width));
    if !root.children.is_empty()
        && let Some(total) = root.subtree_memory()
    {
        let _ = write!(out, " total={}", format_bytes(total));
    }
    out.push('\n');
    render_children(&root.children, "", command_width, &mut out);
    out
}

/// Every process as part of a tree. Roots are records whose parent is not
/// in `records`, in record order; anything left over (parent cycles) is
/// rendered as its own root afterwards.
pub fn render_forest(records: &[ProcessRecord], command_width: usize) -> String {
    let pids: HashSet<u32> = records.iter().map(|r| r.pid).collect();
    let mut placed = HashSet::new();
    let mut out = String::new();

    let roots = records
        .iter()
        .filter(|r| r.ppid == r.pid || !pids.contains(&r.ppid))
        .chain(records.iter());
    for record in roots {
        if placed.contains(&record.pid) {
            continue;
        }
        if let Some(tree) = build_process_tree(records, record.pid) {
            collect_pids(&tree, &mut placed);
            out.push_str(&render_tree(&tree, command_width));
        }
    }
    out
}

fn collect_pids(node: &ProcessTreeNode, pids: &mut HashSet<u32>) {
    pids.insert(node.pid);
    for child in &node.children {
        collect_pids(child, pids);
    }
}

fn render_children(
    children: &[ProcessTreeNode],
    prefix: &str,
    command_width: usize,
    out: &mut String,
) {
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        let (branch, continuation) = if last {
            ("└─ ", "   ")
        } else {
            ("├─ ", "│  ")
        };
        let _ = writeln!(out, "{prefix}{branch}{}", node_label(child, command_width));
        let nested = format!("{prefix}{continuation}");
        render_children(&child.children, &nested, command_width, out);
    }
}

fn node_label(node: &ProcessTreeNode, command_width: usize) -> String {
    let mut label = format!("{} [{}]", node.name, node.pid);
    if let Some(memory) = node.memory_bytes {
        let _ = write!(label, " mem={}", format_bytes(memory));
    }
    if let Some(cpu) = node.cpu_percent {
        let _ = write!(label, " cpu={}", format_percent(cpu));
    }
    if let Some(owner) = &node.owner {
        let _ = write!(label, " owner={owner}");
    }
    if let Some(command) = &node.command_line {
        let _ = write!(label, " cmd={}", truncate_unicode(command, command_width));
    }
    label
}

fn absent() -> String {
    ABSENT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<ProcessRecord> {
        let mut system = ProcessRecord::new(4, 0, "system");
        system.memory_bytes = Some(2048);
        let svc = ProcessRecord::new(100, 4, "svc.exe");
        let mut child = ProcessRecord::new(200, 100, "child.exe");
        child.memory_bytes = Some(1024);
        vec![system, svc, child]
    }

    #[test]
    fn output_format_from_config() {
        assert_eq!(OutputFormat::from_str_config("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str_config("tree"), OutputFormat::Tree);
        assert_eq!(OutputFormat::from_str_config("other"), OutputFormat::Table);
    }

    #[test]
    fn table_shows_requested_columns_and_absent_marker() {
        let columns = Columns::from_flags(ProcessDataFlags::MEMORY, false);
        let table = render_table(&records(), columns, 40);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "PID  PPID  NAME       MEMORY");
        assert_eq!(lines[1], "4    0     system     2 KB");
        assert_eq!(lines[2], "100  4     svc.exe    -");
        assert_eq!(lines[3], "200  100   child.exe  1 KB");
    }

    #[test]
    fn forest_places_every_record_once() {
        let forest = render_forest(&records(), 40);
        assert_eq!(forest.lines().count(), 3);
        assert!(forest.starts_with("system [4] mem=2 KB total=3 KB\n"));
    }
}
