use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::process::ProcessRecord;

/// A process and everything it started, as a nested tree.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessTreeNode {
    pub pid: u32,
    pub name: String,
    #[serde(rename = "memory", skip_serializing_if = "Option::is_none")]
    pub memory_bytes: Option<u64>,
    #[serde(rename = "commandLine", skip_serializing_if = "Option::is_none")]
    pub command_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(rename = "cpu", skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f64>,
    pub children: Vec<ProcessTreeNode>,
}

impl ProcessTreeNode {
    fn leaf(record: &ProcessRecord) -> Self {
        ProcessTreeNode {
            pid: record.pid,
            name: record.name.clone(),
            memory_bytes: record.memory_bytes,
            command_line: record.command_line.clone(),
            owner: record.owner.clone(),
            cpu_percent: record.cpu_percent,
            children: Vec::new(),
        }
    }

    /// Memory of this node and all descendants. `None` if no node in the
    /// subtree carries a memory figure.
    pub fn subtree_memory(&self) -> Option<u64> {
        let children = self
            .children
            .iter()
            .filter_map(ProcessTreeNode::subtree_memory)
            .reduce(|a, b| a.saturating_add(b));
        match (self.memory_bytes, children) {
            (None, None) => None,
            (own, children) => Some(own.unwrap_or(0).saturating_add(children.unwrap_or(0))),
        }
    }

    /// Number of nodes in the subtree, this one included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ProcessTreeNode::node_count).sum::<usize>()
    }
}

/// ppid -> indices of its children, in record order.
fn children_by_parent(records: &[ProcessRecord]) -> HashMap<u32, Vec<usize>> {
    let mut children: HashMap<u32, Vec<usize>> = HashMap::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        // Build parent-child links from pid/ppid only.
        if record.ppid != record.pid {
            children.entry(record.ppid).or_default().push(idx);
        }
    }
    children
}

/// `root_pid` followed by all of its descendants, depth first.
///
/// Children are visited in the order they appear in `records`. A pid is
/// emitted at most once, so parent cycles left behind by pid reuse
/// terminate. `None` when `root_pid` is not in `records`.
pub fn filter_process_list(root_pid: u32, records: &[ProcessRecord]) -> Option<Vec<ProcessRecord>> {
    let root = records.iter().position(|r| r.pid == root_pid)?;
    let children = children_by_parent(records);

    let mut visited = HashSet::new();
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(idx) = stack.pop() {
        let record = &records[idx];
        if !visited.insert(record.pid) {
            continue;
        }
        out.push(record.clone());
        if let Some(kids) = children.get(&record.pid) {
            stack.extend(kids.iter().rev());
        }
    }
    Some(out)
}

/// Nested tree rooted at `root_pid`, with the same visiting rules as
/// [`filter_process_list`].
pub fn build_process_tree(records: &[ProcessRecord], root_pid: u32) -> Option<ProcessTreeNode> {
    let root = records.iter().position(|r| r.pid == root_pid)?;
    let children = children_by_parent(records);
    let mut visited = HashSet::new();
    Some(build_node(records, &children, root, &mut visited))
}

fn build_node(
    records: &[ProcessRecord],
    children: &HashMap<u32, Vec<usize>>,
    idx: usize,
    visited: &mut HashSet<u32>,
) -> ProcessTreeNode {
    let record = &records[idx];
    visited.insert(record.pid);
    let mut node = ProcessTreeNode::leaf(record);

    if let Some(kids) = children.get(&record.pid) {
        for &child in kids {
            if visited.contains(&records[child].pid) {
                continue;
            }
            node.children.push(build_node(records, children, child, visited));
        }
    }
    node
}
