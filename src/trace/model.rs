//! Arena-backed call trace tree.
//!
//! Nodes live in a single vector owned by the tree; children are stored as
//! indices in temporal order and each node keeps its parent index for
//! upward traversal. The root (index 0) is always the thread node.

use crate::utils::config::UNKNOWN_LINE;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node inside its [`TraceTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Thread context the trace was captured on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadNode {
    pub timestamp: NaiveDateTime,
    pub thread_name: String,
    pub thread_id: u64,
    #[serde(default)]
    pub daemon: bool,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub classloader: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_id: Option<String>,
}

fn default_priority() -> i32 {
    5
}

impl ThreadNode {
    pub fn new(timestamp: NaiveDateTime, thread_name: impl Into<String>, thread_id: u64) -> Self {
        Self {
            timestamp,
            thread_name: thread_name.into(),
            thread_id,
            daemon: false,
            priority: default_priority(),
            classloader: String::new(),
            trace_id: None,
            rpc_id: None,
        }
    }
}

/// A (class, method, line) combination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSite {
    pub class_name: String,
    pub method_name: String,
    #[serde(default = "unknown_line")]
    pub line_number: i32,
}

pub(crate) fn unknown_line() -> i32 {
    UNKNOWN_LINE
}

impl CallSite {
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        line_number: i32,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            line_number,
        }
    }

    /// Call site with no line information
    pub fn unlined(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self::new(class_name, method_name, UNKNOWN_LINE)
    }

    pub fn has_line(&self) -> bool {
        self.line_number != UNKNOWN_LINE
    }
}

/// A traced method invocation, possibly aggregated over repeated calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodNode {
    #[serde(flatten)]
    pub site: CallSite,
    /// Number of finished invocations at this call site
    #[serde(default)]
    pub times: u32,
    /// Elapsed nanoseconds of the last invocation
    #[serde(default)]
    pub cost: u64,
    #[serde(default)]
    pub min_cost: u64,
    #[serde(default)]
    pub max_cost: u64,
    #[serde(default)]
    pub total_cost: u64,
}

impl MethodNode {
    pub fn new(site: CallSite) -> Self {
        Self {
            site,
            times: 0,
            cost: 0,
            min_cost: 0,
            max_cost: 0,
            total_cost: 0,
        }
    }

    /// Fold one finished invocation into the cost fields
    pub fn record(&mut self, elapsed_nanos: u64) {
        if self.times == 0 {
            self.min_cost = elapsed_nanos;
            self.max_cost = elapsed_nanos;
        } else {
            self.min_cost = self.min_cost.min(elapsed_nanos);
            self.max_cost = self.max_cost.max(elapsed_nanos);
        }
        self.times += 1;
        self.cost = elapsed_nanos;
        self.total_cost = self.total_cost.saturating_add(elapsed_nanos);
    }

    pub fn average_cost(&self) -> Option<f64> {
        (self.times > 0).then(|| self.total_cost as f64 / self.times as f64)
    }
}

/// An exception thrown inside a traced call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrowNode {
    pub exception: String,
    #[serde(default)]
    pub message: String,
    #[serde(default = "unknown_line")]
    pub line_number: i32,
}

/// Node payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Thread(ThreadNode),
    Method(MethodNode),
    Throw(ThrowNode),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Thread(_) => "thread",
            NodeKind::Method(_) => "method",
            NodeKind::Throw(_) => "throw",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceNode {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark: Option<String>,
    #[serde(default)]
    pub marks: u32,
}

impl TraceNode {
    pub fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            mark: None,
            marks: 0,
        }
    }

    /// Set the annotation; every call counts towards `marks`
    pub fn set_mark(&mut self, mark: impl Into<String>) {
        self.mark = Some(mark.into());
        self.marks += 1;
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn as_method(&self) -> Option<&MethodNode> {
        match &self.kind {
            NodeKind::Method(method) => Some(method),
            _ => None,
        }
    }
}

/// A finished call trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceTree {
    nodes: Vec<TraceNode>,
}

impl TraceTree {
    /// Tree holding only its thread root
    pub fn new(thread: ThreadNode) -> Self {
        Self {
            nodes: vec![TraceNode::new(NodeKind::Thread(thread), None)],
        }
    }

    /// Build a tree from raw nodes, e.g. read back from disk
    ///
    /// No structural checks happen here; the renderer validates.
    pub fn from_nodes(nodes: Vec<TraceNode>) -> Self {
        Self { nodes }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn get(&self, id: NodeId) -> Option<&TraceNode> {
        self.nodes.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut TraceNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[TraceNode] {
        &self.nodes
    }

    pub fn thread(&self) -> Option<&ThreadNode> {
        match self.nodes.first().map(|n| &n.kind) {
            Some(NodeKind::Thread(thread)) => Some(thread),
            _ => None,
        }
    }

    /// Append `kind` as the last child of `parent`
    pub(crate) fn push_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TraceNode::new(kind, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Distance from the root, following parent links
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.get(parent).and_then(|n| n.parent);
            if depth > self.nodes.len() {
                break;
            }
        }
        depth
    }

    /// Number of method nodes in the tree
    pub fn method_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.as_method().is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn thread() -> ThreadNode {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        ThreadNode::new(ts, "main", 1)
    }

    fn method(class_name: &str, method_name: &str) -> NodeKind {
        NodeKind::Method(MethodNode::new(CallSite::unlined(class_name, method_name)))
    }

    #[test]
    fn test_record_single_invocation() {
        let mut node = MethodNode::new(CallSite::unlined("Foo", "bar"));
        node.record(42);
        assert_eq!(node.times, 1);
        assert_eq!(node.cost, 42);
        assert_eq!(node.total_cost, 42);
        assert_eq!(node.min_cost, 42);
        assert_eq!(node.max_cost, 42);
    }

    #[test]
    fn test_record_aggregates_min_max_total() {
        let mut node = MethodNode::new(CallSite::unlined("Foo", "bar"));
        node.record(10);
        node.record(30);
        node.record(20);
        assert_eq!(node.times, 3);
        assert_eq!(node.min_cost, 10);
        assert_eq!(node.max_cost, 30);
        assert_eq!(node.total_cost, 60);
        assert_eq!(node.average_cost(), Some(20.0));
    }

    #[test]
    fn test_set_mark_counts() {
        let throw = ThrowNode {
            exception: "E".to_string(),
            message: String::new(),
            line_number: 1,
        };
        let mut node = TraceNode::new(NodeKind::Throw(throw), None);
        node.set_mark("m");
        node.set_mark("m");
        assert_eq!(node.marks, 2);
        assert_eq!(node.mark.as_deref(), Some("m"));
    }

    #[test]
    fn test_push_child_links_parent_and_depth() {
        let mut tree = TraceTree::new(thread());
        let a = tree.push_child(tree.root(), method("A", "a"));
        let b = tree.push_child(a, method("B", "b"));

        assert_eq!(tree.get(b).unwrap().parent, Some(a));
        assert_eq!(tree.get(a).unwrap().children, vec![b]);
        assert_eq!(tree.depth(tree.root()), 0);
        assert_eq!(tree.depth(a), 1);
        assert_eq!(tree.depth(b), 2);
        assert_eq!(tree.method_count(), 2);
    }

    #[test]
    fn test_call_site_line_sentinel() {
        assert!(!CallSite::unlined("A", "a").has_line());
        assert!(CallSite::new("A", "a", 12).has_line());
    }
}
