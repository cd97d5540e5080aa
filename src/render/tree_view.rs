//! Text rendering of a call trace tree.
//!
//! Two passes over the tree:
//! 1. find the most expensive method nested below the traced entry method
//! 2. draw one line per node with conventional ASCII branch prefixes
//!
//! ```text
//! `---ts=2020-04-29 10:34:00;thread_name=main;id=1;is_daemon=false;priority=5;TCCL=app
//!     `---[1.5ms] demo.Service:handle()
//!         +---[0.2ms] demo.Dao:load() #12
//!         `---[1.1ms] demo.Dao:save() #14
//! ```

use crate::trace::model::{
    MethodNode, NodeId, NodeKind, ThreadNode, ThrowNode, TraceNode, TraceTree,
};
use crate::utils::config::{
    NANOS_PER_MILLI, STEP_EMPTY_BOARD, STEP_FIRST_CHAR, STEP_HAS_BOARD, STEP_NORMAL_CHAR,
    THREAD_TIMESTAMP_FORMAT, TIME_UNIT, UNKNOWN_LINE,
};
use crate::utils::error::RenderError;
use log::debug;
use std::fmt::Write;

const ANSI_RED: &str = "\x1b[31m";
const ANSI_RESET: &str = "\x1b[0m";

/// How the most expensive call's cost annotation stands out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HighlightStyle {
    /// Red ANSI escape, for terminals
    #[default]
    Ansi,
    /// Red `<span>`, for the web console
    Html,
    /// No highlighting
    None,
}

impl std::str::FromStr for HighlightStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ansi" => Ok(Self::Ansi),
            "html" => Ok(Self::Html),
            "none" | "plain" => Ok(Self::None),
            other => Err(format!("unknown highlight style: {}", other)),
        }
    }
}

impl HighlightStyle {
    fn apply(self, text: &str) -> String {
        match self {
            Self::Ansi => format!("{}{}{}", ANSI_RED, text, ANSI_RESET),
            Self::Html => format!("<span style=\"color:red\">{}</span>", text),
            Self::None => text.to_string(),
        }
    }
}

/// Render configuration
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Prefix method lines with their cost annotation
    pub print_cost: bool,
    pub highlight: HighlightStyle,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            print_cost: true,
            highlight: HighlightStyle::default(),
        }
    }
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_print_cost(mut self, print_cost: bool) -> Self {
        self.print_cost = print_cost;
        self
    }

    pub fn with_highlight(mut self, highlight: HighlightStyle) -> Self {
        self.highlight = highlight;
        self
    }
}

/// Render a trace tree with default options
pub fn render(tree: &TraceTree) -> Result<String, RenderError> {
    TraceRenderer::default().render(tree)
}

/// Stateless renderer; safe to share and to call repeatedly on the same tree
#[derive(Debug, Clone, Default)]
pub struct TraceRenderer {
    options: RenderOptions,
}

impl TraceRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render `tree` to text, one line per node
    ///
    /// # Errors
    /// * `RenderError::EmptyTree` - no root
    /// * `RenderError::UnsupportedNodeType` - root is not a thread node, or a
    ///   thread node appears below it
    /// * `RenderError::DanglingNode` / `RenderError::Cycle` - malformed child links
    pub fn render(&self, tree: &TraceTree) -> Result<String, RenderError> {
        let root = tree.get(tree.root()).ok_or(RenderError::EmptyTree)?;
        if !matches!(root.kind, NodeKind::Thread(_)) {
            return Err(RenderError::UnsupportedNodeType {
                node: tree.root(),
                kind: root.kind.name(),
            });
        }

        let max_cost_node = find_max_cost_node(tree);
        debug!("Rendering {} nodes, max cost node: {:?}", tree.len(), max_cost_node);

        let mut out = String::with_capacity(2048);
        let mut visited = vec![false; tree.len()];
        self.draw(
            tree,
            tree.root(),
            true,
            "",
            max_cost_node,
            &mut visited,
            &mut out,
        )?;
        Ok(out)
    }

    #[allow(clippy::too_many_arguments)]
    fn draw(
        &self,
        tree: &TraceTree,
        id: NodeId,
        is_last: bool,
        prefix: &str,
        max_cost_node: Option<NodeId>,
        visited: &mut [bool],
        out: &mut String,
    ) -> Result<(), RenderError> {
        let node = tree.get(id).ok_or(RenderError::DanglingNode(id))?;
        if std::mem::replace(&mut visited[id.index()], true) {
            return Err(RenderError::Cycle(id));
        }

        out.push_str(prefix);
        out.push_str(if is_last { STEP_FIRST_CHAR } else { STEP_NORMAL_CHAR });
        self.render_node(out, id, node, max_cost_node == Some(id))?;
        render_mark(out, node);
        out.push('\n');

        let child_prefix = format!(
            "{}{}",
            prefix,
            if is_last { STEP_EMPTY_BOARD } else { STEP_HAS_BOARD }
        );
        let count = node.children.len();
        for (index, child) in node.children.iter().enumerate() {
            self.draw(
                tree,
                *child,
                index + 1 == count,
                &child_prefix,
                max_cost_node,
                visited,
                out,
            )?;
        }
        Ok(())
    }

    fn render_node(
        &self,
        out: &mut String,
        id: NodeId,
        node: &TraceNode,
        highlighted: bool,
    ) -> Result<(), RenderError> {
        match &node.kind {
            NodeKind::Method(method) => {
                if self.options.print_cost {
                    let cost = render_cost(method);
                    if highlighted {
                        out.push_str(&self.options.highlight.apply(&cost));
                    } else {
                        out.push_str(&cost);
                    }
                    out.push(' ');
                }
                render_method(out, method);
            }
            NodeKind::Thread(thread) if id == NodeId::ROOT => render_thread(out, thread),
            NodeKind::Thread(_) => {
                return Err(RenderError::UnsupportedNodeType {
                    node: id,
                    kind: node.kind.name(),
                })
            }
            NodeKind::Throw(throw) => render_throw(out, throw),
        }
        Ok(())
    }
}

/// Most expensive method by total cost, excluding the root and its direct children
///
/// Ties keep the first node met in depth-first order.
pub fn find_max_cost_node(tree: &TraceTree) -> Option<NodeId> {
    let mut best: Option<(NodeId, u64)> = None;
    let mut visited = vec![false; tree.len()];
    let mut stack = vec![tree.root()];

    while let Some(id) = stack.pop() {
        let Some(node) = tree.get(id) else {
            continue;
        };
        if std::mem::replace(&mut visited[id.index()], true) {
            continue;
        }

        if let Some(method) = node.as_method() {
            let beats_best = best.map_or(true, |(_, cost)| cost < method.total_cost);
            if beats_best && is_below_entry(tree, node) {
                best = Some((id, method.total_cost));
            }
        }

        stack.extend(node.children.iter().rev().copied());
    }

    best.map(|(id, _)| id)
}

/// Neither the node nor its parent is the root
fn is_below_entry(tree: &TraceTree, node: &TraceNode) -> bool {
    node.parent
        .and_then(|parent| tree.get(parent))
        .is_some_and(|parent| parent.parent.is_some())
}

fn nano_to_millis(nanos: u64) -> f64 {
    nanos as f64 / NANOS_PER_MILLI
}

/// Whole values keep one decimal place: `5.0`, `0.366865`
fn format_millis(nanos: u64) -> String {
    let millis = nano_to_millis(nanos);
    if millis.fract() == 0.0 {
        format!("{:.1}", millis)
    } else {
        millis.to_string()
    }
}

/// `[0.366865ms]` or `[min=..ms,max=..ms,total=..ms,count=N]`
fn render_cost(method: &MethodNode) -> String {
    if method.times <= 1 {
        format!("[{}{}]", format_millis(method.cost), TIME_UNIT)
    } else {
        format!(
            "[min={}{unit},max={}{unit},total={}{unit},count={}]",
            format_millis(method.min_cost),
            format_millis(method.max_cost),
            format_millis(method.total_cost),
            method.times,
            unit = TIME_UNIT
        )
    }
}

fn render_method(out: &mut String, method: &MethodNode) {
    let _ = write!(out, "{}:{}()", method.site.class_name, method.site.method_name);
    if method.site.has_line() {
        let _ = write!(out, " #{}", method.site.line_number);
    }
}

fn render_thread(out: &mut String, thread: &ThreadNode) {
    let _ = write!(
        out,
        "ts={};thread_name={};id={:x};is_daemon={};priority={};TCCL={}",
        thread.timestamp.format(THREAD_TIMESTAMP_FORMAT),
        thread.thread_name,
        thread.thread_id,
        thread.daemon,
        thread.priority,
        thread.classloader
    );
    if let Some(trace_id) = &thread.trace_id {
        let _ = write!(out, ";trace_id={}", trace_id);
    }
    if let Some(rpc_id) = &thread.rpc_id {
        let _ = write!(out, ";rpc_id={}", rpc_id);
    }
}

fn render_throw(out: &mut String, throw: &ThrowNode) {
    let _ = write!(out, "throw:{}", throw.exception);
    if throw.line_number != UNKNOWN_LINE {
        let _ = write!(out, " #{}", throw.line_number);
    }
    let _ = write!(out, " [{}]", throw.message);
}

fn render_mark(out: &mut String, node: &TraceNode) {
    let Some(mark) = node.mark.as_deref().filter(|m| !m.trim().is_empty()) else {
        return;
    };
    if node.marks > 1 {
        let _ = write!(out, " [{},{}]", mark, node.marks);
    } else {
        let _ = write!(out, " [{}]", mark);
    }
}
