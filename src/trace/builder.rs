//! Incremental construction of a trace tree while events stream in.
//!
//! Calls are pushed with `open_call` and popped with `close_call`. A repeated
//! invocation of the same call site under the same parent reuses the existing
//! node, so its cost fields aggregate (`times`, min/max/total) instead of
//! producing sibling duplicates.

use super::model::{CallSite, MethodNode, NodeId, NodeKind, ThreadNode, ThrowNode, TraceTree};
use crate::utils::config::THROWS_MARK;
use crate::utils::error::TraceError;
use log::{debug, warn};

/// Builds one [`TraceTree`]; owned by a single producer
pub struct TraceBuilder {
    tree: TraceTree,
    /// Open calls, innermost last
    stack: Vec<NodeId>,
}

impl TraceBuilder {
    pub fn new(thread: ThreadNode) -> Self {
        Self {
            tree: TraceTree::new(thread),
            stack: Vec::new(),
        }
    }

    /// Node new children attach to: the innermost open call, else the root
    pub fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(NodeId::ROOT)
    }

    /// Number of calls still open
    pub fn open_calls(&self) -> usize {
        self.stack.len()
    }

    /// Enter a call at `site` under the current node
    ///
    /// Returns the node to pass back to [`TraceBuilder::close_call`].
    pub fn open_call(&mut self, site: CallSite) -> NodeId {
        let parent = self.current();
        let id = match self.find_child(parent, &site) {
            Some(existing) => existing,
            None => self
                .tree
                .push_child(parent, NodeKind::Method(MethodNode::new(site))),
        };
        self.stack.push(id);
        id
    }

    /// Leave the innermost open call, folding `elapsed_nanos` into its costs
    ///
    /// # Errors
    /// * `TraceError::NoOpenCall` - nothing is open
    /// * `TraceError::UnbalancedClose` - `id` is not the innermost open call
    pub fn close_call(&mut self, id: NodeId, elapsed_nanos: u64) -> Result<(), TraceError> {
        let top = self.stack.last().copied().ok_or(TraceError::NoOpenCall)?;
        if top != id {
            return Err(TraceError::UnbalancedClose {
                expected: top,
                found: id,
            });
        }

        let method = match self.tree.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Method(method)) => method,
            _ => return Err(TraceError::UnknownNode(id)),
        };
        method.record(elapsed_nanos);
        self.stack.pop();
        Ok(())
    }

    /// Like [`TraceBuilder::close_call`] for a call that ended by throwing
    pub fn close_call_exceptionally(
        &mut self,
        id: NodeId,
        elapsed_nanos: u64,
    ) -> Result<(), TraceError> {
        self.close_call(id, elapsed_nanos)?;
        if let Some(node) = self.tree.get_mut(id) {
            node.set_mark(THROWS_MARK);
        }
        Ok(())
    }

    /// Close whatever call is innermost
    pub fn close_current(
        &mut self,
        elapsed_nanos: u64,
        throws: bool,
    ) -> Result<NodeId, TraceError> {
        let id = self.stack.last().copied().ok_or(TraceError::NoOpenCall)?;
        if throws {
            self.close_call_exceptionally(id, elapsed_nanos)?;
        } else {
            self.close_call(id, elapsed_nanos)?;
        }
        Ok(id)
    }

    /// Attach an exception leaf under the current node
    pub fn record_throw(
        &mut self,
        exception: impl Into<String>,
        message: impl Into<String>,
        line_number: i32,
    ) -> NodeId {
        let parent = self.current();
        self.tree.push_child(
            parent,
            NodeKind::Throw(ThrowNode {
                exception: exception.into(),
                message: message.into(),
                line_number,
            }),
        )
    }

    /// Annotate the current node
    pub fn mark_current(&mut self, mark: impl Into<String>) {
        let current = self.current();
        if let Some(node) = self.tree.get_mut(current) {
            node.set_mark(mark);
        }
    }

    /// Seal the tree
    ///
    /// Calls still open keep whatever cost they had accumulated.
    pub fn finish(self) -> TraceTree {
        if !self.stack.is_empty() {
            warn!("Sealing trace with {} unclosed call(s)", self.stack.len());
        }
        debug!("Sealed trace with {} nodes", self.tree.len());
        self.tree
    }

    fn find_child(&self, parent: NodeId, site: &CallSite) -> Option<NodeId> {
        let parent = self.tree.get(parent)?;
        parent.children.iter().copied().find(|child| {
            self.tree
                .get(*child)
                .and_then(|n| n.as_method())
                .is_some_and(|m| &m.site == site)
        })
    }
}
