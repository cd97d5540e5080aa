//! Human-readable rendering of call trace trees.
//!
//! Produces the conventional ASCII tree view with per-call cost annotations,
//! highlighting the most expensive nested call.

pub mod tree_view;

pub use tree_view::{find_max_cost_node, render, HighlightStyle, RenderOptions, TraceRenderer};
