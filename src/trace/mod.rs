//! Call trace model.
//!
//! This module handles:
//! - The arena-backed trace tree (thread, method and throw nodes)
//! - Building a tree incrementally with per-call-site cost aggregation
//! - Parsing trace event records and replaying them onto a builder

pub mod builder;
pub mod events;
pub mod model;

// Re-export main types
pub use builder::TraceBuilder;
pub use events::{parse_events, TraceCollector, TraceEvent};
pub use model::{
    CallSite, MethodNode, NodeId, NodeKind, ThreadNode, ThrowNode, TraceNode, TraceTree,
};
