//! Diag Trace
//!
//! Response protocol and call-trace rendering for remote JVM diagnostics.
//!
//! This crate provides:
//! - the text frame codec used between a diagnostics agent and its clients
//! - a session multiplexer routing frames from one connection to many waiters
//! - an aggregated call trace tree and its ASCII renderer
//!
//! ## Getting Started
//!
//! ```bash
//! diag-trace replay --input frames.txt --session 7f3a
//! diag-trace --help
//! ```

pub mod commands;
pub mod output;
pub mod protocol;
pub mod render;
pub mod resolver;
pub mod session;
pub mod trace;
pub mod transport;
pub mod utils;
