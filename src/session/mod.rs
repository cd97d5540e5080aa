//! Concurrent sessions over a single connection.

pub mod client;
pub mod multiplexer;

pub use client::Client;
pub use multiplexer::{CancelToken, Multiplexer, MultiplexerConfig, NextFrame, Routing};
