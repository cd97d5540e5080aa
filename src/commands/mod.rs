//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod models;
pub mod replay;
pub mod utils;

// Re-export main command functions
pub use models::{RenderArgs, ReplayArgs};
pub use replay::{execute_replay, first_session_id, validate_args, ReplayConnection};
pub use utils::{decode_frame, display_version, encode_frame, render_trace_file};
