//! Response frame protocol.
//!
//! This module handles:
//! - The `Frame` data type and its response categories
//! - Encoding frames to their text wire form
//! - Decoding raw text, degrading gracefully on malformed input

pub mod codec;
pub mod frame;

// Re-export main types
pub use codec::{decode, encode, try_decode};
pub use frame::{Frame, ResponseType};
