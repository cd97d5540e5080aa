//! Error types for the entire library.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use crate::trace::model::NodeId;
use thiserror::Error;

/// Errors produced while decoding a raw frame
///
/// `codec::decode` never surfaces these; it degrades the frame instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Protocol error: session id not found")]
    MissingSessionId,

    #[error("Protocol error: frame too short ({0} chars)")]
    Truncated(usize),

    #[error("Protocol error: separator found inside the control prefix")]
    MissingBody,
}

/// Errors raised when a frame cannot be put on the wire
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Session id must not be empty")]
    EmptySessionId,

    #[error("Session id contains the frame separator: {0:?}")]
    SessionIdContainsSeparator(String),
}

/// No type of the requested name could be loaded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Class not found: {0}")]
pub struct ClassNotFoundError(pub String);

/// Misuse of the trace tree construction primitives
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    #[error("No call is currently open")]
    NoOpenCall,

    #[error("Unbalanced close: expected node {expected}, found node {found}")]
    UnbalancedClose { expected: NodeId, found: NodeId },

    #[error("Unknown trace node: {0}")]
    UnknownNode(NodeId),
}

/// Errors that abort a single render call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Unsupported trace node type '{kind}' at node {node}")]
    UnsupportedNodeType { node: NodeId, kind: &'static str },

    #[error("Trace node {0} does not exist")]
    DanglingNode(NodeId),

    #[error("Trace node {0} is reachable more than once")]
    Cycle(NodeId),

    #[error("Trace tree has no nodes")]
    EmptyTree,
}

/// Errors from the session multiplexer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MuxError {
    #[error("Session already completed: {0}")]
    SessionClosed(String),
}

/// Errors from the transport collaborator
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported scheme '{0}': only ws and wss are supported")]
    UnsupportedScheme(String),

    #[error("Connection is not open")]
    NotOpen,

    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// Errors that can occur while parsing trace event bodies
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid trace format: {0}")]
    InvalidFormat(String),
}

/// Errors surfaced by the session client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error(transparent)]
    Mux(#[from] MuxError),

    #[error("Timed out waiting for session {0}")]
    Timeout(String),

    #[error("Session {0} was cancelled")]
    Cancelled(String),

    #[error("Command failed in session {0}: {1}")]
    CommandFailed(String, String),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
