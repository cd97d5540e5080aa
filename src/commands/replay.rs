//! Replay command implementation.
//!
//! The replay command:
//! 1. Loads raw frames from a file
//! 2. Pushes them through a replay connection into the session multiplexer
//! 3. Collects the selected session into a trace tree
//! 4. Renders the tree
//! 5. Writes output files

use super::models::ReplayArgs;
use crate::output::{write_text, write_trace, TraceDocument};
use crate::protocol::try_decode;
use crate::render::TraceRenderer;
use crate::session::Client;
use crate::transport::{Connection, MessageHandler};
use crate::utils::error::TransportError;
use anyhow::{Context, Result};
use colored::*;
use log::{debug, info};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// A connection whose inbound side is a recorded list of raw frames
pub struct ReplayConnection {
    frames: Vec<String>,
    handler: Mutex<Option<MessageHandler>>,
    sent: Mutex<Vec<String>>,
    open: AtomicBool,
}

impl ReplayConnection {
    pub fn new(frames: Vec<String>) -> Self {
        Self {
            frames,
            handler: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
        }
    }

    /// Load frames from a file, skipping blank lines and `#` comments
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read frames from {}", path.display()))?;
        let frames = content
            .lines()
            .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        Ok(Self::new(frames))
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// Deliver every recorded frame to the installed handler, in order
    ///
    /// Returns the number of frames delivered (0 without a handler).
    pub fn replay(&self) -> usize {
        let handler = self.handler.lock();
        let Some(handler) = handler.as_ref() else {
            return 0;
        };
        for frame in &self.frames {
            handler(frame.clone());
        }
        self.frames.len()
    }

    /// Frames written through `send`
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

impl Connection for ReplayConnection {
    fn send(&self, text: &str) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        self.sent.lock().push(text.to_string());
        Ok(())
    }

    fn on_message(&self, handler: MessageHandler) {
        *self.handler.lock() = Some(handler);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

/// Execute the replay command
///
/// **Public** - main entry point called from main.rs
///
/// # Returns
/// The rendered trace
///
/// # Errors
/// * Unreadable input file or no session id in it
/// * Session failures (timeout, failed COMMAND_END, malformed trace events)
/// * Render or file write errors
pub fn execute_replay(args: ReplayArgs) -> Result<String> {
    let start_time = Instant::now();
    info!("Replaying frames from: {}", args.input.display());

    // Step 1: Load frames
    info!("Step 1/4: Loading frames...");
    let conn = ReplayConnection::from_file(&args.input)?;
    let session_id = match args.session_id.clone() {
        Some(id) => id,
        None => first_session_id(conn.frames())
            .context("No frame with a session id found in input")?,
    };
    debug!("Loaded {} frame(s), collecting session {}", conn.frames().len(), session_id);

    // Step 2: Route frames through the multiplexer
    info!("Step 2/4: Routing frames for session {}...", session_id);
    let client = Client::new(conn, args.multiplexer.clone()).with_frame_timeout(args.frame_timeout);
    client.multiplexer().register(&session_id);
    let delivered = client.connection().replay();
    debug!("Delivered {} frame(s)", delivered);

    // Step 3: Collect and render
    info!("Step 3/4: Collecting trace...");
    let tree = client
        .collect_trace(&session_id)
        .with_context(|| format!("Failed to collect trace for session {}", session_id))?;
    client.close();

    let others = client.multiplexer().session_count();
    if others > 0 {
        info!("{} other session(s) left unconsumed in input", others);
    }

    let rendered = TraceRenderer::new(args.render.clone())
        .render(&tree)
        .context("Failed to render trace")?;

    // Step 4: Write outputs
    info!("Step 4/4: Writing output files...");
    if let Some(json_path) = &args.output_json {
        write_trace(&TraceDocument::new(session_id.clone(), tree.clone()), json_path)
            .context("Failed to write trace JSON")?;
        info!("✓ Trace written to: {}", json_path.display());
    }
    if let Some(text_path) = &args.output_text {
        write_text(&rendered, text_path).context("Failed to write rendered trace")?;
        info!("✓ Rendered trace written to: {}", text_path.display());
    }

    if args.print {
        println!("{} {}", "Session".bold(), session_id.cyan());
        print!("{}", rendered);
        println!(
            "{} {} node(s), {} method(s)",
            "✓".green(),
            tree.len(),
            tree.method_count()
        );
    }

    info!("Replay completed in {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(rendered)
}

/// Session id of the first frame that decodes cleanly
pub fn first_session_id(frames: &[String]) -> Option<String> {
    frames
        .iter()
        .filter_map(|raw| try_decode(raw).ok())
        .map(|frame| frame.session_id)
        .next()
}

/// Validate replay arguments
///
/// **Public** - can be called before execute_replay for early validation
pub fn validate_args(args: &ReplayArgs) -> Result<()> {
    if !args.input.is_file() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    if let Some(session) = &args.session_id {
        if session.is_empty() || session.contains(char::is_whitespace) {
            anyhow::bail!("Session id must be non-empty and contain no whitespace");
        }
    }

    if args.frame_timeout.is_zero() {
        anyhow::bail!("Frame timeout must be greater than 0");
    }

    if args.multiplexer.speculative_capacity == 0 {
        anyhow::bail!("Speculative capacity must be greater than 0");
    }

    Ok(())
}
