use super::models::RenderArgs;
use crate::output::{read_trace, write_text};
use crate::protocol::{decode, encode, try_decode, Frame, ResponseType};
use crate::render::TraceRenderer;
use crate::utils::config::{PROTOCOL_ERROR_BODY, TRACE_SCHEMA_VERSION};
use anyhow::{Context, Result};
use colored::*;

/// Render a saved trace document
///
/// Returns the rendered text.
pub fn render_trace_file(args: &RenderArgs) -> Result<String> {
    let document = read_trace(&args.input)
        .with_context(|| format!("Failed to read trace {}", args.input.display()))?;

    let rendered = TraceRenderer::new(args.render.clone())
        .render(&document.tree)
        .with_context(|| format!("Trace {} is malformed", args.input.display()))?;

    if let Some(text_path) = &args.output_text {
        write_text(&rendered, text_path).context("Failed to write rendered trace")?;
    }

    println!(
        "{} {} ({})",
        "Session".bold(),
        document.session_id.cyan(),
        document.generated_at
    );
    print!("{}", rendered);
    Ok(rendered)
}

/// Decode one raw frame and print its fields
///
/// A frame that cannot be decoded is reported the way the multiplexer sees
/// it, as a failed frame with an empty session id.
pub fn decode_frame(raw: &str) -> Frame {
    match try_decode(raw) {
        Ok(frame) => {
            println!("{} Valid frame", "✓".green());
            print_frame(&frame);
            frame
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            let frame = decode(raw);
            print_frame(&frame);
            frame
        }
    }
}

fn print_frame(frame: &Frame) {
    println!("  Type:    {:?} ('{}')", frame.response_type, frame.response_type.tag());
    println!("  Success: {}", frame.success);
    if frame.body == PROTOCOL_ERROR_BODY && frame.session_id.is_empty() {
        println!("  Body:    {}", frame.body.yellow());
    } else {
        println!("  Body:    {}", frame.body);
    }
    println!("  Session: {}", frame.session_id);
}

/// Encode a frame from its parts and print the wire form
pub fn encode_frame(
    response_type: ResponseType,
    success: bool,
    body: &str,
    session_id: &str,
) -> Result<String> {
    let raw = encode(&Frame::new(response_type, success, body, session_id))
        .context("Failed to encode frame")?;
    println!("{}", raw);
    Ok(raw)
}

/// Display version information
pub fn display_version() {
    println!("Diag Trace v{}", env!("CARGO_PKG_VERSION"));
    println!("Trace Schema: v{}", TRACE_SCHEMA_VERSION);
    println!();
    println!("Session-multiplexed diagnostics protocol and call-trace renderer.");
}
