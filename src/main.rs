//! Diag Trace CLI
//!
//! Replays recorded diagnostics sessions, renders call traces and
//! inspects raw protocol frames.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;
use std::time::Duration;

use diag_trace::commands::{
    decode_frame, display_version, encode_frame, execute_replay, render_trace_file, validate_args,
    RenderArgs, ReplayArgs,
};
use diag_trace::protocol::ResponseType;
use diag_trace::render::{HighlightStyle, RenderOptions};
use diag_trace::session::MultiplexerConfig;
use diag_trace::utils::config::{
    DEFAULT_COMPLETED_HISTORY, DEFAULT_MAX_SPECULATIVE_SESSIONS, DEFAULT_SPECULATIVE_CAPACITY,
};

/// Diag Trace - session protocol and call-trace tooling
#[derive(Parser, Debug)]
#[command(name = "diag-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a file of raw frames and render one session's trace
    Replay {
        /// File with one raw frame per line
        #[arg(short, long)]
        input: PathBuf,

        /// Session id to collect (defaults to the first one in the file)
        #[arg(short, long)]
        session: Option<String>,

        /// Output path for the JSON trace document
        #[arg(long)]
        json: Option<PathBuf>,

        /// Output path for the rendered text
        #[arg(long)]
        text: Option<PathBuf>,

        /// Highlight style for the most expensive call: ansi, html or none
        #[arg(long, default_value = "ansi", env = "DIAG_TRACE_HIGHLIGHT")]
        highlight: HighlightStyle,

        /// Omit cost annotations
        #[arg(long)]
        no_cost: bool,

        /// Seconds to wait for each frame
        #[arg(long, default_value = "30")]
        timeout: u64,

        /// Frames buffered per unregistered session id
        #[arg(long, default_value_t = DEFAULT_SPECULATIVE_CAPACITY)]
        speculative_capacity: usize,

        /// Unregistered session ids buffered at once
        #[arg(long, default_value_t = DEFAULT_MAX_SPECULATIVE_SESSIONS)]
        max_speculative_sessions: usize,

        /// Completed session ids remembered
        #[arg(long, default_value_t = DEFAULT_COMPLETED_HISTORY)]
        completed_history: usize,

        /// Do not print the rendered trace
        #[arg(short, long)]
        quiet: bool,
    },

    /// Render a saved JSON trace document
    Render {
        /// Path to trace JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the rendered text
        #[arg(long)]
        text: Option<PathBuf>,

        /// Highlight style for the most expensive call: ansi, html or none
        #[arg(long, default_value = "ansi", env = "DIAG_TRACE_HIGHLIGHT")]
        highlight: HighlightStyle,

        /// Omit cost annotations
        #[arg(long)]
        no_cost: bool,
    },

    /// Decode a raw frame
    Decode {
        /// Raw frame text
        raw: String,
    },

    /// Encode a frame from its parts
    Encode {
        /// Response type: ack, online, console, json, end
        #[arg(short = 't', long, default_value = "console")]
        response_type: ResponseType,

        /// Mark the frame as failed
        #[arg(long)]
        failed: bool,

        /// Frame body
        #[arg(short, long, default_value = "")]
        body: String,

        /// Session id
        #[arg(short, long)]
        session: String,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Replay {
            input,
            session,
            json,
            text,
            highlight,
            no_cost,
            timeout,
            speculative_capacity,
            max_speculative_sessions,
            completed_history,
            quiet,
        } => {
            let args = ReplayArgs {
                input,
                session_id: session,
                output_json: json,
                output_text: text,
                render: render_options(highlight, no_cost),
                multiplexer: MultiplexerConfig::new()
                    .with_speculative_capacity(speculative_capacity)
                    .with_max_speculative_sessions(max_speculative_sessions)
                    .with_completed_history(completed_history),
                frame_timeout: Duration::from_secs(timeout),
                print: !quiet,
            };

            // Validate args first
            validate_args(&args)?;

            execute_replay(args)?;
        }

        Commands::Render {
            input,
            text,
            highlight,
            no_cost,
        } => {
            let args = RenderArgs {
                input,
                render: render_options(highlight, no_cost),
                output_text: text,
            };
            render_trace_file(&args)?;
        }

        Commands::Decode { raw } => {
            decode_frame(&raw);
        }

        Commands::Encode {
            response_type,
            failed,
            body,
            session,
        } => {
            encode_frame(response_type, !failed, &body, &session)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}

fn render_options(highlight: HighlightStyle, no_cost: bool) -> RenderOptions {
    RenderOptions::new()
        .with_highlight(highlight)
        .with_print_cost(!no_cost)
}
