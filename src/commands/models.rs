use crate::render::RenderOptions;
use crate::session::MultiplexerConfig;
use crate::utils::config::DEFAULT_FRAME_TIMEOUT;
use std::path::PathBuf;
use std::time::Duration;

/// Arguments for the replay command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct ReplayArgs {
    /// File of raw frames, one per line
    pub input: PathBuf,

    /// Session to collect (None = first session id in the file)
    pub session_id: Option<String>,

    /// Output path for the JSON trace document (optional)
    pub output_json: Option<PathBuf>,

    /// Output path for the rendered text (optional)
    pub output_text: Option<PathBuf>,

    pub render: RenderOptions,

    pub multiplexer: MultiplexerConfig,

    /// Wait for any single frame before giving up
    pub frame_timeout: Duration,

    /// Print the rendered trace to stdout
    pub print: bool,
}

impl Default for ReplayArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::from("frames.txt"),
            session_id: None,
            output_json: None,
            output_text: None,
            render: RenderOptions::default(),
            multiplexer: MultiplexerConfig::default(),
            frame_timeout: DEFAULT_FRAME_TIMEOUT,
            print: true,
        }
    }
}

/// Arguments for the render command
#[derive(Debug, Clone)]
pub struct RenderArgs {
    /// JSON trace document to render
    pub input: PathBuf,

    pub render: RenderOptions,

    /// Output path for the rendered text (optional)
    pub output_text: Option<PathBuf>,
}
