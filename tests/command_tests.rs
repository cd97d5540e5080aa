use diag_trace::commands::{
    execute_replay, render_trace_file, validate_args, RenderArgs, ReplayArgs,
};
use diag_trace::output::read_trace;
use diag_trace::render::{HighlightStyle, RenderOptions};
use diag_trace::session::MultiplexerConfig;
use pretty_assertions::assert_eq;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

const FRAMES: &str = r#"# recorded trace session
A1- s1
C1-Press Q or Ctrl+C to abort. s1
C1-unrelated output s2
J1-{"type":"thread","timestamp":"2020-04-29T10:34:00","thread_name":"main","thread_id":1,"classloader":"app"} s1
J1-[{"type":"enter","class_name":"demo.Svc","method_name":"handle","line_number":3},{"type":"enter","class_name":"demo.Dao","method_name":"load","line_number":12},{"type":"exit","cost":200000}] s1
this line is garbage
J1-[{"type":"enter","class_name":"demo.Dao","method_name":"save","line_number":14},{"type":"exit","cost":1500000},{"type":"exit","cost":5000000}] s1
E1- s1
E1- s2
"#;

const EXPECTED: &str = "\
`---ts=2020-04-29 10:34:00;thread_name=main;id=1;is_daemon=false;priority=5;TCCL=app
    `---[5.0ms] demo.Svc:handle() #3
        +---[0.2ms] demo.Dao:load() #12
        `---[1.5ms] demo.Dao:save() #14
";

fn write_frames(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("frames.txt");
    std::fs::write(&path, content).unwrap();
    path
}

fn replay_args(input: &Path) -> ReplayArgs {
    ReplayArgs {
        input: input.to_path_buf(),
        render: RenderOptions::new().with_highlight(HighlightStyle::None),
        frame_timeout: Duration::from_millis(200),
        print: false,
        ..ReplayArgs::default()
    }
}

#[test]
fn test_replay_renders_first_session() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_frames(&dir, FRAMES);
    let args = replay_args(&input);

    validate_args(&args).unwrap();
    assert_eq!(execute_replay(args).unwrap(), EXPECTED);
}

#[test]
fn test_replay_writes_outputs_for_selected_session() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_frames(&dir, FRAMES);
    let json_path = dir.path().join("out/trace.json");
    let text_path = dir.path().join("out/trace.txt");

    let args = ReplayArgs {
        session_id: Some("s1".to_string()),
        output_json: Some(json_path.clone()),
        output_text: Some(text_path.clone()),
        ..replay_args(&input)
    };
    execute_replay(args).unwrap();

    assert_eq!(std::fs::read_to_string(&text_path).unwrap(), EXPECTED);
    let document = read_trace(&json_path).unwrap();
    assert_eq!(document.session_id, "s1");
    assert_eq!(document.tree.method_count(), 3);

    let rendered = render_trace_file(&RenderArgs {
        input: json_path,
        render: RenderOptions::new().with_highlight(HighlightStyle::None),
        output_text: None,
    })
    .unwrap();
    assert_eq!(rendered, EXPECTED);
}

#[test]
fn test_replay_session_without_trace_events_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_frames(&dir, FRAMES);
    let args = ReplayArgs {
        session_id: Some("s2".to_string()),
        ..replay_args(&input)
    };
    assert!(execute_replay(args).is_err());
}

#[test]
fn test_replay_unterminated_session_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_frames(&dir, "C1-still running s9\n");
    let err = execute_replay(replay_args(&input)).unwrap_err();
    assert!(format!("{:#}", err).contains("Timed out"));
}

#[test]
fn test_replay_failed_command_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_frames(&dir, "E0-permission denied s1\n");
    let err = execute_replay(replay_args(&input)).unwrap_err();
    assert!(format!("{:#}", err).contains("permission denied"));
}

#[test]
fn test_validate_args() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_frames(&dir, FRAMES);

    let bad_session = ReplayArgs {
        session_id: Some("has space".to_string()),
        ..replay_args(&input)
    };
    assert!(validate_args(&bad_session).is_err());

    let no_buffer = ReplayArgs {
        multiplexer: MultiplexerConfig::new().with_speculative_capacity(0),
        ..replay_args(&input)
    };
    assert!(validate_args(&no_buffer).is_err());

    let zero_timeout = ReplayArgs {
        frame_timeout: Duration::ZERO,
        ..replay_args(&input)
    };
    assert!(validate_args(&zero_timeout).is_err());
}
