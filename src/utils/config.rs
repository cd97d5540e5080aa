//! Configuration and constants for the protocol, trace model and CLI.

use std::time::Duration;

// Frame layout: <type><success><reserved><body><separator><session id>
pub const CONTROL_PREFIX_LEN: usize = 3;
pub const SEPARATOR: char = ' ';
pub const SUCCESS_FLAG: char = '1';
pub const FAILURE_FLAG: char = '0';
pub const RESERVED_FLAG: char = '-';

// Response type tags
pub const ACK_TYPE: char = 'A';
pub const ONLINE_TYPE: char = 'O';
pub const CONSOLE_TYPE: char = 'C';
pub const JSON_RESULT_TYPE: char = 'J';
pub const CMD_END_TYPE: char = 'E';
pub const UNKNOWN_TYPE: char = '-';

/// Body of a frame whose session id could not be recovered
pub const PROTOCOL_ERROR_BODY: &str = "Protocol error, session id not found";

/// Line number sentinel for "unknown"
pub const UNKNOWN_LINE: i32 = -1;

pub const TIME_UNIT: &str = "ms";
pub const NANOS_PER_MILLI: f64 = 1_000_000.0;
pub const THREAD_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const THROWS_MARK: &str = "throws Exception";

// Tree drawing
pub const STEP_FIRST_CHAR: &str = "`---";
pub const STEP_NORMAL_CHAR: &str = "+---";
pub const STEP_HAS_BOARD: &str = "|   ";
pub const STEP_EMPTY_BOARD: &str = "    ";

/// Fallback package tried for unqualified class names
pub const JAVA_LANG_PREFIX: &str = "java.lang.";
pub const PACKAGE_SEPARATOR: char = '.';

/// Frames buffered per session id nobody has registered yet
pub const DEFAULT_SPECULATIVE_CAPACITY: usize = 256;

/// Unregistered session ids buffered at once; the oldest is evicted beyond this
pub const DEFAULT_MAX_SPECULATIVE_SESSIONS: usize = 1024;

/// Completed session ids remembered for `is_complete`
pub const DEFAULT_COMPLETED_HISTORY: usize = 1024;

/// Default wait for the next frame of a session
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_secs(30);

/// Current trace document schema version
pub const TRACE_SCHEMA_VERSION: &str = "1.0.0";
