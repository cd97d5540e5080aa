//! Response frame types.

use crate::utils::config::{
    ACK_TYPE, CMD_END_TYPE, CONSOLE_TYPE, JSON_RESULT_TYPE, ONLINE_TYPE, UNKNOWN_TYPE,
};
use serde::{Deserialize, Serialize};

/// Category of a response frame, carried in the first control character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseType {
    Ack,
    Online,
    Console,
    JsonResult,
    CommandEnd,
    Unknown,
}

impl ResponseType {
    /// Map a wire tag to a response type; unrecognised tags are `Unknown`
    pub fn from_tag(tag: char) -> Self {
        match tag {
            ACK_TYPE => Self::Ack,
            ONLINE_TYPE => Self::Online,
            CONSOLE_TYPE => Self::Console,
            JSON_RESULT_TYPE => Self::JsonResult,
            CMD_END_TYPE => Self::CommandEnd,
            _ => Self::Unknown,
        }
    }

    pub fn tag(self) -> char {
        match self {
            Self::Ack => ACK_TYPE,
            Self::Online => ONLINE_TYPE,
            Self::Console => CONSOLE_TYPE,
            Self::JsonResult => JSON_RESULT_TYPE,
            Self::CommandEnd => CMD_END_TYPE,
            Self::Unknown => UNKNOWN_TYPE,
        }
    }
}

impl std::str::FromStr for ResponseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ack" => Ok(Self::Ack),
            "online" => Ok(Self::Online),
            "console" => Ok(Self::Console),
            "json" | "json_result" => Ok(Self::JsonResult),
            "end" | "command_end" => Ok(Self::CommandEnd),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown response type: {}", other)),
        }
    }
}

/// One protocol message exchanged over the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub response_type: ResponseType,
    pub success: bool,
    pub body: String,
    pub session_id: String,
}

impl Frame {
    pub fn new(
        response_type: ResponseType,
        success: bool,
        body: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            response_type,
            success,
            body: body.into(),
            session_id: session_id.into(),
        }
    }

    /// Successful CONSOLE frame
    pub fn console(body: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self::new(ResponseType::Console, true, body, session_id)
    }

    /// Successful JSON_RESULT frame
    pub fn json_result(body: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self::new(ResponseType::JsonResult, true, body, session_id)
    }

    /// COMMAND_END frame closing a session
    pub fn command_end(success: bool, session_id: impl Into<String>) -> Self {
        Self::new(ResponseType::CommandEnd, success, "", session_id)
    }

    pub fn is_command_end(&self) -> bool {
        self.response_type == ResponseType::CommandEnd
    }
}
