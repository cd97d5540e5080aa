//! Session client: one connection, many concurrent sessions.
//!
//! The connection's inbound handler feeds every raw message into the
//! multiplexer; callers pull frames for their own session id.

use super::multiplexer::{Multiplexer, MultiplexerConfig, NextFrame};
use crate::protocol::{encode, Frame, ResponseType};
use crate::trace::{TraceCollector, TraceTree};
use crate::transport::Connection;
use crate::utils::config::DEFAULT_FRAME_TIMEOUT;
use crate::utils::error::{ClientError, TransportError};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

pub struct Client<C: Connection> {
    conn: C,
    mux: Arc<Multiplexer>,
    frame_timeout: Duration,
}

impl<C: Connection> Client<C> {
    /// Wrap an open connection and start routing its inbound messages
    pub fn new(conn: C, config: MultiplexerConfig) -> Self {
        let mux = Arc::new(Multiplexer::new(config));
        let inbound = Arc::clone(&mux);
        conn.on_message(Box::new(move |text| {
            inbound.submit(&text);
        }));

        Self {
            conn,
            mux,
            frame_timeout: DEFAULT_FRAME_TIMEOUT,
        }
    }

    /// How long `collect_trace` waits for any single frame
    pub fn with_frame_timeout(mut self, timeout: Duration) -> Self {
        self.frame_timeout = timeout;
        self
    }

    pub fn multiplexer(&self) -> &Multiplexer {
        &self.mux
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Encode `frame` and write it to the connection
    ///
    /// Nothing is written if encoding fails.
    pub fn send_frame(&self, frame: &Frame) -> Result<(), ClientError> {
        let raw = encode(frame)?;
        if !self.conn.is_open() {
            return Err(TransportError::NotOpen.into());
        }
        self.conn.send(&raw)?;
        debug!("Sent {:?} frame for session {}", frame.response_type, frame.session_id);
        Ok(())
    }

    /// Drain a session until COMMAND_END and build its trace tree
    ///
    /// JSON_RESULT bodies are parsed as trace events. Console output is
    /// logged. The session is cancelled if a frame does not arrive in time.
    ///
    /// # Errors
    /// * `ClientError::Timeout` - no frame within the frame timeout
    /// * `ClientError::CommandFailed` - COMMAND_END reported failure, or no trace events arrived
    /// * `ClientError::Parse` / `ClientError::Trace` - malformed trace events
    pub fn collect_trace(&self, session_id: &str) -> Result<TraceTree, ClientError> {
        info!("Collecting trace for session {}", session_id);
        self.mux.register(session_id);

        let mut collector = TraceCollector::new();
        loop {
            let frame = match self.mux.next_frame(session_id, self.frame_timeout)? {
                NextFrame::Frame(frame) => frame,
                NextFrame::Timeout => {
                    self.mux.cancel(session_id);
                    return Err(ClientError::Timeout(session_id.to_string()));
                }
                NextFrame::Cancelled => return Err(ClientError::Cancelled(session_id.to_string())),
            };

            match frame.response_type {
                ResponseType::JsonResult if frame.success => {
                    collector.feed(&frame.body)?;
                }
                ResponseType::JsonResult => {
                    warn!("Session {} reported a failed result: {}", session_id, frame.body);
                }
                ResponseType::Console => debug!("[{}] {}", session_id, frame.body),
                ResponseType::Ack | ResponseType::Online => {
                    debug!("Session {} received {:?}", session_id, frame.response_type)
                }
                ResponseType::Unknown => {
                    warn!("Session {} received an unrecognised frame: {}", session_id, frame.body)
                }
                ResponseType::CommandEnd => {
                    if !frame.success {
                        return Err(ClientError::CommandFailed(
                            session_id.to_string(),
                            frame.body,
                        ));
                    }
                    break;
                }
            }
        }

        info!(
            "Session {} completed after {} trace event(s)",
            session_id,
            collector.events()
        );
        collector.finish().ok_or_else(|| {
            ClientError::CommandFailed(
                session_id.to_string(),
                "no trace events received".to_string(),
            )
        })
    }

    pub fn close(&self) {
        self.conn.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MessageHandler;
    use parking_lot::Mutex;

    /// Loops every sent frame straight back to the inbound handler
    #[derive(Default)]
    struct LoopbackConnection {
        handler: Mutex<Option<MessageHandler>>,
        sent: Mutex<Vec<String>>,
    }

    impl Connection for LoopbackConnection {
        fn send(&self, text: &str) -> Result<(), TransportError> {
            self.sent.lock().push(text.to_string());
            if let Some(handler) = self.handler.lock().as_ref() {
                handler(text.to_string());
            }
            Ok(())
        }
        fn on_message(&self, handler: MessageHandler) {
            *self.handler.lock() = Some(handler);
        }
        fn is_open(&self) -> bool {
            true
        }
        fn close(&self) {}
    }

    fn client() -> Client<LoopbackConnection> {
        Client::new(LoopbackConnection::default(), MultiplexerConfig::default())
            .with_frame_timeout(Duration::from_millis(50))
    }

    #[test]
    fn test_invalid_frame_is_never_written() {
        let client = client();
        let result = client.send_frame(&Frame::console("x", ""));
        assert!(matches!(result, Err(ClientError::Encoding(_))));
        assert!(client.connection().sent.lock().is_empty());
    }

    #[test]
    fn test_collect_trace_until_command_end() {
        let client = client();
        let thread = concat!(
            r#"{"type":"thread","timestamp":"2020-04-29T10:34:00","#,
            r#""thread_name":"main","thread_id":1}"#
        );
        client.send_frame(&Frame::new(ResponseType::Ack, true, "", "s1")).unwrap();
        client.send_frame(&Frame::json_result(thread, "s1")).unwrap();
        client
            .send_frame(&Frame::json_result(
                r#"[{"type":"enter","class_name":"A","method_name":"a"},{"type":"exit","cost":5}]"#,
                "s1",
            ))
            .unwrap();
        client.send_frame(&Frame::console("done", "s1")).unwrap();
        client.send_frame(&Frame::command_end(true, "s1")).unwrap();

        let tree = client.collect_trace("s1").unwrap();
        assert_eq!(tree.len(), 2);
        assert!(client.multiplexer().is_complete("s1"));
    }

    #[test]
    fn test_failed_command_end() {
        let client = client();
        client
            .send_frame(&Frame::new(ResponseType::CommandEnd, false, "boom", "s1"))
            .unwrap();
        let err = client.collect_trace("s1").unwrap_err();
        assert!(matches!(
            err,
            ClientError::CommandFailed(ref s, ref msg) if s == "s1" && msg == "boom"
        ));
    }

    #[test]
    fn test_timeout_cancels_session() {
        let client = client();
        client.send_frame(&Frame::console("partial", "s1")).unwrap();
        let err = client.collect_trace("s1").unwrap_err();
        assert!(matches!(err, ClientError::Timeout(_)));
        assert!(!client.multiplexer().is_tracked("s1"));
    }
}
