//! Trace event records carried in JSON_RESULT bodies.
//!
//! A body holds either a single event object or an array of them, each
//! tagged by `"type"`. The collector replays them onto a [`TraceBuilder`].

use super::builder::TraceBuilder;
use super::model::{unknown_line, CallSite, ThreadNode, TraceTree};
use crate::utils::error::{ClientError, ParseError, TraceError};
use chrono::NaiveDateTime;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// One method-entry/exit/exception record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    /// Thread context; starts a new trace
    Thread(ThreadNode),

    Enter {
        class_name: String,
        method_name: String,
        #[serde(default = "unknown_line")]
        line_number: i32,
    },

    Exit {
        /// Elapsed nanoseconds
        cost: u64,
        #[serde(default)]
        throws: bool,
    },

    Throw {
        exception: String,
        #[serde(default)]
        message: String,
        #[serde(default = "unknown_line")]
        line_number: i32,
    },

    Mark {
        mark: String,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EventBody {
    Many(Vec<TraceEvent>),
    One(TraceEvent),
}

/// Parse a JSON_RESULT body into trace events
///
/// # Errors
/// * `ParseError::JsonError` - the body is not a valid event or event array
pub fn parse_events(body: &str) -> Result<Vec<TraceEvent>, ParseError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    // Decode through Value first so the error names the real problem
    let value: serde_json::Value = serde_json::from_str(trimmed)?;
    if !value.is_object() && !value.is_array() {
        return Err(ParseError::InvalidFormat(format!(
            "Trace body must be a JSON object or array, found {}",
            value
        )));
    }

    match serde_json::from_value::<EventBody>(value)? {
        EventBody::Many(events) => Ok(events),
        EventBody::One(event) => Ok(vec![event]),
    }
}

/// Applies a stream of events to one trace tree
#[derive(Default)]
pub struct TraceCollector {
    builder: Option<TraceBuilder>,
    events: usize,
}

impl TraceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events applied so far
    pub fn events(&self) -> usize {
        self.events
    }

    pub fn apply(&mut self, event: TraceEvent) -> Result<(), TraceError> {
        self.events += 1;

        match event {
            TraceEvent::Thread(thread) => {
                if self.builder.is_some() {
                    warn!("Thread event replaces a trace already in progress");
                }
                self.builder = Some(TraceBuilder::new(thread));
            }
            TraceEvent::Enter {
                class_name,
                method_name,
                line_number,
            } => {
                self.builder()
                    .open_call(CallSite::new(class_name, method_name, line_number));
            }
            TraceEvent::Exit { cost, throws } => {
                self.builder().close_current(cost, throws)?;
            }
            TraceEvent::Throw {
                exception,
                message,
                line_number,
            } => {
                self.builder().record_throw(exception, message, line_number);
            }
            TraceEvent::Mark { mark } => self.builder().mark_current(mark),
        }
        Ok(())
    }

    /// Builder for the trace in progress, started on a placeholder thread if needed
    fn builder(&mut self) -> &mut TraceBuilder {
        self.builder.get_or_insert_with(|| {
            warn!("Trace event received before thread context, using a placeholder thread");
            TraceBuilder::new(placeholder_thread())
        })
    }

    /// Parse a JSON_RESULT body and apply every event in it
    pub fn feed(&mut self, body: &str) -> Result<usize, ClientError> {
        let events = parse_events(body)?;
        let count = events.len();
        for event in events {
            self.apply(event)?;
        }
        debug!("Applied {} trace event(s)", count);
        Ok(count)
    }

    /// Seal the collected trace; `None` if no event was ever applied
    pub fn finish(self) -> Option<TraceTree> {
        self.builder.map(TraceBuilder::finish)
    }
}

fn placeholder_thread() -> ThreadNode {
    ThreadNode::new(NaiveDateTime::default(), "unknown", 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::model::NodeKind;

    const THREAD: &str = r#"{"type":"thread","timestamp":"2020-04-29T10:34:00",
        "thread_name":"main","thread_id":1,"daemon":false,"priority":5,"classloader":"app"}"#;

    #[test]
    fn test_parse_single_event() {
        let events = parse_events(r#"{"type":"exit","cost":12}"#).unwrap();
        assert_eq!(events, vec![TraceEvent::Exit { cost: 12, throws: false }]);
    }

    #[test]
    fn test_parse_event_array_defaults_line() {
        let events = parse_events(
            r#"[{"type":"enter","class_name":"Foo","method_name":"bar"},{"type":"exit","cost":1}]"#,
        )
        .unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            TraceEvent::Enter { line_number: -1, .. }
        ));
    }

    #[test]
    fn test_parse_rejects_scalars_and_garbage() {
        assert!(matches!(parse_events("42"), Err(ParseError::InvalidFormat(_))));
        assert!(matches!(parse_events("{oops"), Err(ParseError::JsonError(_))));
        assert!(parse_events(r#"{"type":"warp"}"#).is_err());
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(parse_events("  ").unwrap().is_empty());
    }

    #[test]
    fn test_collector_builds_tree() {
        let mut collector = TraceCollector::new();
        collector.feed(THREAD).unwrap();
        collector
            .feed(r#"[{"type":"enter","class_name":"Svc","method_name":"run","line_number":3},
                     {"type":"enter","class_name":"Dao","method_name":"get","line_number":9},
                     {"type":"throw","exception":"java.io.IOException","message":"eof",
                      "line_number":9},
                     {"type":"exit","cost":50,"throws":true},
                     {"type":"exit","cost":80}]"#)
            .unwrap();
        assert_eq!(collector.events(), 6);

        let tree = collector.finish().unwrap();
        assert_eq!(tree.thread().unwrap().thread_name, "main");
        assert_eq!(tree.len(), 4);
        let dao = tree.get(crate::trace::model::NodeId(2)).unwrap();
        assert_eq!(dao.marks, 1);
        assert!(matches!(
            tree.get(dao.children[0]).unwrap().kind,
            NodeKind::Throw(_)
        ));
    }

    #[test]
    fn test_collector_without_thread_uses_placeholder() {
        let mut collector = TraceCollector::new();
        collector
            .feed(r#"[{"type":"enter","class_name":"A","method_name":"a"},
                     {"type":"exit","cost":1}]"#)
            .unwrap();
        let tree = collector.finish().unwrap();
        assert_eq!(tree.thread().unwrap().thread_name, "unknown");
    }

    #[test]
    fn test_thread_event_replaces_placeholder_trace() {
        let mut collector = TraceCollector::new();
        collector.feed(r#"{"type":"mark","mark":"early"}"#).unwrap();
        collector.feed(THREAD).unwrap();
        collector
            .feed(r#"[{"type":"enter","class_name":"A","method_name":"a"},
                     {"type":"exit","cost":1}]"#)
            .unwrap();

        let tree = collector.finish().unwrap();
        assert_eq!(tree.thread().unwrap().thread_name, "main");
        assert_eq!(tree.len(), 2);
        assert!(tree.get(tree.root()).unwrap().mark.is_none());
    }

    #[test]
    fn test_collector_unbalanced_exit() {
        let mut collector = TraceCollector::new();
        collector.feed(THREAD).unwrap();
        assert!(collector.feed(r#"{"type":"exit","cost":1}"#).is_err());
    }

    #[test]
    fn test_empty_collector_finishes_to_none() {
        assert!(TraceCollector::new().finish().is_none());
    }
}
