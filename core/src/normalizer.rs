//! Turns raw browser signals into timestamped [`RecordedEvent`]s.

use domtrace_protocol::AttributeModifiedData;
use domtrace_protocol::CharacterDataModifiedData;
use domtrace_protocol::ClickData;
use domtrace_protocol::ConsoleLogData;
use domtrace_protocol::DocumentUpdatedData;
use domtrace_protocol::EventPayload;
use domtrace_protocol::JsErrorData;
use domtrace_protocol::RecordedEvent;
use domtrace_protocol::SetChildNodesData;
use domtrace_protocol::SourceLocation;
use tracing::debug;

use crate::error::RecorderError;
use crate::error::Result;
use crate::time::now_timestamp;

/// A raw signal delivered by the browser driver.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureSignal {
    Console {
        level: String,
        /// Per-argument renderings; empty when they could not be extracted.
        args: Vec<String>,
        /// Whole-message text used when `args` is empty.
        text: Option<String>,
        url: Option<String>,
        line_number: Option<i64>,
    },
    Error {
        message: String,
        stack: Option<String>,
    },
    DocumentUpdated,
    SetChildNodes(SetChildNodesData),
    AttributeModified {
        node_id: Option<i64>,
        name: String,
        value: Option<String>,
    },
    CharacterDataModified(CharacterDataModifiedData),
    /// JSON posted through the click binding.
    ClickBinding(String),
}

/// Owns one session's event buffer and enforces the per-session cap.
#[derive(Debug)]
pub struct EventNormalizer {
    max_events: usize,
    events: Vec<RecordedEvent>,
    last_timestamp: Option<String>,
}

impl EventNormalizer {
    pub fn new(max_events: usize) -> Self {
        Self {
            max_events,
            events: Vec::new(),
            last_timestamp: None,
        }
    }

    /// Appends the event for `signal`. Returns `Ok(false)` when the signal
    /// carried nothing recordable (a malformed click payload) and a
    /// [`RecorderError::ResourceLimit`] once the buffer is full.
    pub fn ingest(&mut self, signal: CaptureSignal) -> Result<bool> {
        if self.events.len() >= self.max_events {
            return Err(RecorderError::ResourceLimit(format!(
                "event limit reached: {}",
                self.max_events
            )));
        }
        let Some(payload) = payload_for(signal) else {
            return Ok(false);
        };
        let timestamp = self.next_timestamp();
        self.events.push(RecordedEvent::new(timestamp, payload));
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<RecordedEvent> {
        self.events
    }

    /// Wall-clock time, clamped so timestamps never go backwards within a
    /// session.
    fn next_timestamp(&mut self) -> String {
        let now = now_timestamp();
        let timestamp = match self.last_timestamp.take() {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(timestamp.clone());
        timestamp
    }
}

fn payload_for(signal: CaptureSignal) -> Option<EventPayload> {
    let payload = match signal {
        CaptureSignal::Console {
            level,
            args,
            text,
            url,
            line_number,
        } => {
            let args = match (args.is_empty(), text) {
                (true, Some(text)) => vec![text],
                (_, _) => args,
            };
            EventPayload::ConsoleLog(ConsoleLogData {
                level,
                args,
                location: SourceLocation { url, line_number },
            })
        }
        CaptureSignal::Error { message, stack } => {
            EventPayload::JsError(JsErrorData { message, stack })
        }
        CaptureSignal::DocumentUpdated => EventPayload::DocumentUpdated(DocumentUpdatedData {}),
        CaptureSignal::SetChildNodes(data) => EventPayload::DomSetChildNodes(data),
        CaptureSignal::AttributeModified {
            node_id,
            name,
            value,
        } => EventPayload::DomAttributeModified(AttributeModifiedData {
            node_id,
            name,
            value,
            masked: false,
        }),
        CaptureSignal::CharacterDataModified(data) => EventPayload::DomCharacterDataModified(data),
        CaptureSignal::ClickBinding(json) => match serde_json::from_str::<ClickData>(&json) {
            Ok(click) => EventPayload::Click(Box::new(click)),
            Err(err) => {
                debug!("dropping malformed click payload: {err}");
                return None;
            }
        },
    };
    Some(payload)
}
