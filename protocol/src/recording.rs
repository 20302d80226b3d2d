use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::FixedOffset;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;

use crate::EventType;
use crate::RecordedEvent;
use crate::RecordingId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub saved_at: String,
    pub event_count: usize,
}

/// The persisted form of one completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingDocument {
    pub session_id: RecordingId,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub events: Vec<RecordedEvent>,
    pub metadata: RecordingMetadata,
}

/// One row of `list_recordings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingListEntry {
    pub session_id: String,
    pub url: Option<String>,
    pub start_time: Option<String>,
    pub event_count: usize,
    pub filepath: PathBuf,
}

/// Filters accepted by `get_recording`. The same struct is echoed back as
/// `filters_applied`, so every unset filter is omitted rather than defaulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_types: Option<Vec<EventType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_timestamp: Option<String>,
}

impl EventQuery {
    /// True when no filter would change the event list.
    pub fn is_empty(&self) -> bool {
        self.event_types.as_ref().is_none_or(Vec::is_empty)
            && self.limit.is_none()
            && self.offset.is_none()
            && self.from_timestamp.is_none()
            && self.to_timestamp.is_none()
    }

    /// Rejects bounds that are not ISO-8601 timestamps.
    pub fn validate(&self) -> Result<(), InvalidTimestamp> {
        for bound in [&self.from_timestamp, &self.to_timestamp].into_iter().flatten() {
            parse_timestamp(bound).ok_or_else(|| InvalidTimestamp(bound.clone()))?;
        }
        Ok(())
    }

    /// Applies the filters in order: type, lower bound, upper bound, offset,
    /// limit. Bounds and event timestamps are compared as instants, so
    /// `...:02Z` and `...:02.000000Z` are the same bound. When a bound is
    /// set, events whose timestamp does not parse are excluded; an
    /// unparseable bound matches nothing (call [`EventQuery::validate`]
    /// first).
    pub fn apply<'a>(&self, events: &'a [RecordedEvent]) -> Vec<&'a RecordedEvent> {
        let types = self.event_types.as_deref().filter(|types| !types.is_empty());
        let from = self.from_timestamp.as_deref().map(parse_timestamp);
        let to = self.to_timestamp.as_deref().map(parse_timestamp);
        events
            .iter()
            .filter(|event| types.is_none_or(|types| types.contains(&event.event_type())))
            .filter(|event| {
                if from.is_none() && to.is_none() {
                    return true;
                }
                let Some(at) = parse_timestamp(&event.timestamp) else {
                    return false;
                };
                from.is_none_or(|from| from.is_some_and(|from| at >= from))
                    && to.is_none_or(|to| to.is_some_and(|to| at <= to))
            })
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// The subset of this query that actually took part in filtering.
    pub fn applied(&self) -> EventQuery {
        EventQuery {
            event_types: self.event_types.clone().filter(|types| !types.is_empty()),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid timestamp: {0} (expected ISO-8601, e.g. 2025-01-01T00:00:00Z)")]
pub struct InvalidTimestamp(pub String);

/// RFC 3339 with any offset, or a bare date-time taken as UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at);
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Response shape of a filtered load. `events` is absent unless the caller
/// asked for events; `message` is only set on metadata-only responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredRecording {
    pub session_id: RecordingId,
    pub url: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub metadata: RecordingMetadata,
    pub event_type_counts: BTreeMap<String, usize>,
    pub total_events: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_events: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters_applied: Option<EventQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<RecordedEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
