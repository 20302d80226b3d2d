#![allow(clippy::unwrap_used, clippy::expect_used)]

use domtrace_core::RecorderError;
use domtrace_core::SessionStore;
use domtrace_core::store::METADATA_ONLY_MESSAGE;
use domtrace_core::store::SessionRecord;
use domtrace_protocol::DocumentUpdatedData;
use domtrace_protocol::EventPayload;
use domtrace_protocol::EventQuery;
use domtrace_protocol::EventType;
use domtrace_protocol::JsErrorData;
use domtrace_protocol::RecordedEvent;
use domtrace_protocol::RecordingId;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

fn error_at(ts: &str, message: &str) -> RecordedEvent {
    RecordedEvent::new(
        ts,
        EventPayload::JsError(JsErrorData {
            message: message.to_string(),
            stack: Some("at main.js:1".to_string()),
        }),
    )
}

fn updated_at(ts: &str) -> RecordedEvent {
    RecordedEvent::new(ts, EventPayload::DocumentUpdated(DocumentUpdatedData {}))
}

fn record(session_id: RecordingId, start: &str, events: Vec<RecordedEvent>) -> SessionRecord {
    SessionRecord {
        session_id: session_id.to_string(),
        url: Some("https://example.com".to_string()),
        start_time: Some(start.to_string()),
        end_time: Some("2025-01-01T00:10:00.000000Z".to_string()),
        events,
    }
}

fn sample_events() -> Vec<RecordedEvent> {
    vec![
        updated_at("2025-01-01T00:00:01.000000Z"),
        error_at("2025-01-01T00:00:02.000000Z", "a"),
        error_at("2025-01-01T00:00:03.000000Z", "b"),
        updated_at("2025-01-01T00:00:04.000000Z"),
        error_at("2025-01-01T00:00:05.000000Z", "c"),
    ]
}

#[test]
fn save_then_load_round_trips_events() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path());
    let id = RecordingId::new();
    let events = sample_events();

    let path = store.save(&record(id, "2025-01-01T00:00:00.000000Z", events.clone())).unwrap();
    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with(&format!("{id}_")), "{name}");
    assert!(name.ends_with(".json"));

    let document = store.load(&id.to_string()).unwrap().unwrap();
    assert_eq!(document.session_id, id);
    assert_eq!(document.events, events);
    assert_eq!(document.metadata.event_count, 5);
    assert_eq!(document.url.as_deref(), Some("https://example.com"));
}

#[test]
fn saved_file_is_pretty_printed_with_expected_keys() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path());
    let id = RecordingId::new();
    let path = store.save(&record(id, "s", sample_events())).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\n  \"session_id\""));
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec!["end_time", "events", "metadata", "session_id", "start_time", "url"]
    );
    assert_eq!(value["metadata"]["event_count"], json!(5));
    assert!(value["metadata"]["saved_at"].is_string());
}

#[test]
fn missing_recording_loads_as_none() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path());
    let id = RecordingId::new().to_string();
    assert_eq!(store.load(&id).unwrap(), None);
    assert_eq!(store.load_filtered(&id, &EventQuery::default(), true).unwrap(), None);
    assert!(!store.delete(&id).unwrap());
}

#[test]
fn repeated_saves_never_collide_and_load_returns_newest() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path());
    let id = RecordingId::new();

    let first = store.save(&record(id, "s", vec![updated_at("t1")])).unwrap();
    let second = store
        .save(&record(id, "s", vec![updated_at("t1"), updated_at("t2")]))
        .unwrap();
    assert_ne!(first, second);
    assert!(first.exists() && second.exists());

    let newest = store.load(&id.to_string()).unwrap().unwrap();
    assert_eq!(newest.events.len(), 2);

    assert!(store.delete(&id.to_string()).unwrap());
    assert!(!first.exists() && !second.exists());
    assert_eq!(store.load(&id.to_string()).unwrap(), None);
}

#[test]
fn metadata_only_view_has_no_events_key() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path());
    let id = RecordingId::new();
    store.save(&record(id, "s", sample_events())).unwrap();

    let filtered = store
        .load_filtered(&id.to_string(), &EventQuery::default(), false)
        .unwrap()
        .unwrap();
    let value = serde_json::to_value(&filtered).unwrap();
    assert!(value.get("events").is_none());
    assert!(value.get("returned_events").is_none());
    assert!(value.get("filters_applied").is_none());
    assert_eq!(value["message"], json!(METADATA_ONLY_MESSAGE));
    assert_eq!(value["total_events"], json!(5));
    assert_eq!(
        value["event_type_counts"],
        json!({"document_updated": 2, "js_error": 3})
    );
}

#[test]
fn filtered_view_reports_totals_and_applied_filters() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path());
    let id = RecordingId::new();
    store.save(&record(id, "s", sample_events())).unwrap();

    let query = EventQuery {
        event_types: Some(vec![EventType::JsError]),
        from_timestamp: Some("2025-01-01T00:00:02.500000Z".to_string()),
        limit: Some(1),
        ..Default::default()
    };
    let filtered = store.load_filtered(&id.to_string(), &query, true).unwrap().unwrap();
    assert_eq!(filtered.total_events, 5);
    assert_eq!(filtered.returned_events, Some(1));
    let events = filtered.events.as_ref().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].timestamp, "2025-01-01T00:00:03.000000Z");
    assert_eq!(filtered.event_type_counts.get("js_error"), Some(&3));
    assert_eq!(filtered.message, None);

    let applied = serde_json::to_value(filtered.filters_applied.unwrap()).unwrap();
    assert_eq!(
        applied,
        json!({
            "event_types": ["js_error"],
            "limit": 1,
            "from_timestamp": "2025-01-01T00:00:02.500000Z",
        })
    );
}

#[test]
fn unfiltered_view_returns_everything() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path());
    let id = RecordingId::new();
    store.save(&record(id, "s", sample_events())).unwrap();

    let filtered = store
        .load_filtered(&id.to_string(), &EventQuery::default(), true)
        .unwrap()
        .unwrap();
    assert_eq!(filtered.returned_events, Some(5));
    assert_eq!(filtered.events.unwrap(), sample_events());
    let applied = serde_json::to_value(filtered.filters_applied.unwrap()).unwrap();
    assert_eq!(applied, json!({}));
}

#[test]
fn oversized_recording_is_refused_without_writing() {
    let dir = TempDir::new().unwrap();
    let recordings = dir.path().join("recordings");
    let store = SessionStore::new(&recordings).with_limits(256, 1024);
    let events: Vec<RecordedEvent> = (0..20)
        .map(|i| error_at("2025-01-01T00:00:00.000000Z", &format!("error number {i}")))
        .collect();

    let err = store.save(&record(RecordingId::new(), "s", events)).unwrap_err();
    assert!(matches!(err, RecorderError::ResourceLimit(_)));
    assert!(!recordings.exists());
}

#[test]
fn list_sorts_newest_first_and_skips_bad_files() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path()).with_limits(1024 * 1024, 4 * 1024);

    let older = RecordingId::new();
    let newer = RecordingId::new();
    let undated = RecordingId::new();
    store
        .save(&record(older, "2025-01-01T00:00:00.000000Z", vec![updated_at("t")]))
        .unwrap();
    store
        .save(&record(newer, "2025-06-01T00:00:00.000000Z", sample_events()))
        .unwrap();
    let mut no_start = record(undated, "", Vec::new());
    no_start.start_time = None;
    store.save(&no_start).unwrap();

    std::fs::write(dir.path().join("garbage.json"), "{ not json").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
    let huge = RecordingId::new();
    let big_events: Vec<RecordedEvent> = (0..200)
        .map(|i| error_at("2030-01-01T00:00:00.000000Z", &format!("{i:0>64}")))
        .collect();
    store
        .save(&record(huge, "2030-01-01T00:00:00.000000Z", big_events))
        .unwrap();

    let listed = store.list().unwrap();
    let ids: Vec<String> = listed.iter().map(|entry| entry.session_id.clone()).collect();
    assert_eq!(ids, vec![newer.to_string(), older.to_string(), undated.to_string()]);
    assert_eq!(listed[0].event_count, 5);
    assert_eq!(listed[1].event_count, 1);
    assert!(listed.iter().all(|entry| entry.filepath.starts_with(dir.path())));
}

#[test]
fn listing_a_missing_directory_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path().join("never-created"));
    assert!(store.list().unwrap().is_empty());
}
