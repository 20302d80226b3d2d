#![allow(clippy::unwrap_used, clippy::expect_used)]

use domtrace_core::CaptureSignal;
use domtrace_core::Config;
use domtrace_core::RecorderError;
use domtrace_core::RecorderService;
use domtrace_protocol::AttributeList;
use domtrace_protocol::EventPayload;
use domtrace_protocol::EventQuery;
use domtrace_protocol::NodeSnapshot;
use domtrace_protocol::SetChildNodesData;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use super::support::ScriptedDriver;
use super::support::attribute;
use super::support::console;

fn service(home: &TempDir, driver: &ScriptedDriver) -> RecorderService {
    let mut config = Config::with_home(home.path().to_path_buf());
    config.headless = true;
    RecorderService::new(config, driver.factory())
}

fn pin_field() -> CaptureSignal {
    CaptureSignal::SetChildNodes(SetChildNodesData {
        parent_id: Some(1),
        nodes: vec![NodeSnapshot {
            node_name: "INPUT".to_string(),
            attributes: Some(AttributeList::from_tokens(
                ["name", "pin", "value", "0000"].map(String::from),
            )),
            ..Default::default()
        }],
    })
}

#[tokio::test]
async fn full_lifecycle_through_the_service() {
    let home = TempDir::new().unwrap();
    let driver = ScriptedDriver::new();
    let service = service(&home, &driver);

    let id = service.start_recording(Some("https://example.com"), &[]).await.unwrap();
    assert_eq!(service.active_sessions().await, vec![id]);
    driver.emit(console("ready"));
    driver.emit(attribute("value", "secret text"));
    assert_eq!(service.live_event_count(&id.to_string()).await.unwrap(), Some(2));

    let outcome = service.stop_recording(&id.to_string()).await.unwrap();
    assert_eq!(outcome.event_count, 2);
    assert!(outcome.filepath.starts_with(home.path().join("recordings")));
    assert!(service.active_sessions().await.is_empty());

    let summary = service.analyze_recording(&id.to_string()).unwrap().unwrap();
    assert_eq!(summary.total_events, 2);
    assert_eq!(summary.console_logs, 1);
    assert_eq!(summary.dom_mutations, 1);
    assert_eq!(summary.masked_events, 1);

    let listed = service.list_recordings().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].session_id, id.to_string());

    let metadata = service
        .get_recording(&id.to_string(), &EventQuery::default(), false)
        .unwrap()
        .unwrap();
    assert_eq!(metadata.events, None);
    assert_eq!(metadata.total_events, 2);

    assert!(service.delete_recording(&id.to_string()).unwrap());
    assert!(!service.delete_recording(&id.to_string()).unwrap());
    assert_eq!(service.analyze_recording(&id.to_string()).unwrap(), None);
}

#[tokio::test]
async fn per_session_selectors_only_apply_to_that_session() {
    let home = TempDir::new().unwrap();
    let driver = ScriptedDriver::new();
    let service = service(&home, &driver);

    let with_pin = service
        .start_recording(None, &["name pin".to_string()])
        .await
        .unwrap();
    driver.emit(pin_field());
    service.stop_recording(&with_pin.to_string()).await.unwrap();

    let without = service.start_recording(None, &[]).await.unwrap();
    driver.emit(pin_field());
    service.stop_recording(&without.to_string()).await.unwrap();

    let masked_value = |id: String| {
        let document = service.store().load(&id).unwrap().unwrap();
        let EventPayload::DomSetChildNodes(data) = &document.events[0].payload else {
            panic!("expected child nodes");
        };
        data.nodes[0]
            .attributes
            .as_ref()
            .and_then(|attributes| attributes.get("value").map(str::to_string))
    };
    assert_eq!(masked_value(with_pin.to_string()).as_deref(), Some("***MASKED***"));
    assert_eq!(masked_value(without.to_string()).as_deref(), Some("0000"));
}

#[tokio::test]
async fn invalid_selector_fails_before_launch() {
    let home = TempDir::new().unwrap();
    let driver = ScriptedDriver::new();
    let service = service(&home, &driver);

    let err = service
        .start_recording(None, &["input[(".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, RecorderError::Validation(_)));
    assert!(driver.calls().is_empty());
}

#[tokio::test]
async fn malformed_ids_are_rejected_everywhere() {
    let home = TempDir::new().unwrap();
    let driver = ScriptedDriver::new();
    let service = service(&home, &driver);

    let bad = "not-a-uuid";
    assert!(matches!(
        service.stop_recording(bad).await,
        Err(RecorderError::Validation(_))
    ));
    assert!(matches!(
        service.get_recording(bad, &EventQuery::default(), true),
        Err(RecorderError::Validation(_))
    ));
    assert!(matches!(
        service.analyze_recording(bad),
        Err(RecorderError::Validation(_))
    ));
    assert!(matches!(
        service.delete_recording(bad),
        Err(RecorderError::Validation(_))
    ));
    assert!(!home.path().join("recordings").exists());
}

#[tokio::test]
async fn stopping_an_unknown_session_is_invalid_state() {
    let home = TempDir::new().unwrap();
    let driver = ScriptedDriver::new();
    let service = service(&home, &driver);

    let err = service
        .stop_recording("0f8fad5b-d9cb-469f-a165-70867728950e")
        .await
        .unwrap_err();
    assert!(matches!(err, RecorderError::InvalidState(_)));
}

#[tokio::test]
async fn shutdown_saves_active_sessions() {
    let home = TempDir::new().unwrap();
    let driver = ScriptedDriver::new();
    let service = service(&home, &driver);

    let id = service.start_recording(None, &[]).await.unwrap();
    driver.emit(console("unsaved"));
    service.shutdown().await;

    assert!(service.active_sessions().await.is_empty());
    let document = service.store().load(&id.to_string()).unwrap().unwrap();
    assert_eq!(document.events.len(), 1);
}
