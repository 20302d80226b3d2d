#![allow(clippy::unwrap_used, clippy::expect_used)]

use domtrace_core::CaptureSignal;
use domtrace_core::MaskingEngine;
use domtrace_core::RecorderError;
use domtrace_core::SessionController;
use domtrace_core::SessionStore;
use domtrace_protocol::EventPayload;
use domtrace_protocol::EventType;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use super::support::ScriptedDriver;
use super::support::attribute;
use super::support::console;

fn controller(driver: &ScriptedDriver, max_events: usize) -> SessionController {
    SessionController::new(driver.boxed(), true, max_events, MaskingEngine::default())
}

#[tokio::test]
async fn listeners_attach_before_navigation() {
    let driver = ScriptedDriver::new();
    driver.state.lock().unwrap().on_navigate = vec![CaptureSignal::DocumentUpdated];
    let mut controller = controller(&driver, 100);

    controller.start(Some("https://example.com")).await.unwrap();
    assert_eq!(
        driver.calls(),
        vec![
            "launch(headless=true)".to_string(),
            "attach".to_string(),
            "navigate(https://example.com)".to_string(),
        ]
    );
    assert_eq!(controller.event_count().await.unwrap(), 1);
}

#[tokio::test]
async fn start_is_idempotent_while_capturing() {
    let driver = ScriptedDriver::new();
    let mut controller = controller(&driver, 100);

    let first = controller.start(None).await.unwrap();
    let second = controller.start(Some("https://example.com")).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        driver.calls(),
        vec!["launch(headless=true)".to_string(), "attach".to_string()]
    );
}

#[tokio::test]
async fn stop_without_session_is_invalid_state() {
    let dir = TempDir::new().unwrap();
    let driver = ScriptedDriver::new();
    let mut controller = controller(&driver, 100);

    let err = controller.stop(&SessionStore::new(dir.path())).await.unwrap_err();
    assert!(matches!(err, RecorderError::InvalidState(_)));
    assert!(driver.calls().is_empty());
}

#[tokio::test]
async fn stop_masks_saves_and_releases() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path());
    let driver = ScriptedDriver::new();
    let mut controller = controller(&driver, 100);

    let session_id = controller.start(Some("https://example.com/login")).await.unwrap();
    assert!(driver.emit(console("hello")));
    assert!(driver.emit(attribute("password", "hunter2")));
    assert!(driver.emit(attribute("class", "wide")));

    let outcome = controller.stop(&store).await.unwrap();
    assert_eq!(outcome.session_id, session_id);
    assert_eq!(outcome.event_count, 3);
    assert_eq!(outcome.dropped_events, 0);
    assert!(outcome.filepath.exists());
    assert_eq!(driver.calls().last().map(String::as_str), Some("close"));
    assert!(!controller.is_capturing());

    let document = store.load(&session_id.to_string()).unwrap().unwrap();
    assert_eq!(document.url.as_deref(), Some("https://example.com/login"));
    assert!(document.start_time <= document.end_time);
    let kinds: Vec<EventType> = document.events.iter().map(|e| e.event_type()).collect();
    assert_eq!(
        kinds,
        vec![
            EventType::ConsoleLog,
            EventType::DomAttributeModified,
            EventType::DomAttributeModified,
        ]
    );
    let EventPayload::DomAttributeModified(password) = &document.events[1].payload else {
        panic!("expected attribute event");
    };
    assert_eq!(password.value.as_deref(), Some("***MASKED***"));
    assert!(password.masked);
    let EventPayload::DomAttributeModified(class) = &document.events[2].payload else {
        panic!("expected attribute event");
    };
    assert_eq!(class.value.as_deref(), Some("wide"));
    assert!(!class.masked);
}

#[tokio::test]
async fn stopped_controller_cannot_stop_or_restart() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path());
    let driver = ScriptedDriver::new();
    let mut controller = controller(&driver, 100);

    controller.start(None).await.unwrap();
    controller.stop(&store).await.unwrap();
    assert!(matches!(
        controller.stop(&store).await,
        Err(RecorderError::InvalidState(_))
    ));
    assert!(matches!(
        controller.start(None).await,
        Err(RecorderError::InvalidState(_))
    ));
}

#[tokio::test]
async fn event_cap_limits_what_is_saved() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path());
    let driver = ScriptedDriver::new();
    let mut controller = controller(&driver, 3);

    controller.start(None).await.unwrap();
    for i in 0..5 {
        driver.emit(console(&format!("line {i}")));
    }
    let outcome = controller.stop(&store).await.unwrap();
    assert_eq!(outcome.event_count, 3);
    assert_eq!(outcome.dropped_events, 2);
}

#[tokio::test]
async fn browser_is_released_even_when_saving_fails() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let store = SessionStore::new(blocker.join("recordings"));
    let driver = ScriptedDriver::new();
    let mut controller = controller(&driver, 100);

    controller.start(None).await.unwrap();
    driver.emit(console("lost"));
    let err = controller.stop(&store).await.unwrap_err();
    assert!(matches!(err, RecorderError::Io(_)));
    assert_eq!(driver.calls().last().map(String::as_str), Some("close"));
    assert!(!controller.is_capturing());
}

#[tokio::test]
async fn close_failure_does_not_hide_the_saved_file() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path());
    let driver = ScriptedDriver::new();
    driver.state.lock().unwrap().fail_close = true;
    let mut controller = controller(&driver, 100);

    controller.start(None).await.unwrap();
    let outcome = controller.stop(&store).await.unwrap();
    assert!(outcome.filepath.exists());
}

#[tokio::test]
async fn launch_failure_propagates() {
    let driver = ScriptedDriver::new();
    driver.state.lock().unwrap().fail_launch = true;
    let mut controller = controller(&driver, 100);

    let err = controller.start(Some("https://example.com")).await.unwrap_err();
    assert!(matches!(err, RecorderError::Browser(_)));
    assert!(!controller.is_capturing());
    assert_eq!(
        driver.calls(),
        vec!["launch(headless=true)".to_string(), "close".to_string()]
    );
}

#[tokio::test]
async fn navigation_failure_releases_the_browser() {
    let driver = ScriptedDriver::new();
    driver.state.lock().unwrap().fail_navigate = true;
    let mut controller = controller(&driver, 100);

    let err = controller.start(Some("https://nowhere.invalid")).await.unwrap_err();
    assert!(matches!(err, RecorderError::Browser(_)));
    assert_eq!(driver.calls().last().map(String::as_str), Some("close"));
    assert_eq!(controller.session_id(), None);
}

#[tokio::test]
async fn disallowed_scheme_is_rejected_before_launch() {
    let driver = ScriptedDriver::new();
    let mut controller = controller(&driver, 100);

    let err = controller.start(Some("file:///etc/passwd")).await.unwrap_err();
    assert!(matches!(err, RecorderError::Validation(_)));
    assert!(driver.calls().is_empty());
}
