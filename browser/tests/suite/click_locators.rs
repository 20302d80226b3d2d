//! Drives a real headless Chromium. Run with `cargo test -p domtrace-browser
//! -- --ignored` on a machine with Chrome or Chromium on PATH.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domtrace_browser::ChromiumDriver;
use domtrace_core::BrowserDriver;
use domtrace_core::CaptureSink;
use domtrace_core::Config;
use domtrace_core::RecorderService;
use domtrace_core::Result as RecorderResult;
use domtrace_protocol::ClickData;
use domtrace_protocol::EventPayload;
use domtrace_protocol::EventQuery;
use domtrace_protocol::EventType;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::Mutex;

const PAGE: &str = "data:text/html,<button id=go>Go</button>\
<div><span>a</span><span class=x>b</span></div>";

/// Lets the test reach the page the service is recording.
#[derive(Clone)]
struct SharedDriver(Arc<Mutex<ChromiumDriver>>);

#[async_trait]
impl BrowserDriver for SharedDriver {
    async fn launch(&mut self, headless: bool) -> RecorderResult<()> {
        self.0.lock().await.launch(headless).await
    }

    async fn attach(&mut self, sink: CaptureSink) -> RecorderResult<()> {
        self.0.lock().await.attach(sink).await
    }

    async fn navigate(&mut self, url: &str) -> RecorderResult<()> {
        self.0.lock().await.navigate(url).await
    }

    async fn close(&mut self) -> RecorderResult<()> {
        self.0.lock().await.close().await
    }
}

async fn evaluate(driver: &SharedDriver, expression: &str) -> Value {
    driver.0.lock().await.evaluate(expression).await.unwrap()
}

async fn wait_until<F, Fut>(mut ready: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if ready().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("timed out waiting for the page");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "launches a local Chrome or Chromium"]
async fn clicks_carry_xpath_and_css_locators() {
    let home = TempDir::new().unwrap();
    let mut config = Config::with_home(home.path().to_path_buf());
    config.headless = true;
    config.browser.args.push("--no-sandbox".to_string());

    let driver = SharedDriver(Arc::new(Mutex::new(ChromiumDriver::new(
        config.browser.clone(),
    ))));
    let factory_driver = driver.clone();
    let service = RecorderService::new(
        config,
        Arc::new(move || Box::new(factory_driver.clone()) as Box<dyn BrowserDriver>),
    );

    let session_id = service.start_recording(Some(PAGE), &[]).await.unwrap();
    let session_id = session_id.to_string();
    let page = &driver;
    wait_until(move || async move {
        evaluate(page, "window.__domtraceClickTracker === true").await == Value::Bool(true)
    })
    .await;

    let before = service.live_event_count(&session_id).await.unwrap().unwrap();
    evaluate(&driver, "document.getElementById('go').click()").await;
    evaluate(&driver, "document.querySelectorAll('div > span')[1].click()").await;
    let (recorder, id) = (&service, session_id.as_str());
    wait_until(move || async move {
        recorder.live_event_count(id).await.unwrap().unwrap() >= before + 2
    })
    .await;
    // Late DOM events can satisfy the count before both clicks land.
    tokio::time::sleep(Duration::from_millis(500)).await;

    service.stop_recording(&session_id).await.unwrap();
    let query = EventQuery {
        event_types: Some(vec![EventType::Click]),
        ..Default::default()
    };
    let recording = service
        .get_recording(&session_id, &query, true)
        .unwrap()
        .expect("recording saved");
    let clicks: Vec<ClickData> = recording
        .events
        .unwrap()
        .into_iter()
        .filter_map(|event| match event.payload {
            EventPayload::Click(click) => Some(*click),
            _ => None,
        })
        .collect();
    assert_eq!(clicks.len(), 2, "{clicks:?}");

    assert_eq!(clicks[0].tag_name.as_deref(), Some("BUTTON"));
    assert_eq!(clicks[0].css_selector.as_deref(), Some("#go"));
    assert_eq!(clicks[0].xpath.as_deref(), Some(r#"//*[@id="go"]"#));

    assert_eq!(clicks[1].tag_name.as_deref(), Some("SPAN"));
    assert_eq!(clicks[1].class_list, vec!["x".to_string()]);
    assert_eq!(
        clicks[1].css_selector.as_deref(),
        Some("html > body > div > span.x")
    );
    assert_eq!(clicks[1].xpath.as_deref(), Some("/html/body/div[1]/span[2]"));
    assert_eq!(clicks[1].text_content.as_deref(), Some("b"));
}
