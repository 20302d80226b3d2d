//! Session lifecycle: idle -> capturing -> stopped.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use domtrace_protocol::RecordingId;
use tracing::info;
use tracing::warn;
use url::Url;

use crate::capture::CaptureSink;
use crate::capture::CaptureTask;
use crate::error::RecorderError;
use crate::error::Result;
use crate::masking::MaskingEngine;
use crate::store::SessionRecord;
use crate::store::SessionStore;
use crate::time::now_timestamp;

/// URL schemes a session may navigate to.
const ALLOWED_SCHEMES: &[&str] = &["http", "https", "data"];

/// The browser collaborator.
///
/// Implementations forward every console message, uncaught error, DOM
/// mutation and click-binding call to the sink passed to
/// [`BrowserDriver::attach`].
#[async_trait]
pub trait BrowserDriver: Send {
    async fn launch(&mut self, headless: bool) -> Result<()>;

    /// Subscribes to every signal source. Called after `launch` and before
    /// any navigation.
    async fn attach(&mut self, sink: CaptureSink) -> Result<()>;

    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Releases the browser and all listeners.
    async fn close(&mut self) -> Result<()>;
}

/// Creates one fresh driver per session.
pub type DriverFactory = Arc<dyn Fn() -> Box<dyn BrowserDriver> + Send + Sync>;

/// Result of a successful stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopOutcome {
    pub session_id: RecordingId,
    pub filepath: PathBuf,
    pub event_count: usize,
    /// Signals refused after the event cap was reached.
    pub dropped_events: usize,
}

enum ControllerState {
    Idle,
    Capturing(ActiveCapture),
    Stopped,
}

struct ActiveCapture {
    session_id: RecordingId,
    url: Option<String>,
    start_time: String,
    task: CaptureTask,
}

pub struct SessionController {
    driver: Box<dyn BrowserDriver>,
    headless: bool,
    max_events: usize,
    masking: MaskingEngine,
    state: ControllerState,
}

impl SessionController {
    pub fn new(
        driver: Box<dyn BrowserDriver>,
        headless: bool,
        max_events: usize,
        masking: MaskingEngine,
    ) -> Self {
        Self {
            driver,
            headless,
            max_events,
            masking,
            state: ControllerState::Idle,
        }
    }

    pub fn session_id(&self) -> Option<RecordingId> {
        match &self.state {
            ControllerState::Capturing(active) => Some(active.session_id),
            ControllerState::Idle | ControllerState::Stopped => None,
        }
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.state, ControllerState::Capturing(_))
    }

    /// Launches the browser, attaches every listener and only then
    /// navigates to `url`. Calling `start` again while capturing returns the
    /// current session id without side effects.
    pub async fn start(&mut self, url: Option<&str>) -> Result<RecordingId> {
        match &self.state {
            ControllerState::Capturing(active) => return Ok(active.session_id),
            ControllerState::Stopped => {
                return Err(RecorderError::InvalidState(
                    "session already stopped; start a new controller".to_string(),
                ));
            }
            ControllerState::Idle => {}
        }
        if let Some(url) = url {
            validate_url(url)?;
        }

        if let Err(err) = self.driver.launch(self.headless).await {
            self.release_browser().await;
            return Err(err);
        }

        let session_id = RecordingId::new();
        let start_time = now_timestamp();
        let task = CaptureTask::spawn(self.max_events);

        if let Err(err) = self.driver.attach(task.sink()).await {
            task.abort();
            self.release_browser().await;
            return Err(err);
        }
        if let Some(url) = url
            && let Err(err) = self.driver.navigate(url).await
        {
            task.abort();
            self.release_browser().await;
            return Err(err);
        }

        info!("recording {session_id} started");
        self.state = ControllerState::Capturing(ActiveCapture {
            session_id,
            url: url.map(str::to_string),
            start_time,
            task,
        });
        Ok(session_id)
    }

    /// Events captured so far.
    pub async fn event_count(&self) -> Result<usize> {
        match &self.state {
            ControllerState::Capturing(active) => active.task.event_count().await,
            ControllerState::Idle | ControllerState::Stopped => Ok(0),
        }
    }

    /// Ends capture, masks and saves the events, then releases the browser.
    /// The browser is released even when masking or saving fails; release
    /// failures are logged and do not affect the result.
    pub async fn stop(&mut self, store: &SessionStore) -> Result<StopOutcome> {
        let active = match std::mem::replace(&mut self.state, ControllerState::Stopped) {
            ControllerState::Capturing(active) => active,
            other => {
                self.state = other;
                return Err(RecorderError::InvalidState(
                    "no active recording session".to_string(),
                ));
            }
        };
        let ActiveCapture {
            session_id,
            url,
            start_time,
            task,
        } = active;
        let end_time = now_timestamp();

        let saved = match task.finish().await {
            Ok(report) => {
                let events = self.masking.process_all(report.events);
                let record = SessionRecord {
                    session_id: session_id.to_string(),
                    url,
                    start_time: Some(start_time),
                    end_time: Some(end_time),
                    events,
                };
                store.save(&record).map(|filepath| StopOutcome {
                    session_id,
                    filepath,
                    event_count: record.events.len(),
                    dropped_events: report.rejected,
                })
            }
            Err(err) => Err(err),
        };

        self.release_browser().await;
        match &saved {
            Ok(outcome) => info!(
                "recording {session_id} stopped with {} events",
                outcome.event_count
            ),
            Err(err) => warn!("recording {session_id} stopped without saving: {err}"),
        }
        saved
    }

    async fn release_browser(&mut self) {
        if let Err(err) = self.driver.close().await {
            warn!("failed to close browser: {err}");
        }
    }
}

/// Accepts `http`, `https` and `data` URLs plus scheme-less input.
pub fn validate_url(url: &str) -> Result<()> {
    match Url::parse(url) {
        Ok(parsed) if ALLOWED_SCHEMES.contains(&parsed.scheme()) => Ok(()),
        Ok(parsed) => Err(RecorderError::Validation(format!(
            "invalid URL scheme: {}. Only http/https/data allowed.",
            parsed.scheme()
        ))),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(()),
        Err(err) => Err(RecorderError::Validation(format!("invalid URL {url:?}: {err}"))),
    }
}
