//! Operations exposed to the transport and the CLI.

use domtrace_protocol::EventQuery;
use domtrace_protocol::FilteredRecording;
use domtrace_protocol::RecordingId;
use domtrace_protocol::RecordingListEntry;
use tracing::info;
use tracing::warn;

use crate::analyzer::RecordingSummary;
use crate::analyzer::analyze;
use crate::config::Config;
use crate::controller::DriverFactory;
use crate::controller::SessionController;
use crate::controller::StopOutcome;
use crate::detector::SensitiveFieldDetector;
use crate::error::RecorderError;
use crate::error::Result;
use crate::masking::MaskingEngine;
use crate::registry::SessionRegistry;
use crate::store::SessionStore;
use crate::store::validate_session_id;

pub struct RecorderService {
    config: Config,
    store: SessionStore,
    registry: SessionRegistry,
    driver_factory: DriverFactory,
}

impl RecorderService {
    pub fn new(config: Config, driver_factory: DriverFactory) -> Self {
        let store = SessionStore::from_config(&config);
        Self {
            config,
            store,
            registry: SessionRegistry::new(),
            driver_factory,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Starts a new session. `sensitive_selectors` apply to this session
    /// only, on top of the configured and built-in patterns.
    pub async fn start_recording(
        &self,
        url: Option<&str>,
        sensitive_selectors: &[String],
    ) -> Result<RecordingId> {
        let selectors: Vec<&String> = self
            .config
            .sensitive_selectors
            .iter()
            .chain(sensitive_selectors)
            .collect();
        let detector = SensitiveFieldDetector::new(&selectors)?;
        let mut controller = SessionController::new(
            (self.driver_factory)(),
            self.config.headless,
            self.config.max_events,
            MaskingEngine::new(detector),
        );
        let session_id = controller.start(url).await?;
        if self.registry.insert(controller).await.is_err() {
            return Err(RecorderError::InvalidState(format!(
                "session {session_id} is not capturing"
            )));
        }
        Ok(session_id)
    }

    pub async fn stop_recording(&self, session_id: &str) -> Result<StopOutcome> {
        let session_id = validate_session_id(session_id)?;
        let Some(mut controller) = self.registry.take(&session_id).await else {
            return Err(RecorderError::InvalidState(format!(
                "no active recording session {session_id}"
            )));
        };
        controller.stop(&self.store).await
    }

    pub fn get_recording(
        &self,
        session_id: &str,
        query: &EventQuery,
        include_events: bool,
    ) -> Result<Option<FilteredRecording>> {
        self.store.load_filtered(session_id, query, include_events)
    }

    pub fn analyze_recording(&self, session_id: &str) -> Result<Option<RecordingSummary>> {
        Ok(self
            .store
            .load(session_id)?
            .map(|document| analyze(&document.events)))
    }

    pub fn list_recordings(&self) -> Result<Vec<RecordingListEntry>> {
        self.store.list()
    }

    pub fn delete_recording(&self, session_id: &str) -> Result<bool> {
        self.store.delete(session_id)
    }

    pub async fn active_sessions(&self) -> Vec<RecordingId> {
        self.registry.session_ids().await
    }

    /// Events captured so far by an active session.
    pub async fn live_event_count(&self, session_id: &str) -> Result<Option<usize>> {
        let session_id = validate_session_id(session_id)?;
        Ok(self.registry.event_count(&session_id).await)
    }

    /// Stops and saves every active session. Used when the host exits.
    pub async fn shutdown(&self) {
        for mut controller in self.registry.drain().await {
            let session_id = controller.session_id();
            match controller.stop(&self.store).await {
                Ok(outcome) => info!(
                    "saved {} on shutdown to {}",
                    outcome.session_id,
                    outcome.filepath.display()
                ),
                Err(err) => warn!("failed to save {session_id:?} on shutdown: {err}"),
            }
        }
    }
}
