use std::collections::HashMap;

use domtrace_protocol::RecordingId;
use tokio::sync::Mutex;

use crate::controller::SessionController;

/// Active sessions keyed by id. Owned by the service layer; stopping a
/// session removes its controller from the registry first, so a session can
/// only ever be stopped once.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<RecordingId, SessionController>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a capturing controller under its session id. Controllers
    /// that are not capturing are handed back.
    pub async fn insert(
        &self,
        controller: SessionController,
    ) -> std::result::Result<RecordingId, SessionController> {
        let Some(session_id) = controller.session_id() else {
            return Err(controller);
        };
        self.sessions.lock().await.insert(session_id, controller);
        Ok(session_id)
    }

    pub async fn take(&self, session_id: &RecordingId) -> Option<SessionController> {
        self.sessions.lock().await.remove(session_id)
    }

    pub async fn contains(&self, session_id: &RecordingId) -> bool {
        self.sessions.lock().await.contains_key(session_id)
    }

    pub async fn event_count(&self, session_id: &RecordingId) -> Option<usize> {
        let sessions = self.sessions.lock().await;
        let controller = sessions.get(session_id)?;
        controller.event_count().await.ok()
    }

    pub async fn session_ids(&self) -> Vec<RecordingId> {
        let mut ids: Vec<RecordingId> = self.sessions.lock().await.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Removes and returns every controller.
    pub async fn drain(&self) -> Vec<SessionController> {
        self.sessions.lock().await.drain().map(|(_, controller)| controller).collect()
    }
}
