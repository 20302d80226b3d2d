//! Per-session capture channel.
//!
//! Browser callbacks only ever hold a [`CaptureSink`]. Every signal is sent
//! to a single consumer task that owns the [`EventNormalizer`], so the cap
//! check and the append can never interleave across callbacks.

use domtrace_protocol::RecordedEvent;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::RecorderError;
use crate::error::Result;
use crate::normalizer::CaptureSignal;
use crate::normalizer::EventNormalizer;

enum CaptureCmd {
    Signal(CaptureSignal),
    Count { ack: oneshot::Sender<usize> },
    Finish { ack: oneshot::Sender<CaptureReport> },
}

/// Cheap, cloneable handle used by driver callbacks to deliver signals.
#[derive(Clone, Debug)]
pub struct CaptureSink {
    tx: mpsc::UnboundedSender<CaptureCmd>,
}

impl CaptureSink {
    /// Queues `signal`. Returns `false` once the session has stopped
    /// capturing; late signals are discarded.
    pub fn send(&self, signal: CaptureSignal) -> bool {
        self.tx.send(CaptureCmd::Signal(signal)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Everything captured for one session.
#[derive(Debug, Default)]
pub(crate) struct CaptureReport {
    pub events: Vec<RecordedEvent>,
    /// Signals refused because the event cap was reached.
    pub rejected: usize,
}

pub(crate) struct CaptureTask {
    tx: mpsc::UnboundedSender<CaptureCmd>,
    handle: JoinHandle<()>,
}

impl CaptureTask {
    pub fn spawn(max_events: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(capture_loop(rx, EventNormalizer::new(max_events)));
        Self { tx, handle }
    }

    pub fn sink(&self) -> CaptureSink {
        CaptureSink {
            tx: self.tx.clone(),
        }
    }

    pub async fn event_count(&self) -> Result<usize> {
        let (ack, rx) = oneshot::channel();
        self.tx
            .send(CaptureCmd::Count { ack })
            .map_err(|_| closed())?;
        rx.await.map_err(|_| closed())
    }

    /// Drains every signal queued so far and returns the captured events.
    /// Signals sent after this point are discarded.
    pub async fn finish(self) -> Result<CaptureReport> {
        let (ack, rx) = oneshot::channel();
        self.tx
            .send(CaptureCmd::Finish { ack })
            .map_err(|_| closed())?;
        let report = rx.await.map_err(|_| closed())?;
        if let Err(err) = self.handle.await {
            warn!("capture task did not shut down cleanly: {err}");
        }
        Ok(report)
    }

    pub fn abort(self) {
        self.handle.abort();
    }
}

fn closed() -> RecorderError {
    RecorderError::InvalidState("capture channel closed".to_string())
}

async fn capture_loop(mut rx: mpsc::UnboundedReceiver<CaptureCmd>, mut normalizer: EventNormalizer) {
    let mut rejected = 0usize;
    while let Some(cmd) = rx.recv().await {
        match cmd {
            CaptureCmd::Signal(signal) => match normalizer.ingest(signal) {
                Ok(_) => {}
                Err(err @ RecorderError::ResourceLimit(_)) => {
                    if rejected == 0 {
                        warn!("{err}; further events for this session are discarded");
                    }
                    rejected += 1;
                }
                Err(err) => warn!("failed to record event: {err}"),
            },
            CaptureCmd::Count { ack } => {
                let _ = ack.send(normalizer.len());
            }
            CaptureCmd::Finish { ack } => {
                rx.close();
                let _ = ack.send(CaptureReport {
                    events: normalizer.into_events(),
                    rejected,
                });
                return;
            }
        }
    }
}
