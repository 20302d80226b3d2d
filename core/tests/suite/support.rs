#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use domtrace_core::BrowserDriver;
use domtrace_core::CaptureSink;
use domtrace_core::CaptureSignal;
use domtrace_core::DriverFactory;
use domtrace_core::RecorderError;
use domtrace_core::Result;

/// Shared view of what a [`ScriptedDriver`] was asked to do.
#[derive(Default)]
pub struct DriverState {
    pub calls: Vec<String>,
    pub sink: Option<CaptureSink>,
    pub fail_launch: bool,
    pub fail_navigate: bool,
    pub fail_close: bool,
    /// Signals emitted as soon as navigation happens, as a page would.
    pub on_navigate: Vec<CaptureSignal>,
}

#[derive(Clone, Default)]
pub struct ScriptedDriver {
    pub state: Arc<Mutex<DriverState>>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Delivers `signal` through the attached sink.
    pub fn emit(&self, signal: CaptureSignal) -> bool {
        let state = self.state.lock().unwrap();
        state.sink.as_ref().expect("driver not attached").send(signal)
    }

    pub fn boxed(&self) -> Box<dyn BrowserDriver> {
        Box::new(self.clone())
    }

    /// A factory handing out clones sharing this driver's state.
    pub fn factory(&self) -> DriverFactory {
        let driver = self.clone();
        Arc::new(move || driver.boxed())
    }
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn launch(&mut self, headless: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("launch(headless={headless})"));
        if state.fail_launch {
            return Err(RecorderError::Browser("chrome not found".to_string()));
        }
        Ok(())
    }

    async fn attach(&mut self, sink: CaptureSink) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("attach".to_string());
        state.sink = Some(sink);
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("navigate({url})"));
        if state.fail_navigate {
            return Err(RecorderError::Browser("net::ERR_NAME_NOT_RESOLVED".to_string()));
        }
        let sink = state.sink.clone().expect("navigate before attach");
        for signal in std::mem::take(&mut state.on_navigate) {
            sink.send(signal);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("close".to_string());
        state.sink = None;
        if state.fail_close {
            return Err(RecorderError::Browser("browser already gone".to_string()));
        }
        Ok(())
    }
}

pub fn attribute(name: &str, value: &str) -> CaptureSignal {
    CaptureSignal::AttributeModified {
        node_id: Some(42),
        name: name.to_string(),
        value: Some(value.to_string()),
    }
}

pub fn console(text: &str) -> CaptureSignal {
    CaptureSignal::Console {
        level: "log".to_string(),
        args: vec![text.to_string()],
        text: None,
        url: None,
        line_number: None,
    }
}
