use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::Browser;
use chromiumoxide::BrowserConfig as CdpConfig;
use chromiumoxide::Page;
use chromiumoxide::browser::HeadlessMode;
use chromiumoxide::cdp::browser_protocol::dom;
use chromiumoxide::cdp::browser_protocol::page as cdp_page;
use chromiumoxide::cdp::js_protocol::runtime as cdp_runtime;
use domtrace_core::BrowserDriver;
use domtrace_core::CaptureSignal;
use domtrace_core::CaptureSink;
use domtrace_core::DriverFactory;
use domtrace_core::RecorderError;
use domtrace_core::Result;
use domtrace_core::config::BrowserSettings;
use domtrace_core::config::Config;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::CLICK_BINDING;
use crate::CLICK_TRACKER_JS;
use crate::signals;

/// Spawns a task forwarding every `$event` through `$convert` into the sink.
macro_rules! forward {
    ($page:expr, $sink:expr, $event:ty, $convert:path) => {{
        let mut stream = $page
            .event_listener::<$event>()
            .await
            .map_err(RecorderError::browser)?;
        let sink = $sink.clone();
        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if let Some(signal) = $convert(&event)
                    && !sink.send(signal)
                {
                    break;
                }
            }
        })
    }};
}

/// Drives a locally launched Chromium over CDP.
pub struct ChromiumDriver {
    settings: BrowserSettings,
    browser: Option<Browser>,
    page: Option<Page>,
    handler_task: Option<JoinHandle<()>>,
    listener_tasks: Vec<JoinHandle<()>>,
    /// Throwaway profile, removed when dropped.
    profile_dir: Option<TempDir>,
}

/// One [`ChromiumDriver`] per session, configured from `config`.
pub fn driver_factory(config: &Config) -> DriverFactory {
    let settings = config.browser.clone();
    Arc::new(move || Box::new(ChromiumDriver::new(settings.clone())) as Box<dyn BrowserDriver>)
}

impl ChromiumDriver {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            browser: None,
            page: None,
            handler_task: None,
            listener_tasks: Vec::new(),
            profile_dir: None,
        }
    }

    /// Evaluates `expression` in the current page and returns its JSON
    /// value (`null` for `undefined`).
    pub async fn evaluate(&self, expression: &str) -> Result<serde_json::Value> {
        let result = self
            .page()?
            .evaluate(expression)
            .await
            .map_err(RecorderError::browser)?;
        Ok(result.value().cloned().unwrap_or_default())
    }

    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| RecorderError::InvalidState("browser not launched".to_string()))
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn launch(&mut self, headless: bool) -> Result<()> {
        if self.browser.is_some() {
            return Ok(());
        }
        let profile_dir = tempfile::Builder::new()
            .prefix("domtrace-profile-")
            .tempdir()?;

        let mut builder = CdpConfig::builder()
            .user_data_dir(profile_dir.path())
            .window_size(self.settings.window_width, self.settings.window_height)
            .args(self.settings.args.iter().map(String::as_str));
        builder = if headless {
            builder.headless_mode(HeadlessMode::New)
        } else {
            builder.with_head()
        };
        if let Some(executable) = &self.settings.executable {
            builder = builder.chrome_executable(executable);
        }
        let cdp_config = builder.build().map_err(RecorderError::Browser)?;

        info!("Launching browser (headless={headless})");
        let (mut browser, mut handler) = Browser::launch(cdp_config).await.map_err(|e| {
            RecorderError::Browser(format!(
                "failed to launch browser: {e}. Ensure Chrome or Chromium is installed and on PATH"
            ))
        })?;
        self.handler_task = Some(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!("browser handler error: {err}");
                }
            }
        }));

        match browser.new_page("about:blank").await {
            Ok(page) => self.page = Some(page),
            Err(err) => {
                let _ = browser.close().await;
                if let Some(task) = self.handler_task.take() {
                    task.abort();
                }
                return Err(RecorderError::browser(err));
            }
        }
        self.browser = Some(browser);
        self.profile_dir = Some(profile_dir);
        Ok(())
    }

    async fn attach(&mut self, sink: CaptureSink) -> Result<()> {
        let page = self.page()?.clone();

        page.execute(dom::EnableParams::default())
            .await
            .map_err(RecorderError::browser)?;
        page.execute(cdp_runtime::EnableParams::default())
            .await
            .map_err(RecorderError::browser)?;
        page.execute(cdp_page::EnableParams::default())
            .await
            .map_err(RecorderError::browser)?;
        page.execute(cdp_runtime::AddBindingParams::new(CLICK_BINDING))
            .await
            .map_err(RecorderError::browser)?;

        let tasks = vec![
            forward!(page, sink, cdp_runtime::EventConsoleApiCalled, signals::console),
            forward!(page, sink, cdp_runtime::EventExceptionThrown, signals::exception),
            forward!(page, sink, cdp_runtime::EventBindingCalled, signals::binding_called),
            forward!(page, sink, dom::EventSetChildNodes, signals::set_child_nodes),
            forward!(page, sink, dom::EventAttributeModified, signals::attribute_modified),
            forward!(
                page,
                sink,
                dom::EventCharacterDataModified,
                signals::character_data_modified
            ),
        ];
        self.listener_tasks.extend(tasks);

        // documentUpdated invalidates every known node id; re-request the
        // tree so attribute and text events keep flowing.
        let mut updates = page
            .event_listener::<dom::EventDocumentUpdated>()
            .await
            .map_err(RecorderError::browser)?;
        let update_page = page.clone();
        let update_sink = sink.clone();
        self.listener_tasks.push(tokio::spawn(async move {
            while updates.next().await.is_some() {
                if !update_sink.send(CaptureSignal::DocumentUpdated) {
                    break;
                }
                request_document(&update_page).await;
            }
        }));

        let mut loads = page
            .event_listener::<cdp_page::EventLoadEventFired>()
            .await
            .map_err(RecorderError::browser)?;
        let load_page = page.clone();
        self.listener_tasks.push(tokio::spawn(async move {
            while loads.next().await.is_some() {
                inject_click_tracker(&load_page).await;
            }
        }));

        request_document(&page).await;
        inject_click_tracker(&page).await;
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        let page = self.page()?;
        page.goto(url).await.map_err(RecorderError::browser)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        for task in self.listener_tasks.drain(..) {
            task.abort();
        }
        self.page = None;

        let mut result = Ok(());
        if let Some(mut browser) = self.browser.take() {
            if let Err(err) = browser.close().await {
                result = Err(RecorderError::browser(err));
            }
            if let Err(err) = browser.wait().await {
                debug!("waiting for browser exit failed: {err}");
            }
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        if let Some(profile_dir) = self.profile_dir.take()
            && let Err(err) = profile_dir.close()
        {
            warn!("failed to remove browser profile: {err}");
        }
        result
    }
}

/// Fetches the full DOM so CDP reports mutations for every node.
async fn request_document(page: &Page) {
    let params = dom::GetDocumentParams {
        depth: Some(-1),
        pierce: None,
    };
    if let Err(err) = page.execute(params).await {
        debug!("DOM.getDocument failed: {err}");
    }
}

async fn inject_click_tracker(page: &Page) {
    if let Err(err) = page.evaluate(CLICK_TRACKER_JS).await {
        warn!("Failed to inject click tracker: {err}");
    }
}
