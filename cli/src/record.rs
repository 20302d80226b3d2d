//! `domtrace record`: interactive capture from the terminal.

use anyhow::Context;
use domtrace_browser::driver_factory;
use domtrace_core::Config;
use domtrace_core::ConfigOverrides;
use domtrace_core::RecorderService;
use domtrace_core::RecordingSummary;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tracing::info;

/// Opens a browser at `url`, records until Enter (or Ctrl-C) and prints a
/// summary of what was saved.
pub async fn run_record(overrides: ConfigOverrides, url: Option<String>) -> anyhow::Result<()> {
    let config = Config::load_with_overrides(overrides).context("error loading config")?;
    let factory = driver_factory(&config);
    let service = RecorderService::new(config, factory);

    let session_id = service
        .start_recording(url.as_deref(), &[])
        .await
        .context("failed to start recording")?;
    println!("Recording session {session_id}");
    println!("Interact with the browser, then press Enter here to stop.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    tokio::select! {
        line = lines.next_line() => {
            line.context("failed to read from stdin")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted; stopping {session_id}");
        }
    }

    let outcome = service
        .stop_recording(&session_id.to_string())
        .await
        .context("failed to stop recording")?;
    println!("Saved {}", outcome.filepath.display());
    if outcome.dropped_events > 0 {
        println!(
            "Event limit reached: {} events were not recorded",
            outcome.dropped_events
        );
    }
    if let Some(summary) = service.analyze_recording(&session_id.to_string())? {
        print!("{}", render_summary(&summary));
    }
    Ok(())
}

pub fn render_summary(summary: &RecordingSummary) -> String {
    let mut out = format!("Total events: {}\n", summary.total_events);
    for (event_type, count) in &summary.event_types {
        out.push_str(&format!("  {event_type:<26} {count}\n"));
    }
    out.push_str(&format!(
        "Console logs: {}  JS errors: {}  DOM mutations: {}  Clicks: {}  Masked: {}\n",
        summary.console_logs,
        summary.js_errors,
        summary.dom_mutations,
        summary.clicks,
        summary.masked_events
    ));
    out
}
