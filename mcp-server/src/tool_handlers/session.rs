use domtrace_core::RecorderService;
use mcp_types::CallToolResult;
use serde_json::json;
use tracing::info;
use tracing::warn;

use crate::tool_config::START_RECORDING;
use crate::tool_config::STOP_RECORDING;
use crate::tool_config::StartRecordingArgs;
use crate::tool_config::StopRecordingArgs;
use crate::tool_handlers::error_result;
use crate::tool_handlers::parse_arguments;
use crate::tool_handlers::text_result;

pub(crate) async fn handle_start_recording(
    service: &RecorderService,
    arguments: Option<serde_json::Value>,
) -> CallToolResult {
    let StartRecordingArgs {
        url,
        sensitive_selectors,
    } = match parse_arguments(START_RECORDING, arguments) {
        Ok(args) => args,
        Err(result) => return result,
    };
    let selectors = sensitive_selectors.unwrap_or_default();

    let session_id = match service.start_recording(url.as_deref(), &selectors).await {
        Ok(session_id) => session_id,
        Err(err) => {
            warn!("start_recording failed: {err}");
            return error_result(format!("Failed to start recording: {err}"));
        }
    };
    info!("recording {session_id} started");

    let opened = match &url {
        Some(url) => format!(" at {url}"),
        None => String::new(),
    };
    CallToolResult {
        structured_content: Some(json!({ "session_id": session_id.to_string() })),
        ..text_result(format!(
            "Recording started. Session ID: {session_id}\n\
             Chrome browser opened{opened}.\n\
             Interact with the browser manually. Call stop_recording when done."
        ))
    }
}

pub(crate) async fn handle_stop_recording(
    service: &RecorderService,
    arguments: Option<serde_json::Value>,
) -> CallToolResult {
    let StopRecordingArgs { session_id } = match parse_arguments(STOP_RECORDING, arguments) {
        Ok(args) => args,
        Err(result) => return result,
    };

    let outcome = match service.stop_recording(&session_id).await {
        Ok(outcome) => outcome,
        Err(err) => return error_result(format!("Failed to stop recording: {err}")),
    };

    let mut text = format!(
        "Recording stopped and saved to: {}\nTotal events recorded: {}",
        outcome.filepath.display(),
        outcome.event_count
    );
    if outcome.dropped_events > 0 {
        text.push_str(&format!(
            "\nEvents dropped after reaching the event limit: {}",
            outcome.dropped_events
        ));
    }
    CallToolResult {
        structured_content: Some(json!({
            "session_id": outcome.session_id.to_string(),
            "filepath": outcome.filepath,
            "event_count": outcome.event_count,
            "dropped_events": outcome.dropped_events,
        })),
        ..text_result(text)
    }
}
