//! Read-side tools over saved recordings. Every store call reads or deletes
//! files, so it runs on the blocking pool rather than a runtime worker.

use std::sync::Arc;

use domtrace_core::RecorderService;
use mcp_types::CallToolResult;
use serde::Serialize;

use crate::tool_config::ANALYZE_RECORDING;
use crate::tool_config::AnalyzeRecordingArgs;
use crate::tool_config::DELETE_RECORDING;
use crate::tool_config::DeleteRecordingArgs;
use crate::tool_config::GET_RECORDING;
use crate::tool_config::GetRecordingArgs;
use crate::tool_handlers::error_result;
use crate::tool_handlers::parse_arguments;
use crate::tool_handlers::text_result;

pub(crate) async fn handle_get_recording(
    service: &Arc<RecorderService>,
    arguments: Option<serde_json::Value>,
) -> CallToolResult {
    let args: GetRecordingArgs = match parse_arguments(GET_RECORDING, arguments) {
        Ok(args) => args,
        Err(result) => return result,
    };
    let query = match args.query() {
        Ok(query) => query,
        Err(err) => return error_result(err.to_string()),
    };

    let GetRecordingArgs {
        session_id,
        include_events,
        ..
    } = args;
    let lookup = session_id.clone();
    let loaded = match on_blocking_pool(service, move |service| {
        service.get_recording(&lookup, &query, include_events)
    })
    .await
    {
        Ok(loaded) => loaded,
        Err(result) => return result,
    };
    match loaded {
        Ok(Some(recording)) => json_result(&recording),
        Ok(None) => not_found(&session_id),
        Err(err) => error_result(err.to_string()),
    }
}

pub(crate) async fn handle_analyze_recording(
    service: &Arc<RecorderService>,
    arguments: Option<serde_json::Value>,
) -> CallToolResult {
    let AnalyzeRecordingArgs { session_id } = match parse_arguments(ANALYZE_RECORDING, arguments)
    {
        Ok(args) => args,
        Err(result) => return result,
    };

    let lookup = session_id.clone();
    let analyzed =
        match on_blocking_pool(service, move |service| service.analyze_recording(&lookup)).await {
            Ok(analyzed) => analyzed,
            Err(result) => return result,
        };
    match analyzed {
        Ok(Some(summary)) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => CallToolResult {
                structured_content: serde_json::to_value(&summary).ok(),
                ..text_result(format!("Recording Analysis for {session_id}:\n\n{json}"))
            },
            Err(err) => error_result(format!("Failed to serialize summary: {err}")),
        },
        Ok(None) => not_found(&session_id),
        Err(err) => error_result(err.to_string()),
    }
}

pub(crate) async fn handle_list_recordings(service: &Arc<RecorderService>) -> CallToolResult {
    let listed = match on_blocking_pool(service, RecorderService::list_recordings).await {
        Ok(listed) => listed,
        Err(result) => return result,
    };
    match listed {
        Ok(entries) if entries.is_empty() => text_result("No recordings found."),
        Ok(entries) => json_result(&entries),
        Err(err) => error_result(format!("Failed to list recordings: {err}")),
    }
}

pub(crate) async fn handle_delete_recording(
    service: &Arc<RecorderService>,
    arguments: Option<serde_json::Value>,
) -> CallToolResult {
    let DeleteRecordingArgs { session_id } = match parse_arguments(DELETE_RECORDING, arguments) {
        Ok(args) => args,
        Err(result) => return result,
    };

    let target = session_id.clone();
    let deleted =
        match on_blocking_pool(service, move |service| service.delete_recording(&target)).await {
            Ok(deleted) => deleted,
            Err(result) => return result,
        };
    match deleted {
        Ok(true) => text_result(format!("Deleted recording {session_id}")),
        Ok(false) => not_found(&session_id),
        Err(err) => error_result(err.to_string()),
    }
}

async fn on_blocking_pool<T, F>(service: &Arc<RecorderService>, f: F) -> Result<T, CallToolResult>
where
    F: FnOnce(&RecorderService) -> T + Send + 'static,
    T: Send + 'static,
{
    let service = Arc::clone(service);
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| error_result(format!("join error: {e}")))
}

fn not_found(session_id: &str) -> CallToolResult {
    error_result(format!("Recording not found: {session_id}"))
}

fn json_result<T: Serialize>(value: &T) -> CallToolResult {
    match serde_json::to_string_pretty(value) {
        Ok(json) => text_result(json),
        Err(err) => error_result(format!("Failed to serialize recording: {err}")),
    }
}
