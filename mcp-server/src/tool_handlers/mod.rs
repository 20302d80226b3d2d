pub(crate) mod recordings;
pub(crate) mod session;

use std::sync::Arc;

use domtrace_core::RecorderService;
use mcp_types::CallToolResult;
use mcp_types::ContentBlock;
use mcp_types::TextContent;
use serde::de::DeserializeOwned;

use crate::tool_config::ANALYZE_RECORDING;
use crate::tool_config::DELETE_RECORDING;
use crate::tool_config::GET_RECORDING;
use crate::tool_config::LIST_RECORDINGS;
use crate::tool_config::START_RECORDING;
use crate::tool_config::STOP_RECORDING;

/// Runs the named tool. Tool-level failures come back as results with
/// `is_error` set, never as JSON-RPC errors.
pub(crate) async fn handle_tool_call(
    service: &Arc<RecorderService>,
    name: &str,
    arguments: Option<serde_json::Value>,
) -> CallToolResult {
    match name {
        START_RECORDING => session::handle_start_recording(service, arguments).await,
        STOP_RECORDING => session::handle_stop_recording(service, arguments).await,
        GET_RECORDING => recordings::handle_get_recording(service, arguments).await,
        ANALYZE_RECORDING => recordings::handle_analyze_recording(service, arguments).await,
        LIST_RECORDINGS => recordings::handle_list_recordings(service).await,
        DELETE_RECORDING => recordings::handle_delete_recording(service, arguments).await,
        _ => error_result(format!("Unknown tool '{name}'")),
    }
}

/// Missing arguments are treated as `{}` so tools without required fields
/// can be called bare.
pub(crate) fn parse_arguments<T: DeserializeOwned>(
    tool: &str,
    arguments: Option<serde_json::Value>,
) -> Result<T, CallToolResult> {
    let value = arguments.unwrap_or_else(|| serde_json::json!({}));
    serde_json::from_value(value)
        .map_err(|e| error_result(format!("Failed to parse {tool} arguments: {e}")))
}

pub(crate) fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::TextContent(TextContent::new(text))],
        is_error: None,
        structured_content: None,
    }
}

pub(crate) fn error_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult {
        is_error: Some(true),
        ..text_result(text)
    }
}
