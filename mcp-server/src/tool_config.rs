//! Arguments accepted by the recorder tools and their advertised schemas.

use std::str::FromStr;

use domtrace_core::RecorderError;
use domtrace_protocol::EventQuery;
use domtrace_protocol::EventType;
use mcp_types::Tool;
use mcp_types::ToolAnnotations;
use mcp_types::ToolInputSchema;
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use serde::Deserialize;

pub(crate) const START_RECORDING: &str = "start_recording";
pub(crate) const STOP_RECORDING: &str = "stop_recording";
pub(crate) const GET_RECORDING: &str = "get_recording";
pub(crate) const ANALYZE_RECORDING: &str = "analyze_recording";
pub(crate) const LIST_RECORDINGS: &str = "list_recordings";
pub(crate) const DELETE_RECORDING: &str = "delete_recording";

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub(crate) struct StartRecordingArgs {
    /// Optional URL to navigate to on start.
    #[serde(default)]
    pub url: Option<String>,

    /// Additional patterns marking fields as sensitive for this session only.
    #[serde(default)]
    pub sensitive_selectors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub(crate) struct StopRecordingArgs {
    /// Session ID returned by start_recording.
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub(crate) struct GetRecordingArgs {
    /// Session ID to retrieve.
    pub session_id: String,

    /// Return the (filtered) event list. Without this only metadata and
    /// per-type counts are returned.
    #[serde(default)]
    pub include_events: bool,

    /// Only return events of these types, e.g. `console_log`, `click`.
    #[serde(default)]
    pub event_types: Option<Vec<String>>,

    /// Maximum number of events to return.
    #[serde(default)]
    pub limit: Option<usize>,

    /// Number of matching events to skip.
    #[serde(default)]
    pub offset: Option<usize>,

    /// Only events at or after this ISO-8601 timestamp.
    #[serde(default)]
    pub from_timestamp: Option<String>,

    /// Only events at or before this ISO-8601 timestamp.
    #[serde(default)]
    pub to_timestamp: Option<String>,
}

impl GetRecordingArgs {
    /// Builds the filter, rejecting unknown event types and timestamps that
    /// do not parse as ISO-8601 with a validation error.
    pub(crate) fn query(&self) -> Result<EventQuery, RecorderError> {
        let event_types = self
            .event_types
            .as_ref()
            .map(|names| {
                names
                    .iter()
                    .map(|name| EventType::from_str(name))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;
        let query = EventQuery {
            event_types,
            limit: self.limit,
            offset: self.offset,
            from_timestamp: self.from_timestamp.clone(),
            to_timestamp: self.to_timestamp.clone(),
        };
        query.validate()?;
        Ok(query)
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub(crate) struct AnalyzeRecordingArgs {
    /// Session ID to analyze.
    pub session_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub(crate) struct ListRecordingsArgs {}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub(crate) struct DeleteRecordingArgs {
    /// Session ID whose saved recording should be removed.
    pub session_id: String,
}

pub(crate) fn create_tool_for_start_recording() -> Tool {
    create_tool::<StartRecordingArgs>(
        START_RECORDING,
        "Start recording browser interactions. Opens Chrome and records DOM mutations, console logs, JS errors and clicks.",
        None,
    )
}

pub(crate) fn create_tool_for_stop_recording() -> Tool {
    create_tool::<StopRecordingArgs>(
        STOP_RECORDING,
        "Stop a recording session and save it to a JSON file.",
        None,
    )
}

pub(crate) fn create_tool_for_get_recording() -> Tool {
    create_tool::<GetRecordingArgs>(
        GET_RECORDING,
        "Get recording data by session ID. Returns metadata and event counts unless include_events is set.",
        Some(read_only()),
    )
}

pub(crate) fn create_tool_for_analyze_recording() -> Tool {
    create_tool::<AnalyzeRecordingArgs>(
        ANALYZE_RECORDING,
        "Analyze a recording and get summary statistics.",
        Some(read_only()),
    )
}

pub(crate) fn create_tool_for_list_recordings() -> Tool {
    create_tool::<ListRecordingsArgs>(
        LIST_RECORDINGS,
        "List saved recordings, newest first.",
        Some(read_only()),
    )
}

pub(crate) fn create_tool_for_delete_recording() -> Tool {
    create_tool::<DeleteRecordingArgs>(
        DELETE_RECORDING,
        "Delete every saved file for a session ID.",
        Some(ToolAnnotations {
            destructive_hint: Some(true),
            ..Default::default()
        }),
    )
}

pub(crate) fn all_tools() -> Vec<Tool> {
    vec![
        create_tool_for_start_recording(),
        create_tool_for_stop_recording(),
        create_tool_for_get_recording(),
        create_tool_for_analyze_recording(),
        create_tool_for_list_recordings(),
        create_tool_for_delete_recording(),
    ]
}

fn read_only() -> ToolAnnotations {
    ToolAnnotations {
        read_only_hint: Some(true),
        ..Default::default()
    }
}

fn create_tool<T: JsonSchema>(
    name: &str,
    description: &str,
    annotations: Option<ToolAnnotations>,
) -> Tool {
    let schema = SchemaSettings::draft2019_09()
        .with(|s| {
            s.inline_subschemas = true;
            s.option_add_null_type = false;
        })
        .into_generator()
        .into_root_schema_for::<T>();

    #[expect(clippy::expect_used)]
    let schema_value =
        serde_json::to_value(&schema).expect("tool schema should serialise to JSON");

    let input_schema =
        serde_json::from_value::<ToolInputSchema>(schema_value).unwrap_or_else(|e| {
            panic!("failed to create Tool from schema: {e}");
        });

    Tool {
        name: name.to_string(),
        title: None,
        description: Some(description.to_string()),
        input_schema,
        annotations,
    }
}
