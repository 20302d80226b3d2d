//! Wire types shared by the capture pipeline, the on-disk store and the
//! MCP transport.

mod events;
mod recording;
mod recording_id;

pub use events::AttributeList;
pub use events::AttributeModifiedData;
pub use events::AttributePair;
pub use events::CharacterDataModifiedData;
pub use events::ClickCoordinates;
pub use events::ClickData;
pub use events::ClickViewport;
pub use events::ConsoleLogData;
pub use events::DocumentUpdatedData;
pub use events::EventPayload;
pub use events::EventType;
pub use events::JsErrorData;
pub use events::NodeSnapshot;
pub use events::RecordedEvent;
pub use events::SetChildNodesData;
pub use events::SourceLocation;
pub use events::UnknownEventType;
pub use recording::EventQuery;
pub use recording::FilteredRecording;
pub use recording::InvalidTimestamp;
pub use recording::RecordingDocument;
pub use recording::RecordingListEntry;
pub use recording::RecordingMetadata;
pub use recording_id::InvalidRecordingId;
pub use recording_id::RecordingId;
