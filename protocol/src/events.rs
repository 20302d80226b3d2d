use std::fmt::Display;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;
use serde::ser::SerializeSeq;
use serde::ser::SerializeStruct;
use serde_json::Map;
use serde_json::Value;

/// Kinds of events a recording can contain. The serialized names double as
/// the `type` field of every persisted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ConsoleLog,
    JsError,
    DocumentUpdated,
    DomSetChildNodes,
    DomAttributeModified,
    DomCharacterDataModified,
    Click,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event type: {0}")]
pub struct UnknownEventType(pub String);

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::ConsoleLog,
        EventType::JsError,
        EventType::DocumentUpdated,
        EventType::DomSetChildNodes,
        EventType::DomAttributeModified,
        EventType::DomCharacterDataModified,
        EventType::Click,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::ConsoleLog => "console_log",
            EventType::JsError => "js_error",
            EventType::DocumentUpdated => "document_updated",
            EventType::DomSetChildNodes => "dom_set_child_nodes",
            EventType::DomAttributeModified => "dom_attribute_modified",
            EventType::DomCharacterDataModified => "dom_character_data_modified",
            EventType::Click => "click",
        }
    }

    /// Every `dom_*` kind counts as a DOM mutation; `document_updated` does not.
    pub fn is_dom_mutation(self) -> bool {
        self.as_str().starts_with("dom_")
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

/// One captured event: a capture timestamp plus a kind-specific payload.
///
/// Persisted as `{"type": ..., "timestamp": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireEvent")]
pub struct RecordedEvent {
    pub timestamp: String,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    ConsoleLog(ConsoleLogData),
    JsError(JsErrorData),
    DocumentUpdated(DocumentUpdatedData),
    DomSetChildNodes(SetChildNodesData),
    DomAttributeModified(AttributeModifiedData),
    DomCharacterDataModified(CharacterDataModifiedData),
    Click(Box<ClickData>),
}

impl RecordedEvent {
    pub fn new(timestamp: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            timestamp: timestamp.into(),
            payload,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    pub fn is_masked(&self) -> bool {
        self.payload.is_masked()
    }
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::ConsoleLog(_) => EventType::ConsoleLog,
            EventPayload::JsError(_) => EventType::JsError,
            EventPayload::DocumentUpdated(_) => EventType::DocumentUpdated,
            EventPayload::DomSetChildNodes(_) => EventType::DomSetChildNodes,
            EventPayload::DomAttributeModified(_) => EventType::DomAttributeModified,
            EventPayload::DomCharacterDataModified(_) => EventType::DomCharacterDataModified,
            EventPayload::Click(_) => EventType::Click,
        }
    }

    /// True when the payload carries a `_masked` marker anywhere: on the
    /// attribute event itself or on any node of a child-node snapshot.
    pub fn is_masked(&self) -> bool {
        match self {
            EventPayload::DomAttributeModified(data) => data.masked,
            EventPayload::DomSetChildNodes(data) => data.nodes.iter().any(NodeSnapshot::is_masked),
            EventPayload::ConsoleLog(_)
            | EventPayload::JsError(_)
            | EventPayload::DocumentUpdated(_)
            | EventPayload::DomCharacterDataModified(_)
            | EventPayload::Click(_) => false,
        }
    }
}

impl Serialize for RecordedEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("RecordedEvent", 3)?;
        state.serialize_field("type", &self.event_type())?;
        state.serialize_field("timestamp", &self.timestamp)?;
        match &self.payload {
            EventPayload::ConsoleLog(data) => state.serialize_field("data", data)?,
            EventPayload::JsError(data) => state.serialize_field("data", data)?,
            EventPayload::DocumentUpdated(data) => state.serialize_field("data", data)?,
            EventPayload::DomSetChildNodes(data) => state.serialize_field("data", data)?,
            EventPayload::DomAttributeModified(data) => state.serialize_field("data", data)?,
            EventPayload::DomCharacterDataModified(data) => state.serialize_field("data", data)?,
            EventPayload::Click(data) => state.serialize_field("data", data)?,
        }
        state.end()
    }
}

#[derive(Deserialize)]
struct WireEvent {
    #[serde(rename = "type")]
    event_type: EventType,
    timestamp: String,
    #[serde(default)]
    data: Value,
}

impl TryFrom<WireEvent> for RecordedEvent {
    type Error = serde_json::Error;

    fn try_from(wire: WireEvent) -> Result<Self, Self::Error> {
        let WireEvent {
            event_type,
            timestamp,
            data,
        } = wire;
        let data = match data {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let payload = match event_type {
            EventType::ConsoleLog => EventPayload::ConsoleLog(serde_json::from_value(data)?),
            EventType::JsError => EventPayload::JsError(serde_json::from_value(data)?),
            EventType::DocumentUpdated => {
                EventPayload::DocumentUpdated(serde_json::from_value(data)?)
            }
            EventType::DomSetChildNodes => {
                EventPayload::DomSetChildNodes(serde_json::from_value(data)?)
            }
            EventType::DomAttributeModified => {
                EventPayload::DomAttributeModified(serde_json::from_value(data)?)
            }
            EventType::DomCharacterDataModified => {
                EventPayload::DomCharacterDataModified(serde_json::from_value(data)?)
            }
            EventType::Click => EventPayload::Click(Box::new(serde_json::from_value(data)?)),
        };
        Ok(Self { timestamp, payload })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleLogData {
    pub level: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceLocation {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "lineNumber", default)]
    pub line_number: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsErrorData {
    pub message: String,
    #[serde(default)]
    pub stack: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentUpdatedData {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetChildNodesData {
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub nodes: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeModifiedData {
    #[serde(default)]
    pub node_id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(rename = "_masked", default, skip_serializing_if = "std::ops::Not::not")]
    pub masked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterDataModifiedData {
    #[serde(default)]
    pub node_id: Option<i64>,
    #[serde(default)]
    pub character_data: Option<String>,
}

/// Payload posted by the in-page click tracker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClickData {
    pub tag_name: Option<String>,
    pub id: Option<String>,
    pub class_name: Option<String>,
    pub class_list: Vec<String>,
    pub attributes: IndexMap<String, String>,
    pub text_content: Option<String>,
    #[serde(rename = "innerHTML")]
    pub inner_html: Option<String>,
    pub xpath: Option<String>,
    pub css_selector: Option<String>,
    pub href: Option<String>,
    pub src: Option<String>,
    pub coordinates: Option<ClickCoordinates>,
    pub viewport: Option<ClickViewport>,
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClickCoordinates {
    pub x: f64,
    pub y: f64,
    pub page_x: f64,
    pub page_y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickViewport {
    pub width: f64,
    pub height: f64,
}

/// A DOM node as delivered by `DOM.setChildNodes`.
///
/// Only the fields masking needs are typed; everything else CDP sends is kept
/// verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    #[serde(rename = "nodeName", default)]
    pub node_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<AttributeList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NodeSnapshot>>,
    #[serde(rename = "_masked", default, skip_serializing_if = "std::ops::Not::not")]
    pub masked: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeSnapshot {
    pub fn is_masked(&self) -> bool {
        self.masked
            || self
                .children
                .as_deref()
                .is_some_and(|children| children.iter().any(NodeSnapshot::is_masked))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePair {
    pub name: String,
    pub value: String,
}

/// CDP encodes element attributes as one flat list `[name0, value0, name1,
/// value1, ...]`. The list is decoded into ordered pairs here and flattened
/// again on serialization, so stored recordings keep the wire layout.
///
/// A list with an odd number of tokens keeps its last token in `trailing`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeList {
    pairs: Vec<AttributePair>,
    trailing: Option<String>,
}

impl AttributeList {
    pub fn from_tokens<I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut pairs = Vec::new();
        let mut tokens = tokens.into_iter();
        let mut trailing = None;
        while let Some(name) = tokens.next() {
            match tokens.next() {
                Some(value) => pairs.push(AttributePair { name, value }),
                None => trailing = Some(name),
            }
        }
        Self { pairs, trailing }
    }

    pub fn pairs(&self) -> &[AttributePair] {
        &self.pairs
    }

    pub fn pairs_mut(&mut self) -> &mut [AttributePair] {
        &mut self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty() && self.trailing.is_none()
    }

    /// Tokens in their original positional order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.pairs
            .iter()
            .flat_map(|pair| [pair.name.as_str(), pair.value.as_str()])
            .chain(self.trailing.as_deref())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|pair| pair.name == name)
            .map(|pair| pair.value.as_str())
    }
}

impl Serialize for AttributeList {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let len = self.pairs.len() * 2 + usize::from(self.trailing.is_some());
        let mut seq = serializer.serialize_seq(Some(len))?;
        for token in self.tokens() {
            seq.serialize_element(token)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for AttributeList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tokens = Vec::<String>::deserialize(deserializer)?;
        Ok(Self::from_tokens(tokens))
    }
}
