//! CDP event -> [`CaptureSignal`] conversions.

use chromiumoxide::cdp::browser_protocol::dom::EventAttributeModified;
use chromiumoxide::cdp::browser_protocol::dom::EventCharacterDataModified;
use chromiumoxide::cdp::browser_protocol::dom::EventSetChildNodes;
use chromiumoxide::cdp::js_protocol::runtime::EventBindingCalled;
use chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled;
use chromiumoxide::cdp::js_protocol::runtime::EventExceptionThrown;
use chromiumoxide::cdp::js_protocol::runtime::RemoteObject;
use domtrace_core::CaptureSignal;
use domtrace_protocol::CharacterDataModifiedData;
use domtrace_protocol::NodeSnapshot;
use domtrace_protocol::SetChildNodesData;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::CLICK_BINDING;

pub(crate) fn console(event: &EventConsoleApiCalled) -> Option<CaptureSignal> {
    let level = wire_name(&event.r#type).unwrap_or_else(|| "log".to_string());
    let args = event.args.iter().map(render_remote_object).collect();
    let frame = event
        .stack_trace
        .as_ref()
        .and_then(|trace| trace.call_frames.first());
    Some(CaptureSignal::Console {
        level,
        args,
        text: None,
        url: frame.map(|frame| frame.url.clone()),
        line_number: frame.map(|frame| frame.line_number),
    })
}

pub(crate) fn exception(event: &EventExceptionThrown) -> Option<CaptureSignal> {
    let details = &event.exception_details;
    let description = details
        .exception
        .as_ref()
        .and_then(|exception| exception.description.clone());
    // An Error's description is its stack; the first line is the message.
    let message = description
        .as_deref()
        .and_then(|text| text.lines().next())
        .map(str::to_string)
        .unwrap_or_else(|| details.text.clone());
    Some(CaptureSignal::Error {
        message,
        stack: description,
    })
}

pub(crate) fn set_child_nodes(event: &EventSetChildNodes) -> Option<CaptureSignal> {
    let nodes = serde_json::to_value(&event.nodes)
        .and_then(serde_json::from_value::<Vec<NodeSnapshot>>);
    match nodes {
        Ok(nodes) => Some(CaptureSignal::SetChildNodes(SetChildNodesData {
            parent_id: Some(*event.parent_id.inner()),
            nodes,
        })),
        Err(err) => {
            warn!("dropping DOM.setChildNodes with unreadable nodes: {err}");
            None
        }
    }
}

pub(crate) fn attribute_modified(event: &EventAttributeModified) -> Option<CaptureSignal> {
    Some(CaptureSignal::AttributeModified {
        node_id: Some(*event.node_id.inner()),
        name: event.name.clone(),
        value: Some(event.value.clone()),
    })
}

pub(crate) fn character_data_modified(event: &EventCharacterDataModified) -> Option<CaptureSignal> {
    Some(CaptureSignal::CharacterDataModified(CharacterDataModifiedData {
        node_id: Some(*event.node_id.inner()),
        character_data: Some(event.character_data.clone()),
    }))
}

pub(crate) fn binding_called(event: &EventBindingCalled) -> Option<CaptureSignal> {
    (event.name == CLICK_BINDING).then(|| CaptureSignal::ClickBinding(event.payload.clone()))
}

/// Best-effort text for one console argument.
fn render_remote_object(object: &RemoteObject) -> String {
    match &object.value {
        Some(Value::String(text)) => text.clone(),
        Some(value) => value.to_string(),
        None => object
            .description
            .clone()
            .or_else(|| wire_name(&object.r#type))
            .unwrap_or_default(),
    }
}

/// The protocol spelling of a CDP enum value, e.g. `"warning"`.
fn wire_name<T: Serialize>(value: &T) -> Option<String> {
    match serde_json::to_value(value) {
        Ok(Value::String(name)) => Some(name),
        _ => None,
    }
}
