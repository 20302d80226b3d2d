use domtrace_protocol::AttributeModifiedData;
use domtrace_protocol::EventPayload;
use domtrace_protocol::NodeSnapshot;
use domtrace_protocol::RecordedEvent;
use domtrace_protocol::SetChildNodesData;

use crate::detector::SensitiveFieldDetector;

/// Replacement for every redacted value.
pub const REDACTION_TOKEN: &str = "***MASKED***";

/// Attribute names whose values are always redacted: exactly `value`, or
/// anything containing `password` or `secret`.
pub fn is_sensitive_attribute_name(name: &str) -> bool {
    let name = name.to_lowercase();
    name == "value" || name.contains("password") || name.contains("secret")
}

/// Rewrites events so no sensitive value survives into storage.
///
/// Applied once over the whole event list when a session stops. Events are
/// never dropped or reordered; only payload fields change and a `_masked`
/// marker is added.
#[derive(Debug, Clone, Default)]
pub struct MaskingEngine {
    detector: SensitiveFieldDetector,
}

impl MaskingEngine {
    pub fn new(detector: SensitiveFieldDetector) -> Self {
        Self { detector }
    }

    pub fn process(&self, event: RecordedEvent) -> RecordedEvent {
        let RecordedEvent { timestamp, payload } = event;
        let payload = match payload {
            EventPayload::DomAttributeModified(data) => {
                EventPayload::DomAttributeModified(mask_attribute(data))
            }
            EventPayload::DomSetChildNodes(data) => {
                EventPayload::DomSetChildNodes(self.mask_child_nodes(data))
            }
            // Text node content is not scanned.
            payload @ (EventPayload::DomCharacterDataModified(_)
            | EventPayload::ConsoleLog(_)
            | EventPayload::JsError(_)
            | EventPayload::DocumentUpdated(_)
            | EventPayload::Click(_)) => payload,
        };
        RecordedEvent { timestamp, payload }
    }

    pub fn process_all(&self, events: Vec<RecordedEvent>) -> Vec<RecordedEvent> {
        events.into_iter().map(|event| self.process(event)).collect()
    }

    fn mask_child_nodes(&self, mut data: SetChildNodesData) -> SetChildNodesData {
        for node in &mut data.nodes {
            self.mask_node_tree(node);
        }
        data
    }

    fn mask_node_tree(&self, node: &mut NodeSnapshot) {
        if self.detector.is_sensitive(node) {
            mask_node(node);
        }
        if let Some(children) = node.children.as_mut() {
            for child in children {
                self.mask_node_tree(child);
            }
        }
    }
}

fn mask_attribute(mut data: AttributeModifiedData) -> AttributeModifiedData {
    if is_sensitive_attribute_name(&data.name) {
        data.value = Some(REDACTION_TOKEN.to_string());
        data.masked = true;
    }
    data
}

/// Redacts every value whose name is sensitive. The node is flagged even
/// when no value was rewritten.
fn mask_node(node: &mut NodeSnapshot) {
    if let Some(attributes) = node.attributes.as_mut() {
        for pair in attributes.pairs_mut() {
            if is_sensitive_attribute_name(&pair.name) {
                pair.value = REDACTION_TOKEN.to_string();
            }
        }
    }
    node.masked = true;
}
