use std::collections::BTreeMap;

use domtrace_protocol::EventType;
use domtrace_protocol::RecordedEvent;
use serde::Deserialize;
use serde::Serialize;

/// Aggregate counts over a stored event list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub total_events: usize,
    pub event_types: BTreeMap<String, usize>,
    pub console_logs: usize,
    pub js_errors: usize,
    pub dom_mutations: usize,
    pub clicks: usize,
    pub masked_events: usize,
}

pub fn analyze(events: &[RecordedEvent]) -> RecordingSummary {
    let mut summary = RecordingSummary {
        total_events: events.len(),
        ..Default::default()
    };
    for event in events {
        let kind = event.event_type();
        *summary.event_types.entry(kind.to_string()).or_insert(0) += 1;
        match kind {
            EventType::ConsoleLog => summary.console_logs += 1,
            EventType::JsError => summary.js_errors += 1,
            EventType::Click => summary.clicks += 1,
            kind if kind.is_dom_mutation() => summary.dom_mutations += 1,
            _ => {}
        }
        if event.is_masked() {
            summary.masked_events += 1;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masking::MaskingEngine;
    use domtrace_protocol::AttributeModifiedData;
    use domtrace_protocol::DocumentUpdatedData;
    use domtrace_protocol::EventPayload;
    use domtrace_protocol::JsErrorData;
    use pretty_assertions::assert_eq;

    #[test]
    fn counts_every_category() {
        let attribute = |name: &str| {
            RecordedEvent::new(
                "t",
                EventPayload::DomAttributeModified(AttributeModifiedData {
                    node_id: Some(1),
                    name: name.to_string(),
                    value: Some("v".to_string()),
                    masked: false,
                }),
            )
        };
        let events = MaskingEngine::default().process_all(vec![
            attribute("password"),
            attribute("class"),
            RecordedEvent::new("t", EventPayload::DocumentUpdated(DocumentUpdatedData {})),
            RecordedEvent::new(
                "t",
                EventPayload::JsError(JsErrorData {
                    message: "boom".to_string(),
                    stack: None,
                }),
            ),
        ]);

        let summary = analyze(&events);
        assert_eq!(
            summary,
            RecordingSummary {
                total_events: 4,
                event_types: BTreeMap::from([
                    ("document_updated".to_string(), 1),
                    ("dom_attribute_modified".to_string(), 2),
                    ("js_error".to_string(), 1),
                ]),
                console_logs: 0,
                js_errors: 1,
                dom_mutations: 2,
                clicks: 0,
                masked_events: 1,
            }
        );
    }

    #[test]
    fn empty_input_yields_zeroes() {
        assert_eq!(analyze(&[]), RecordingSummary::default());
    }
}
