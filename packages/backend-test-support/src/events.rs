//! Helpers over events in their JSON wire form.

use serde_json::Value;

/// The `type` discriminator of a wire event, or `""` when absent.
pub fn event_type(event: &Value) -> &str {
    event.get("type").and_then(Value::as_str).unwrap_or("")
}

/// Discriminators of a sequence of events, in order.
pub fn event_types(events: &[Value]) -> Vec<String> {
    events.iter().map(|e| event_type(e).to_string()).collect()
}

/// First event with the given discriminator.
pub fn find_event<'a>(events: &'a [Value], kind: &str) -> Option<&'a Value> {
    events.iter().find(|e| event_type(e) == kind)
}

/// Panic with the full event list when `kind` is missing.
pub fn expect_event<'a>(events: &'a [Value], kind: &str) -> &'a Value {
    match find_event(events, kind) {
        Some(event) => event,
        None => panic!("expected a '{kind}' event, got {:?}", event_types(events)),
    }
}
