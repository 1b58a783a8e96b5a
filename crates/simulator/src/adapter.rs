//! Response adapter: collapse heterogeneous agent response bodies into a
//! single plain-text reply.

use serde_json::Value;

use levelapp_core::canonical_json;

/// JSON paths probed in order, covering the common agent response shapes.
const REPLY_POINTERS: &[&str] = &[
    "/content",
    "/message",
    "/payload/message",
    "/choices/0/message/content",
    "/output/text",
    "/response/content",
    "/data/0/text",
];

/// Return the human-visible content from any agent response body.
///
/// JSON bodies are probed at the fixed path list, then fall back to the
/// first non-empty string leaf anywhere in the structure; non-JSON bodies
/// are returned trimmed; JSON with no string content at all is returned as
/// its canonical encoding.
#[must_use]
pub fn adapt_agent_response(body: &str) -> String {
    let trimmed = body.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return trimmed.to_owned();
    }
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return trimmed.to_owned();
    };

    for pointer in REPLY_POINTERS {
        if let Some(reply) = value.pointer(pointer).and_then(Value::as_str)
            && !reply.trim().is_empty()
        {
            return reply.to_owned();
        }
    }

    if let Some(leaf) = first_string_leaf(&value) {
        return leaf;
    }

    canonical_json(&value)
}

/// Depth-first search for the first non-empty string leaf.
fn first_string_leaf(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(map) => map.values().find_map(first_string_leaf),
        Value::Array(items) => items.iter().find_map(first_string_leaf),
        _ => None,
    }
}
