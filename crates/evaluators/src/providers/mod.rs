//! Built-in judge provider families.
//!
//! Each judge implements the two-operation [`Judge`](crate::judge::Judge)
//! contract over its provider's wire format. New families plug into the
//! service registry without touching dispatch code.

mod claude;
mod generic;
mod ionos;
mod mistral;
mod openai;

pub use claude::ClaudeJudge;
pub use generic::GenericApiJudge;
pub use ionos::IonosJudge;
pub use mistral::MistralJudge;
pub use openai::OpenAiJudge;

use serde_json::Value;

/// Merge token-usage metadata into a parsed judge output, creating the
/// `metadata` object if the model omitted it.
pub(crate) fn attach_metadata(parsed: &mut Value, entries: Vec<(&str, Value)>) {
    let Value::Object(map) = parsed else { return };
    let metadata = map
        .entry("metadata")
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    if let Value::Object(meta) = metadata {
        for (key, value) in entries {
            if !value.is_null() {
                meta.insert(key.to_owned(), value);
            }
        }
    }
}
