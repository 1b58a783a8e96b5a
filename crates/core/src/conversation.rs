use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Where a user turn sits inside a scripted conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Opening,
    Development,
    Closure,
}

impl Default for InteractionKind {
    fn default() -> Self {
        Self::Development
    }
}

/// One scripted user turn: the message to send and the reply we expect back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    /// Unique identifier for this turn.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// The message sent to the agent under test.
    pub user_message: String,
    /// The reference (expected) reply the judges score against.
    pub reference_reply: String,
    /// Position of the turn in the conversation arc.
    #[serde(default)]
    pub interaction_kind: InteractionKind,
    /// Expected structured facts attached to this turn, if any.
    #[serde(default)]
    pub reference_metadata: Map<String, Value>,
    /// Facts extracted from the agent reply, populated after the call.
    #[serde(default)]
    pub generated_metadata: Map<String, Value>,
}

impl Interaction {
    /// Create a new interaction with a fresh id and no metadata.
    pub fn new(user_message: impl Into<String>, reference_reply: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_message: user_message.into(),
            reference_reply: reference_reply.into(),
            interaction_kind: InteractionKind::default(),
            reference_metadata: Map::new(),
            generated_metadata: Map::new(),
        }
    }

    /// Set the interaction kind.
    #[must_use]
    pub fn with_kind(mut self, kind: InteractionKind) -> Self {
        self.interaction_kind = kind;
        self
    }

    /// Attach reference metadata for this turn.
    #[must_use]
    pub fn with_reference_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.reference_metadata = metadata;
        self
    }
}

/// An ordered, scripted multi-turn dialog scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicConversation {
    /// Unique identifier for the scenario.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Short human-readable description of what the scenario covers.
    #[serde(default)]
    pub description: String,
    /// Free-form scenario details (tags, source, environment hints).
    #[serde(default)]
    pub details: Map<String, Value>,
    /// The turns, replayed strictly in order.
    pub interactions: Vec<Interaction>,
}

impl BasicConversation {
    /// Create a scenario from an ordered list of interactions.
    pub fn new(description: impl Into<String>, interactions: Vec<Interaction>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            details: Map::new(),
            interactions,
        }
    }
}

/// The simulator's input: an ordered collection of scenarios.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationBatch {
    pub conversations: Vec<BasicConversation>,
}

impl ConversationBatch {
    /// Create a batch from scenarios, preserving order.
    #[must_use]
    pub fn new(conversations: Vec<BasicConversation>) -> Self {
        Self { conversations }
    }

    /// Number of scenarios in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Whether the batch holds no scenarios.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interaction_defaults() {
        let i = Interaction::new("Hello", "Hi");
        assert_eq!(i.user_message, "Hello");
        assert_eq!(i.reference_reply, "Hi");
        assert_eq!(i.interaction_kind, InteractionKind::Development);
        assert!(i.reference_metadata.is_empty());
    }

    #[test]
    fn interaction_kind_serializes_snake_case() {
        let json = serde_json::to_string(&InteractionKind::Opening).unwrap();
        assert_eq!(json, "\"opening\"");
    }

    #[test]
    fn batch_deserializes_without_optional_fields() {
        let raw = serde_json::json!({
            "conversations": [{
                "interactions": [
                    {"user_message": "Hello", "reference_reply": "Hi"}
                ]
            }]
        });
        let batch: ConversationBatch = serde_json::from_value(raw).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.conversations[0].interactions.len(), 1);
    }

    #[test]
    fn batch_preserves_scenario_order() {
        let batch = ConversationBatch::new(vec![
            BasicConversation::new("first", vec![]),
            BasicConversation::new("second", vec![]),
        ]);
        assert_eq!(batch.conversations[0].description, "first");
        assert_eq!(batch.conversations[1].description, "second");
    }
}
