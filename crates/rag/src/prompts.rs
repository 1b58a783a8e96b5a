//! Prompt builders for golden-answer generation.

use crate::generation::ChatMessage;

/// Hard cap on concatenated context characters.
pub const MAX_CONTEXT_CHARS: usize = 12_000;

/// Separator between selected chunks inside the CONTEXT block.
pub const CONTEXT_JOIN_SEPARATOR: &str = "\n\n---\n\n";

fn joined_context(selected_chunks: &[String]) -> String {
    let mut context = selected_chunks.join(CONTEXT_JOIN_SEPARATOR);
    if context.len() > MAX_CONTEXT_CHARS {
        // Truncate on a char boundary at or below the cap.
        let mut cut = MAX_CONTEXT_CHARS;
        while !context.is_char_boundary(cut) {
            cut -= 1;
        }
        context.truncate(cut);
    }
    context
}

/// Strict grounding prompt: answer only from CONTEXT, with the exact
/// not-found sentinel as the escape hatch.
#[must_use]
pub fn build_expected_answer_messages(
    selected_chunks: &[String],
    question: &str,
) -> Vec<ChatMessage> {
    let context = joined_context(selected_chunks);
    vec![
        ChatMessage::system(
            "You are a precise answer extractor. Answer the QUESTION strictly based on the \
             provided CONTEXT. Synthesize across multiple parts of the CONTEXT when needed. \
             Be concise and factual. If the answer truly isn't supported by the CONTEXT, \
             reply exactly: 'Not found in the provided context.'",
        ),
        ChatMessage::user(format!(
            "CONTEXT:\n{context}\n\nQUESTION:\n{question}\n\nAnswer using only the CONTEXT. \
             If the question asks for features/services/details, summarize precisely."
        )),
    ]
}

/// Gentler summarization prompt used when the strict prompt hits the
/// not-found sentinel despite non-empty context.
#[must_use]
pub fn build_fallback_expected_messages(
    selected_chunks: &[String],
    question: &str,
) -> Vec<ChatMessage> {
    let context = joined_context(selected_chunks);
    vec![
        ChatMessage::system(
            "Summarize the key facts from the CONTEXT that answer the QUESTION. Only use \
             information present in CONTEXT. If nothing relevant exists, reply exactly: \
             'Not found in the provided context.'",
        ),
        ChatMessage::user(format!(
            "CONTEXT:\n{context}\n\nQUESTION:\n{question}\n\nAnswer concisely using only the CONTEXT."
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_are_joined_with_separator() {
        let messages = build_expected_answer_messages(
            &["first chunk".to_owned(), "second chunk".to_owned()],
            "What?",
        );
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.contains("first chunk\n\n---\n\nsecond chunk"));
        assert!(messages[1].content.contains("QUESTION:\nWhat?"));
    }

    #[test]
    fn context_is_capped() {
        let big = "x".repeat(8_000);
        let messages = build_expected_answer_messages(&[big.clone(), big], "q");
        // 2 * 8000 + separator would exceed the cap.
        assert!(messages[1].content.len() < 8_000 * 2 + 200);
    }

    #[test]
    fn fallback_prompt_is_gentler() {
        let messages = build_fallback_expected_messages(&["chunk".to_owned()], "q");
        assert!(messages[0].content.starts_with("Summarize the key facts"));
    }
}
