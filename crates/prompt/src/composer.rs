//! Prompt composer: system message, history, question.

use crate::types::{
    CONTEXT_TEMPLATE, DEFAULT_INSTRUCTION, DEFAULT_INSTRUCTION_NO_DOCS, PASSAGE_SEPARATOR,
};
use heyrag_core::{AppError, AppResult, Passage, SourceRef};
use heyrag_llm::ChatMessage;
use handlebars::Handlebars;
use std::collections::HashSet;

/// Compose the message log for one question.
///
/// The result is: one system message, then `history` in its original order,
/// then the new user message. With passages, the system message is the
/// instruction (or [`DEFAULT_INSTRUCTION`]) followed by every passage text
/// under a DOCUMENTS section; without passages it is the instruction (or
/// [`DEFAULT_INSTRUCTION_NO_DOCS`]) alone. An empty instruction counts as absent.
///
/// # Example
/// ```
/// use heyrag_core::Passage;
/// use heyrag_prompt::compose;
///
/// let passages = vec![Passage::new("Paris is the capital of France.", 0.2)];
/// let messages = compose("What is the capital of France?", &passages, &[], None).unwrap();
/// assert_eq!(messages.len(), 2);
/// assert!(messages[0].content.contains("--- DOCUMENTS ---"));
/// ```
pub fn compose(
    question: &str,
    passages: &[Passage],
    history: &[ChatMessage],
    instruction: Option<&str>,
) -> AppResult<Vec<ChatMessage>> {
    let instruction = instruction.filter(|text| !text.is_empty());

    let system = if passages.is_empty() {
        instruction.unwrap_or(DEFAULT_INSTRUCTION_NO_DOCS).to_string()
    } else {
        let context = passages
            .iter()
            .map(|passage| passage.text.as_str())
            .collect::<Vec<_>>()
            .join(PASSAGE_SEPARATOR);
        render_context(instruction.unwrap_or(DEFAULT_INSTRUCTION), &context)?
    };

    tracing::debug!(
        passages = passages.len(),
        history = history.len(),
        "Composed prompt"
    );

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system));
    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::user(question));
    Ok(messages)
}

/// Deduplicated provenance list keyed by `(filename, chunk_index)`, first-seen order.
pub fn extract_sources(passages: &[Passage]) -> Vec<SourceRef> {
    let mut seen = HashSet::new();
    passages
        .iter()
        .map(Passage::source_ref)
        .filter(|source| seen.insert(source.clone()))
        .collect()
}

/// Render the DOCUMENTS template.
fn render_context(instruction: &str, context: &str) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Passages are plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("context", CONTEXT_TEMPLATE)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render(
            "context",
            &serde_json::json!({ "instruction": instruction, "context": context }),
        )
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use heyrag_llm::Role;

    fn passage(text: &str, filename: &str, chunk_index: i64) -> Passage {
        Passage::new(text, 0.3)
            .with_metadata("filename", filename)
            .with_metadata("chunk_index", chunk_index)
    }

    #[test]
    fn test_compose_with_passages_uses_documents_section() {
        let passages = vec![
            passage("First passage.", "a.md", 0),
            passage("Second passage.", "b.md", 2),
        ];

        let messages = compose("Question?", &passages, &[], None).unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(
            messages[0].content,
            format!(
                "{}\n\n--- DOCUMENTS ---\nFirst passage.\n\nSecond passage.\n---",
                DEFAULT_INSTRUCTION
            )
        );
        assert_eq!(messages[1], ChatMessage::user("Question?"));
    }

    #[test]
    fn test_compose_without_passages_uses_no_docs_default() {
        let messages = compose("Question?", &[], &[], None).unwrap();
        assert_eq!(messages[0].content, DEFAULT_INSTRUCTION_NO_DOCS);
    }

    #[test]
    fn test_instruction_override() {
        let passages = vec![passage("Context.", "a.md", 0)];

        let with_docs = compose("Q", &passages, &[], Some("Talk like a pirate.")).unwrap();
        assert!(with_docs[0].content.starts_with("Talk like a pirate.\n\n--- DOCUMENTS ---"));

        let without_docs = compose("Q", &[], &[], Some("Talk like a pirate.")).unwrap();
        assert_eq!(without_docs[0].content, "Talk like a pirate.");

        let empty = compose("Q", &[], &[], Some("")).unwrap();
        assert_eq!(empty[0].content, DEFAULT_INSTRUCTION_NO_DOCS);
    }

    #[test]
    fn test_history_kept_in_order_between_system_and_question() {
        let history = vec![
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello!"),
            ChatMessage::user("Who are you?"),
            ChatMessage::assistant("An assistant."),
        ];

        let messages = compose("And now?", &[], &history, None).unwrap();

        assert_eq!(messages.len(), 6);
        assert_eq!(&messages[1..5], history.as_slice());
        assert_eq!(messages[5], ChatMessage::user("And now?"));
    }

    #[test]
    fn test_passage_text_is_not_html_escaped() {
        let passages = vec![passage("a < b && \"c\"", "a.md", 0)];
        let messages = compose("Q", &passages, &[], None).unwrap();
        assert!(messages[0].content.contains("a < b && \"c\""));
    }

    #[test]
    fn test_extract_sources_dedup_first_seen_order() {
        let passages = vec![
            passage("x", "b.md", 1),
            passage("y", "a.md", 0),
            passage("z", "b.md", 1),
            passage("w", "b.md", 2),
        ];

        let sources = extract_sources(&passages);
        let keys: Vec<_> = sources
            .iter()
            .map(|s| (s.filename.as_str(), s.chunk_index))
            .collect();
        assert_eq!(keys, vec![("b.md", 1), ("a.md", 0), ("b.md", 2)]);
    }

    #[test]
    fn test_extract_sources_empty() {
        assert!(extract_sources(&[]).is_empty());
    }
}
