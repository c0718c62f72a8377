//! Prompt constants.
//!
//! Default instructions used when the caller supplies none, and the template
//! that places retrieved passages under a delimited DOCUMENTS section.

/// Default instruction when retrieved passages are available.
pub const DEFAULT_INSTRUCTION: &str = "You are HeyRAG, a helpful and versatile assistant.
When documents are provided, answer using them whenever they are relevant.
When they are not relevant, answer from your general knowledge.
Answer precisely and concisely.";

/// Default instruction when retrieval produced nothing close enough.
pub const DEFAULT_INSTRUCTION_NO_DOCS: &str = "You are HeyRAG, a helpful and versatile assistant.
No documents are available for this conversation.
Answer from your general knowledge.
Answer precisely and concisely.";

/// Handlebars template for the system message when passages were retrieved.
pub const CONTEXT_TEMPLATE: &str = "{{instruction}}

--- DOCUMENTS ---
{{context}}
---";

/// Separator placed between passage texts inside the DOCUMENTS section.
pub const PASSAGE_SEPARATOR: &str = "\n\n";
