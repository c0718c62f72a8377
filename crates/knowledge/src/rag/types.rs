//! Streaming event model and RAG request/response types.

use futures::Stream;
use heyrag_core::{AppResult, SourceRef};
use heyrag_llm::{ChatMessage, ChatOptions};
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// One unit of a server-to-client answer sequence.
///
/// Within one request there is at most one `Sources` event and at most one
/// terminal event (`Error` or `Done`), which is always last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental answer text, in generation order
    Token { content: String },

    /// Deduplicated provenance of the answer
    Sources { content: Vec<SourceRef> },

    /// Synthesized speech for one completed sentence
    Audio {
        #[serde(skip)]
        content: Vec<u8>,
        sample_rate: u32,
    },

    /// What the speaker said (voice path)
    Transcription { text: String },

    /// Conversation the turn was stored under
    ConversationId { content: String },

    Error { content: String },

    Done,
}

/// A transport frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    Json(String),
    Binary(Vec<u8>),
}

impl StreamEvent {
    /// Whether no event may follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Done)
    }

    /// Serialize for a bidirectional transport.
    ///
    /// Audio goes out as raw bytes followed by an `audio_done` JSON frame
    /// carrying the sample rate; everything else is one JSON frame tagged
    /// by `type`.
    pub fn to_wire(&self) -> AppResult<Vec<WireMessage>> {
        match self {
            Self::Audio {
                content,
                sample_rate,
            } => {
                let done = serde_json::json!({ "type": "audio_done", "sample_rate": sample_rate });
                Ok(vec![
                    WireMessage::Binary(content.clone()),
                    WireMessage::Json(done.to_string()),
                ])
            }
            other => Ok(vec![WireMessage::Json(serde_json::to_string(other)?)]),
        }
    }
}

/// Fallible answer sequence, before the streaming boundary.
pub type EventStream = Pin<Box<dyn Stream<Item = AppResult<StreamEvent>> + Send>>;

/// Box an event stream, fixing its item type for `try_stream!` bodies.
pub fn boxed_events<S>(stream: S) -> EventStream
where
    S: Stream<Item = AppResult<StreamEvent>> + Send + 'static,
{
    Box::pin(stream)
}

/// Infallible sequence ending in `Done` or `Error`.
pub type SessionStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Parameters for one question.
#[derive(Debug, Clone)]
pub struct AskRequest {
    pub question: String,
    pub model: String,
    pub history: Vec<ChatMessage>,
    pub options: ChatOptions,

    /// System instruction override; `None` or empty selects the defaults
    pub instruction: Option<String>,
}

impl AskRequest {
    pub fn new(question: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            model: model.into(),
            history: Vec::new(),
            options: ChatOptions::new(),
            instruction: None,
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_instruction(mut self, instruction: Option<String>) -> Self {
        self.instruction = instruction;
        self
    }
}

/// Complete, non-streamed answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_frames(event: &StreamEvent) -> Vec<serde_json::Value> {
        event
            .to_wire()
            .unwrap()
            .into_iter()
            .filter_map(|frame| match frame {
                WireMessage::Json(text) => Some(serde_json::from_str(&text).unwrap()),
                WireMessage::Binary(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_token_and_sources_wire_shape() {
        let token = json_frames(&StreamEvent::Token {
            content: "Par".to_string(),
        });
        assert_eq!(token, vec![serde_json::json!({"type": "token", "content": "Par"})]);

        let sources = json_frames(&StreamEvent::Sources {
            content: vec![SourceRef {
                filename: "geo.pdf".to_string(),
                chunk_index: 0,
            }],
        });
        assert_eq!(
            sources,
            vec![serde_json::json!({
                "type": "sources",
                "content": [{"filename": "geo.pdf", "chunk_index": 0}]
            })]
        );
    }

    #[test]
    fn test_audio_is_binary_then_audio_done() {
        let frames = StreamEvent::Audio {
            content: vec![1, 2, 3],
            sample_rate: 22050,
        }
        .to_wire()
        .unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], WireMessage::Binary(vec![1, 2, 3]));
        let done: serde_json::Value = match &frames[1] {
            WireMessage::Json(text) => serde_json::from_str(text).unwrap(),
            WireMessage::Binary(_) => panic!("expected a JSON frame"),
        };
        assert_eq!(done, serde_json::json!({"type": "audio_done", "sample_rate": 22050}));
    }

    #[test]
    fn test_unit_and_renamed_variants() {
        assert_eq!(
            json_frames(&StreamEvent::Done),
            vec![serde_json::json!({"type": "done"})]
        );
        assert_eq!(
            json_frames(&StreamEvent::ConversationId {
                content: "abc".to_string()
            }),
            vec![serde_json::json!({"type": "conversation_id", "content": "abc"})]
        );
        assert_eq!(
            json_frames(&StreamEvent::Transcription {
                text: "Bonjour".to_string()
            }),
            vec![serde_json::json!({"type": "transcription", "text": "Bonjour"})]
        );
    }

    #[test]
    fn test_terminal_events() {
        assert!(StreamEvent::Done.is_terminal());
        assert!(StreamEvent::Error {
            content: "boom".to_string()
        }
        .is_terminal());
        assert!(!StreamEvent::Token {
            content: "x".to_string()
        }
        .is_terminal());
    }
}
