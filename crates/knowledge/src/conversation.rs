//! Conversation persistence.
//!
//! A conversation is an ordered log of user and assistant messages. The JSONL
//! store keeps `index.jsonl` (one summary per conversation) and one
//! `<id>.jsonl` message log per conversation.

use crate::rag::types::StreamEvent;
use chrono::{DateTime, Utc};
use heyrag_core::{AppError, AppResult, SourceRef};
use heyrag_llm::{ChatMessage, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use unicode_segmentation::UnicodeSegmentation;

/// Longest title, in graphemes, before truncation.
const TITLE_MAX_GRAPHEMES: usize = 50;

/// Stored conversation header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// One persisted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: Role,
    pub content: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceRef>,

    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Vec<SourceRef>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            sources,
            created_at: Utc::now(),
        }
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage::new(self.role, self.content.clone())
    }
}

/// Persistence collaborator for conversations.
pub trait ConversationStore: Send + Sync {
    fn create_conversation(&self, title: &str) -> AppResult<ConversationSummary>;

    /// Messages in insertion order. Unknown ids are `NotFound`.
    fn messages(&self, id: &str) -> AppResult<Vec<StoredMessage>>;

    /// Append a message. Unknown ids are `NotFound`.
    fn add_message(&self, id: &str, message: &StoredMessage) -> AppResult<()>;

    fn list_conversations(&self) -> AppResult<Vec<ConversationSummary>>;
}

/// Title for a conversation opened by `question`.
pub fn conversation_title(question: &str) -> String {
    let graphemes: Vec<&str> = question.graphemes(true).collect();
    if graphemes.len() > TITLE_MAX_GRAPHEMES {
        format!("{}...", graphemes[..TITLE_MAX_GRAPHEMES].concat())
    } else {
        question.to_string()
    }
}

/// A question bound to its conversation.
#[derive(Debug, Clone)]
pub struct Turn {
    pub conversation_id: String,

    /// Whether the conversation was opened by this turn
    pub created: bool,

    /// Messages preceding the question
    pub history: Vec<ChatMessage>,
}

impl Turn {
    /// Resolve (or open) the conversation, load its history, then record the
    /// question as a user message.
    pub fn begin(
        store: &dyn ConversationStore,
        conversation_id: Option<&str>,
        question: &str,
    ) -> AppResult<Self> {
        let (conversation_id, created) = match conversation_id {
            Some(id) => (id.to_string(), false),
            None => {
                let summary = store.create_conversation(&conversation_title(question))?;
                tracing::info!(conversation_id = %summary.id, "Opened conversation");
                (summary.id, true)
            }
        };

        let history = store
            .messages(&conversation_id)?
            .iter()
            .map(StoredMessage::to_chat_message)
            .collect();

        store.add_message(&conversation_id, &StoredMessage::user(question))?;

        Ok(Self {
            conversation_id,
            created,
            history,
        })
    }

    /// Record the assistant's answer.
    pub fn finish(&self, store: &dyn ConversationStore, transcript: &Transcript) -> AppResult<()> {
        store.add_message(
            &self.conversation_id,
            &StoredMessage::assistant(transcript.answer.clone(), transcript.sources.clone()),
        )
    }
}

/// Answer text and sources gathered from a stream of events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

impl Transcript {
    pub fn observe(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Token { content } => self.answer.push_str(content),
            StreamEvent::Sources { content } => self.sources = content.clone(),
            _ => {}
        }
    }
}

/// JSONL-backed store under one directory.
pub struct JsonlConversationStore {
    dir: PathBuf,
}

impl JsonlConversationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join("index.jsonl")
    }

    /// Message log path; ids that are not UUIDs cannot name a conversation.
    fn log_path(&self, id: &str) -> AppResult<PathBuf> {
        uuid::Uuid::parse_str(id)
            .map_err(|_| AppError::NotFound(format!("conversation '{}'", id)))?;
        Ok(self.dir.join(format!("{}.jsonl", id)))
    }

    fn existing_log_path(&self, id: &str) -> AppResult<PathBuf> {
        let path = self.log_path(id)?;
        if !path.exists() {
            return Err(AppError::NotFound(format!("conversation '{}'", id)));
        }
        Ok(path)
    }
}

fn append_line<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", serde_json::to_string(value)?)?;
    file.sync_all()?;
    Ok(())
}

fn read_lines<T: serde::de::DeserializeOwned>(path: &Path) -> AppResult<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut items = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let item = serde_json::from_str(&line).map_err(|e| {
            AppError::Serialization(format!(
                "Failed to parse line {} in {}: {}",
                line_num + 1,
                path.display(),
                e
            ))
        })?;
        items.push(item);
    }

    Ok(items)
}

impl ConversationStore for JsonlConversationStore {
    fn create_conversation(&self, title: &str) -> AppResult<ConversationSummary> {
        let summary = ConversationSummary {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            created_at: Utc::now(),
        };

        std::fs::create_dir_all(&self.dir)?;
        File::create(self.log_path(&summary.id)?)?;
        append_line(&self.index_path(), &summary)?;

        tracing::debug!(id = %summary.id, "Created conversation");
        Ok(summary)
    }

    fn messages(&self, id: &str) -> AppResult<Vec<StoredMessage>> {
        read_lines(&self.existing_log_path(id)?)
    }

    fn add_message(&self, id: &str, message: &StoredMessage) -> AppResult<()> {
        append_line(&self.existing_log_path(id)?, message)
    }

    fn list_conversations(&self) -> AppResult<Vec<ConversationSummary>> {
        let mut conversations: Vec<ConversationSummary> = read_lines(&self.index_path())?;
        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(conversations)
    }
}

/// Store kept in memory, for tests and one-shot runs.
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: Mutex<Vec<ConversationSummary>>,
    messages: Mutex<HashMap<String, Vec<StoredMessage>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> AppError {
    AppError::Other("conversation store lock poisoned".to_string())
}

impl ConversationStore for InMemoryConversationStore {
    fn create_conversation(&self, title: &str) -> AppResult<ConversationSummary> {
        let summary = ConversationSummary {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            created_at: Utc::now(),
        };

        self.messages
            .lock()
            .map_err(poisoned)?
            .insert(summary.id.clone(), Vec::new());
        self.conversations
            .lock()
            .map_err(poisoned)?
            .push(summary.clone());

        Ok(summary)
    }

    fn messages(&self, id: &str) -> AppResult<Vec<StoredMessage>> {
        self.messages
            .lock()
            .map_err(poisoned)?
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("conversation '{}'", id)))
    }

    fn add_message(&self, id: &str, message: &StoredMessage) -> AppResult<()> {
        self.messages
            .lock()
            .map_err(poisoned)?
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("conversation '{}'", id)))?
            .push(message.clone());
        Ok(())
    }

    fn list_conversations(&self) -> AppResult<Vec<ConversationSummary>> {
        let mut conversations = self.conversations.lock().map_err(poisoned)?.clone();
        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(conversations)
    }
}
