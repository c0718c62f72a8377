//! Conversations command handler.

use clap::Args;
use heyrag_core::{config::AppConfig, AppResult};
use heyrag_knowledge::{ConversationSummary, StoredMessage};

use crate::services;

/// List stored conversations, or show one
#[derive(Args, Debug)]
pub struct ConversationsCommand {
    /// Conversation to show in full
    pub id: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ConversationsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing conversations command");
        let store = services::conversation_store(config);

        match &self.id {
            Some(id) => {
                let messages = store.messages(id)?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&messages)?);
                } else {
                    for message in &messages {
                        println!("{}\n", format_message(message));
                    }
                }
            }
            None => {
                let conversations = store.list_conversations()?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&conversations)?);
                } else if conversations.is_empty() {
                    println!("No conversations yet");
                } else {
                    for conversation in &conversations {
                        println!("{}", format_summary(conversation));
                    }
                }
            }
        }

        Ok(())
    }
}

fn format_summary(conversation: &ConversationSummary) -> String {
    format!(
        "{}  {}  {}",
        conversation.id,
        conversation.created_at.format("%Y-%m-%d %H:%M"),
        conversation.title
    )
}

fn format_message(message: &StoredMessage) -> String {
    let mut out = format!("[{}] {}", message.role.as_str(), message.content);
    for source in &message.sources {
        out.push_str(&format!("\n    source: {} (chunk {})", source.filename, source.chunk_index));
    }
    out
}
