//! Ask command handler.
//!
//! Streams a retrieval-augmented answer to stdout and records the exchange.

use clap::Args;
use futures::StreamExt;
use heyrag_core::{config::AppConfig, AppError, AppResult, SourceRef};
use heyrag_knowledge::{into_session_stream, AskRequest, StreamEvent, Transcript, Turn};
use heyrag_llm::ChatOptions;
use std::io::Write;

use crate::services;

/// Ask a question against the knowledge base
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Continue an existing conversation
    #[arg(long)]
    pub conversation: Option<String>,

    /// Temperature for response generation (0.0-2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Output stream events as JSON lines
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let question = self.question.trim();
        if question.is_empty() {
            return Err(AppError::Config("No question provided".to_string()));
        }

        let rag = services::rag_service(config)?;
        let conversations = services::conversation_store(config);

        let turn = Turn::begin(conversations.as_ref(), self.conversation.as_deref(), question)?;
        self.emit(&StreamEvent::ConversationId {
            content: turn.conversation_id.clone(),
        })?;

        let request = AskRequest::new(question, &config.ollama.model)
            .with_history(turn.history.clone())
            .with_options(self.options())
            .with_instruction(config.rag.instruction.clone());

        let mut events = into_session_stream(rag.ask_stream(request));
        let mut transcript = Transcript::default();

        while let Some(event) = events.next().await {
            match &event {
                StreamEvent::Error { content } => {
                    self.emit(&event)?;
                    return Err(AppError::Other(content.clone()));
                }
                StreamEvent::Done => turn.finish(conversations.as_ref(), &transcript)?,
                _ => transcript.observe(&event),
            }
            self.emit(&event)?;
        }

        Ok(())
    }

    fn options(&self) -> ChatOptions {
        let mut options = ChatOptions::new();
        if let Some(temperature) = self.temperature {
            options.insert("temperature".to_string(), temperature.into());
        }
        options
    }

    /// Write one event to stdout (JSON line) or as human-readable text.
    fn emit(&self, event: &StreamEvent) -> AppResult<()> {
        let mut stdout = std::io::stdout().lock();

        if self.json {
            writeln!(stdout, "{}", serde_json::to_string(event)?)?;
            return Ok(());
        }

        match event {
            StreamEvent::Token { content } => {
                write!(stdout, "{}", content)?;
                stdout.flush()?;
            }
            StreamEvent::Sources { content } => {
                writeln!(stdout)?;
                if !content.is_empty() {
                    writeln!(stdout, "\n{}", format_sources(content))?;
                }
            }
            StreamEvent::ConversationId { content } => eprintln!("Conversation: {}", content),
            StreamEvent::Error { .. }
            | StreamEvent::Done
            | StreamEvent::Audio { .. }
            | StreamEvent::Transcription { .. } => {}
        }

        Ok(())
    }
}

fn format_sources(sources: &[SourceRef]) -> String {
    let mut out = String::from("Sources:");
    for source in sources {
        out.push_str(&format!("\n  - {} (chunk {})", source.filename, source.chunk_index));
    }
    out
}
