//! One voice round-trip over a bidirectional transport.
//!
//! The client sends a JSON config, then one binary audio payload. Once both
//! are in hand the session takes the voice gate, transcribes, answers with
//! interleaved audio, stores the exchange and reports `done`.

use crate::decode::AudioDecoder;
use crate::gate::VoiceGate;
use crate::overlay::VoiceService;
use crate::stt::SpeechToText;
use futures::StreamExt;
use heyrag_core::{AppError, AppResult};
use heyrag_knowledge::{
    into_session_stream, AskRequest, ConversationStore, StreamEvent, Transcript, Turn,
    WireMessage,
};
use heyrag_llm::ChatOptions;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Where a session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingConfig,
    AwaitingAudio,
    Transcribing,
    Streaming,
    Completed,
    Failed,
}

/// First client message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoiceConfig {
    pub model: String,

    #[serde(default)]
    pub conversation_id: Option<String>,

    #[serde(default)]
    pub options: ChatOptions,
}

/// A frame received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Binary(Vec<u8>),
}

/// Bidirectional message channel to one client.
#[async_trait::async_trait]
pub trait VoiceTransport: Send {
    /// Next frame, or `None` once the client has gone away.
    async fn receive(&mut self) -> AppResult<Option<Inbound>>;

    async fn send(&mut self, message: WireMessage) -> AppResult<()>;

    async fn close(&mut self) -> AppResult<()>;
}

/// Collaborators shared by every voice session.
#[derive(Clone)]
pub struct VoiceSessionDeps {
    pub gate: VoiceGate,
    pub decoder: Arc<dyn AudioDecoder>,
    pub stt: Arc<dyn SpeechToText>,
    pub voice: VoiceService,
    pub conversations: Arc<dyn ConversationStore>,

    /// System instruction override for answers
    pub instruction: Option<String>,

    /// Wait for each of config and audio
    pub receive_timeout: Duration,

    /// Shorter audio payloads are rejected
    pub min_audio_bytes: usize,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed { conversation_id: String },

    /// Input refused; the message was sent to the client
    Rejected(String),

    /// The client stayed silent too long
    TimedOut,

    Disconnected,

    /// A collaborator failed; the message was sent to the client
    Failed(String),
}

impl SessionOutcome {
    pub fn state(&self) -> SessionState {
        match self {
            Self::Completed { .. } => SessionState::Completed,
            _ => SessionState::Failed,
        }
    }
}

/// Why a session stopped early.
///
/// `Timeout` errors end the session quietly, `UnsupportedInput` errors are
/// rejections and anything else is a failure.
enum Stop {
    Disconnected,
    Error(AppError),
}

impl From<AppError> for Stop {
    fn from(e: AppError) -> Self {
        Stop::Error(e)
    }
}

fn reject(message: impl Into<String>) -> Stop {
    Stop::Error(AppError::UnsupportedInput(message.into()))
}

/// Run one voice session to completion.
///
/// Never returns an error: every failure is reported to the client (except
/// timeouts and disconnects) and the transport is closed.
pub async fn run_voice_session<T>(transport: &mut T, deps: &VoiceSessionDeps) -> SessionOutcome
where
    T: VoiceTransport + ?Sized,
{
    let mut state = SessionState::AwaitingConfig;

    let outcome = match drive(transport, deps, &mut state).await {
        Ok(conversation_id) => SessionOutcome::Completed { conversation_id },
        Err(Stop::Disconnected) => {
            tracing::info!(?state, "Voice client disconnected");
            SessionOutcome::Disconnected
        }
        Err(Stop::Error(AppError::Timeout(waiting))) => {
            tracing::warn!(?state, "Voice session timed out {}", waiting);
            SessionOutcome::TimedOut
        }
        Err(Stop::Error(AppError::UnsupportedInput(message))) => {
            tracing::info!(?state, "Voice session rejected: {}", message);
            send_error(transport, &message).await;
            SessionOutcome::Rejected(message)
        }
        Err(Stop::Error(e)) => {
            let message = e.to_string();
            tracing::error!(?state, "Voice session failed: {}", message);
            send_error(transport, &message).await;
            SessionOutcome::Failed(message)
        }
    };

    transition(&mut state, outcome.state());
    if let Err(e) = transport.close().await {
        tracing::debug!("Failed to close voice transport: {}", e);
    }

    outcome
}

async fn drive<T>(
    transport: &mut T,
    deps: &VoiceSessionDeps,
    state: &mut SessionState,
) -> Result<String, Stop>
where
    T: VoiceTransport + ?Sized,
{
    let config = match receive(transport, deps.receive_timeout, "config").await? {
        Inbound::Text(text) => parse_config(&text)?,
        Inbound::Binary(_) => return Err(reject("first message must be config")),
    };

    transition(state, SessionState::AwaitingAudio);
    let audio = match receive(transport, deps.receive_timeout, "audio").await? {
        Inbound::Binary(audio) => audio,
        Inbound::Text(_) => return Err(reject("expected audio")),
    };
    if audio.len() < deps.min_audio_bytes {
        return Err(reject("audio too short"));
    }

    let _permit = deps.gate.acquire().await?;

    transition(state, SessionState::Transcribing);
    let wav = deps.decoder.to_wav(&audio).await?;
    let text = deps.stt.transcribe(&wav).await?;
    drop(wav);

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(reject("no speech detected"));
    }
    send_event(transport, &StreamEvent::Transcription { text: text.clone() }).await?;

    let turn = Turn::begin(
        deps.conversations.as_ref(),
        config.conversation_id.as_deref(),
        &text,
    )?;
    if turn.created {
        let event = StreamEvent::ConversationId {
            content: turn.conversation_id.clone(),
        };
        send_event(transport, &event).await?;
    }

    transition(state, SessionState::Streaming);
    let request = AskRequest::new(text, config.model)
        .with_history(turn.history.clone())
        .with_options(config.options)
        .with_instruction(deps.instruction.clone());

    let mut events = into_session_stream(deps.voice.ask_stream_voice(request));
    let mut transcript = Transcript::default();

    while let Some(event) = events.next().await {
        match event {
            StreamEvent::Error { content } => return Err(AppError::Other(content).into()),
            StreamEvent::Done => {
                turn.finish(deps.conversations.as_ref(), &transcript)?;
                send_event(transport, &StreamEvent::Done).await?;
            }
            event => {
                transcript.observe(&event);
                send_event(transport, &event).await?;
            }
        }
    }

    Ok(turn.conversation_id)
}

fn transition(state: &mut SessionState, next: SessionState) {
    tracing::info!(from = ?*state, to = ?next, "Voice session state");
    *state = next;
}

fn parse_config(text: &str) -> AppResult<VoiceConfig> {
    let not_config = || AppError::UnsupportedInput("first message must be config".to_string());

    let value: serde_json::Value = serde_json::from_str(text).map_err(|_| not_config())?;
    if value.get("type").and_then(|t| t.as_str()) != Some("config") {
        return Err(not_config());
    }

    serde_json::from_value(value)
        .map_err(|e| AppError::UnsupportedInput(format!("invalid config: {}", e)))
}

async fn receive<T>(
    transport: &mut T,
    timeout: Duration,
    waiting_for: &str,
) -> Result<Inbound, Stop>
where
    T: VoiceTransport + ?Sized,
{
    match tokio::time::timeout(timeout, transport.receive()).await {
        Err(_) => Err(AppError::Timeout(format!("waiting for {}", waiting_for)).into()),
        Ok(Ok(Some(message))) => Ok(message),
        Ok(Ok(None)) => Err(Stop::Disconnected),
        Ok(Err(e)) => Err(e.into()),
    }
}

async fn send_event<T>(transport: &mut T, event: &StreamEvent) -> AppResult<()>
where
    T: VoiceTransport + ?Sized,
{
    for frame in event.to_wire()? {
        transport.send(frame).await?;
    }
    Ok(())
}

/// Best effort; the client may already be gone.
async fn send_error<T>(transport: &mut T, message: &str)
where
    T: VoiceTransport + ?Sized,
{
    let event = StreamEvent::Error {
        content: message.to_string(),
    };
    if let Err(e) = send_event(transport, &event).await {
        tracing::debug!("Could not report error to voice client: {}", e);
    }
}
