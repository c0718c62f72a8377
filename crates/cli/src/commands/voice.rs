//! Voice command handler.
//!
//! Replays recorded questions through full voice sessions. Each audio file
//! gets its own session; all sessions share one voice gate.

use anyhow::Context;
use clap::Args;
use heyrag_core::{config::AppConfig, AppResult};
use heyrag_knowledge::WireMessage;
use heyrag_llm::ChatOptions;
use heyrag_voice::{
    run_voice_session, CommandStt, CommandTts, FfmpegDecoder, Inbound, SessionOutcome,
    VoiceGate, VoiceService, VoiceSessionDeps, VoiceTransport,
};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use crate::services;

/// Answer spoken questions from audio files
#[derive(Args, Debug)]
pub struct VoiceCommand {
    /// Audio files, one question each (any format ffmpeg reads)
    #[arg(required = true)]
    pub audio: Vec<PathBuf>,

    /// Directory receiving event logs and synthesized WAV files
    #[arg(long, default_value = "heyrag-voice")]
    pub out_dir: PathBuf,

    /// Continue an existing conversation
    #[arg(long)]
    pub conversation: Option<String>,

    /// Temperature for response generation (0.0-2.0)
    #[arg(long)]
    pub temperature: Option<f32>,
}

impl VoiceCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing voice command for {} file(s)", self.audio.len());

        tokio::fs::create_dir_all(&self.out_dir)
            .await
            .with_context(|| format!("Failed to create output directory {:?}", self.out_dir))?;

        let deps = Arc::new(session_deps(config)?);
        let opening = self.config_message(config)?;

        let mut sessions = Vec::with_capacity(self.audio.len());
        for (index, path) in self.audio.iter().enumerate() {
            let audio = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read audio file {:?}", path))?;

            let label = session_label(index, path);
            let mut transport = FileTransport::create(&self.out_dir, &label, opening.clone(), audio)
                .await
                .with_context(|| format!("Failed to prepare output for {:?}", path))?;

            let deps = Arc::clone(&deps);
            let handle =
                tokio::spawn(async move { run_voice_session(&mut transport, &deps).await });
            sessions.push((path, handle));
        }

        let mut failed = 0;
        for (path, handle) in sessions {
            let outcome = handle.await.context("Voice session task failed")?;
            match &outcome {
                SessionOutcome::Completed { conversation_id } => {
                    println!("{}\tcompleted\t{}", path.display(), conversation_id)
                }
                other => {
                    failed += 1;
                    println!("{}\t{:?}", path.display(), other);
                }
            }
        }

        if failed > 0 {
            anyhow::bail!("{} of {} voice sessions did not complete", failed, self.audio.len());
        }

        Ok(())
    }

    /// The config frame every session opens with.
    fn config_message(&self, config: &AppConfig) -> anyhow::Result<String> {
        let mut options = ChatOptions::new();
        if let Some(temperature) = self.temperature {
            options.insert("temperature".to_string(), temperature.into());
        }

        let message = serde_json::json!({
            "type": "config",
            "model": config.ollama.model,
            "conversation_id": self.conversation,
            "options": options,
        });
        Ok(serde_json::to_string(&message)?)
    }
}

fn session_deps(config: &AppConfig) -> AppResult<VoiceSessionDeps> {
    let voice = &config.voice;
    let tts = Arc::new(CommandTts::new(&voice.tts_binary, &voice.tts_model));

    Ok(VoiceSessionDeps {
        gate: VoiceGate::new(),
        decoder: Arc::new(FfmpegDecoder::new(&voice.ffmpeg_binary)),
        stt: Arc::new(CommandStt::new(
            &voice.stt_binary,
            &voice.stt_model,
            &voice.stt_language,
        )),
        voice: VoiceService::new(services::rag_service(config)?, tts),
        conversations: services::conversation_store(config),
        instruction: config.rag.instruction.clone(),
        receive_timeout: voice.receive_timeout(),
        min_audio_bytes: voice.min_audio_bytes,
    })
}

/// Output file prefix for one input, unique within the run.
fn session_label(index: usize, path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    format!("{:02}-{}", index + 1, stem)
}

/// Transport fed from a file: a config frame, then the audio.
///
/// JSON frames go to `<label>.jsonl`, each binary frame to `<label>-NNN.wav`.
struct FileTransport {
    inbound: VecDeque<Inbound>,
    out_dir: PathBuf,
    label: String,
    events: tokio::fs::File,
    audio_files: usize,
}

impl FileTransport {
    async fn create(
        out_dir: &Path,
        label: &str,
        opening: String,
        audio: Vec<u8>,
    ) -> AppResult<Self> {
        let events = tokio::fs::File::create(out_dir.join(format!("{}.jsonl", label))).await?;

        Ok(Self {
            inbound: VecDeque::from([Inbound::Text(opening), Inbound::Binary(audio)]),
            out_dir: out_dir.to_path_buf(),
            label: label.to_string(),
            events,
            audio_files: 0,
        })
    }
}

#[async_trait::async_trait]
impl VoiceTransport for FileTransport {
    async fn receive(&mut self) -> AppResult<Option<Inbound>> {
        Ok(self.inbound.pop_front())
    }

    async fn send(&mut self, message: WireMessage) -> AppResult<()> {
        match message {
            WireMessage::Json(line) => {
                self.events.write_all(line.as_bytes()).await?;
                self.events.write_all(b"\n").await?;
            }
            WireMessage::Binary(audio) => {
                self.audio_files += 1;
                let path = self
                    .out_dir
                    .join(format!("{}-{:03}.wav", self.label, self.audio_files));
                tokio::fs::write(&path, audio).await?;
                tracing::debug!("Wrote {:?}", path);
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> AppResult<()> {
        self.events.flush().await?;
        Ok(())
    }
}
