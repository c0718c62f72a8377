//! Text-to-speech capability.

use heyrag_core::{AppError, AppResult};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Maximum text input size for TTS (64 KiB).
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Timeout for TTS process execution.
const TTS_TIMEOUT: Duration = Duration::from_secs(60);

/// Synthesizes speech, returning the audio bytes and their sample rate.
#[async_trait::async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(&self, text: &str) -> AppResult<(Vec<u8>, u32)>;
}

/// piper style binary: text on stdin, WAV file out.
#[derive(Debug, Clone)]
pub struct CommandTts {
    binary_path: PathBuf,
    model_path: PathBuf,
}

impl CommandTts {
    pub fn new(binary_path: impl Into<PathBuf>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            model_path: model_path.into(),
        }
    }
}

/// Sample rate from a RIFF/WAVE header.
pub fn wav_sample_rate(wav: &[u8]) -> AppResult<u32> {
    if wav.len() < 28 || &wav[0..4] != b"RIFF" || &wav[8..12] != b"WAVE" {
        return Err(AppError::Upstream("TTS output is not a WAV file".to_string()));
    }
    Ok(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]))
}

#[async_trait::async_trait]
impl TextToSpeech for CommandTts {
    async fn synthesize(&self, text: &str) -> AppResult<(Vec<u8>, u32)> {
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(AppError::UnsupportedInput(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_TTS_INPUT_BYTES
            )));
        }

        let output_path = tempfile::Builder::new()
            .prefix("heyrag-tts-")
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();

        let mut child = Command::new(&self.binary_path)
            .arg("--model")
            .arg(&self.model_path)
            .arg("--output_file")
            .arg(output_path.as_os_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::Upstream(format!("Failed to spawn TTS binary: {}", e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::Upstream("Failed to open TTS stdin".to_string()))?;
        let text_owned = text.to_string();

        // Feed stdin while waiting on the child
        let write_task = tokio::spawn(async move {
            stdin.write_all(text_owned.as_bytes()).await?;
            stdin.shutdown().await
        });

        let output = tokio::time::timeout(TTS_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| {
                AppError::Upstream(format!(
                    "TTS process timed out after {} seconds",
                    TTS_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| AppError::Upstream(format!("Failed to wait for TTS binary: {}", e)))?;

        match write_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(AppError::Upstream(format!(
                    "Failed to write to TTS stdin: {}",
                    e
                )))
            }
            Err(e) => return Err(AppError::Upstream(format!("Stdin task failed: {}", e))),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Upstream(format!("TTS binary failed: {}", stderr)));
        }

        let audio = tokio::fs::read(&output_path).await?;
        let sample_rate = wav_sample_rate(&audio)?;

        tracing::debug!(bytes = audio.len(), sample_rate, "Synthesized sentence");
        Ok((audio, sample_rate))
    }
}
