//! Speech-to-text capability.

use heyrag_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Timeout for STT process execution.
const STT_TIMEOUT: Duration = Duration::from_secs(120);

/// Transcribes a 16 kHz mono WAV file.
#[async_trait::async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> AppResult<String>;
}

/// whisper.cpp style binary; the transcript is read from stdout.
#[derive(Debug, Clone)]
pub struct CommandStt {
    binary_path: PathBuf,
    model_path: PathBuf,
    language: String,
}

impl CommandStt {
    pub fn new(
        binary_path: impl Into<PathBuf>,
        model_path: impl Into<PathBuf>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            binary_path: binary_path.into(),
            model_path: model_path.into(),
            language: language.into(),
        }
    }

    fn command(&self, audio: &Path) -> Command {
        let mut command = Command::new(&self.binary_path);

        // -m model, -l language, -f input file, -nt no timestamps
        command
            .arg("-m")
            .arg(&self.model_path)
            .arg("-l")
            .arg(&self.language)
            .arg("-nt")
            .arg("-f")
            .arg(audio)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait::async_trait]
impl SpeechToText for CommandStt {
    async fn transcribe(&self, audio: &Path) -> AppResult<String> {
        tracing::debug!(binary = %self.binary_path.display(), "Transcribing {}", audio.display());

        let output = tokio::time::timeout(STT_TIMEOUT, self.command(audio).output())
            .await
            .map_err(|_| {
                AppError::Upstream(format!(
                    "STT process timed out after {} seconds",
                    STT_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| AppError::Upstream(format!("Failed to run STT binary: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Upstream(format!("STT binary failed: {}", stderr)));
        }

        Ok(normalize_transcript(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Join the transcript lines into one trimmed string.
fn normalize_transcript(stdout: &str) -> String {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
