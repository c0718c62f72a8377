//! Audio decoding to the format speech recognition expects.

use heyrag_core::{AppError, AppResult};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempPath;
use tokio::process::Command;

/// Timeout for the transcoding process.
const DECODE_TIMEOUT: Duration = Duration::from_secs(60);

/// Sample rate of decoded audio, in Hz.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Turns an uploaded recording (any container) into a 16 kHz mono WAV file.
///
/// The file is deleted when the returned path is dropped.
#[async_trait::async_trait]
pub trait AudioDecoder: Send + Sync {
    async fn to_wav(&self, audio: &[u8]) -> AppResult<TempPath>;
}

/// ffmpeg-backed decoder.
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    binary_path: PathBuf,
}

impl FfmpegDecoder {
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }
}

fn temp_path(suffix: &str) -> AppResult<TempPath> {
    Ok(tempfile::Builder::new()
        .prefix("heyrag-voice-")
        .suffix(suffix)
        .tempfile()?
        .into_temp_path())
}

#[async_trait::async_trait]
impl AudioDecoder for FfmpegDecoder {
    async fn to_wav(&self, audio: &[u8]) -> AppResult<TempPath> {
        let input = temp_path(".input")?;
        tokio::fs::write(&input, audio).await?;
        let output = temp_path(".wav")?;

        let result = Command::new(&self.binary_path)
            .arg("-y")
            .arg("-i")
            .arg(input.as_os_str())
            .arg("-ar")
            .arg(TARGET_SAMPLE_RATE.to_string())
            .arg("-ac")
            .arg("1")
            .arg(output.as_os_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let result = tokio::time::timeout(DECODE_TIMEOUT, result)
            .await
            .map_err(|_| {
                AppError::Upstream(format!(
                    "ffmpeg timed out after {} seconds",
                    DECODE_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| AppError::Upstream(format!("Failed to run ffmpeg: {}", e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(AppError::Upstream(format!("ffmpeg failed: {}", stderr.trim())));
        }

        tracing::debug!(input_bytes = audio.len(), "Decoded audio to {}", output.display());
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_upstream_error() {
        let decoder = FfmpegDecoder::new("/nonexistent/ffmpeg");
        let result = decoder.to_wav(&[0u8; 256]).await;
        assert!(matches!(result, Err(AppError::Upstream(_))));
    }

    #[test]
    fn test_temp_path_removed_on_drop() {
        let path = temp_path(".wav").unwrap();
        let kept = path.to_path_buf();
        assert!(kept.exists());
        drop(path);
        assert!(!kept.exists());
    }
}
