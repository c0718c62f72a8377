//! Configuration management for HeyRAG.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Defaults (local Ollama, local Chroma)
//! - Config files (.heyrag/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with conversation state stored in `.heyrag/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .heyrag/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Chat and embedding model server
    pub ollama: OllamaSettings,

    /// Vector store server
    pub chroma: ChromaSettings,

    /// Retrieval and prompt settings
    pub rag: RagSettings,

    /// Speech pipeline settings
    pub voice: VoiceSettings,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub json_logs: bool,
}

/// Ollama endpoint and model names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaSettings {
    pub url: String,
    pub model: String,
    pub embedding_model: String,
}

/// Chroma endpoint and collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChromaSettings {
    pub url: String,
    pub collection: String,
}

/// Retrieval and prompt settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSettings {
    /// Number of nearest passages requested from the vector store
    pub top_k: usize,

    /// Instruction replacing the default system prompt
    pub instruction: Option<String>,
}

/// Speech pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub ffmpeg_binary: PathBuf,
    pub stt_binary: PathBuf,
    pub stt_model: PathBuf,
    pub stt_language: String,
    pub tts_binary: PathBuf,
    pub tts_model: PathBuf,

    /// Seconds to wait for the config message and for the audio payload
    pub receive_timeout_secs: u64,

    /// Payloads shorter than this are rejected before transcription
    pub min_audio_bytes: usize,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceSection>,
    ollama: Option<OllamaSection>,
    chroma: Option<ChromaSection>,
    rag: Option<RagSection>,
    voice: Option<VoiceSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OllamaSection {
    url: Option<String>,
    model: Option<String>,
    embedding_model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ChromaSection {
    url: Option<String>,
    collection: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RagSection {
    top_k: Option<usize>,
    instruction: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSection {
    ffmpeg_binary: Option<PathBuf>,
    stt_binary: Option<PathBuf>,
    stt_model: Option<PathBuf>,
    stt_language: Option<String>,
    tts_binary: Option<PathBuf>,
    tts_model: Option<PathBuf>,
    receive_timeout_secs: Option<u64>,
    min_audio_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
        }
    }
}

impl Default for ChromaSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8001".to_string(),
            collection: "heyrag".to_string(),
        }
    }
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            instruction: None,
        }
    }
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            ffmpeg_binary: PathBuf::from("ffmpeg"),
            stt_binary: PathBuf::from("whisper-cli"),
            stt_model: PathBuf::from("models/ggml-large-v3-turbo.bin"),
            stt_language: "fr".to_string(),
            tts_binary: PathBuf::from("piper"),
            tts_model: PathBuf::from("models/fr_FR-siwis-medium.onnx"),
            receive_timeout_secs: 30,
            min_audio_bytes: 100,
        }
    }
}

impl VoiceSettings {
    /// Receive timeout as a `Duration`.
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_secs(self.receive_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            ollama: OllamaSettings::default(),
            chroma: ChromaSettings::default(),
            rag: RagSettings::default(),
            voice: VoiceSettings::default(),
            log_level: None,
            verbose: false,
            no_color: false,
            json_logs: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and environment variables.
    ///
    /// Environment variables:
    /// - `HEYRAG_WORKSPACE`: Override workspace path
    /// - `HEYRAG_CONFIG`: Path to config file
    /// - `HEYRAG_OLLAMA_URL`: Ollama base URL
    /// - `HEYRAG_MODEL`: Chat model identifier
    /// - `HEYRAG_EMBEDDING_MODEL`: Embedding model identifier
    /// - `HEYRAG_CHROMA_URL`: Chroma base URL
    /// - `HEYRAG_COLLECTION`: Chroma collection name
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], with the workspace and config file taken
    /// from the command line when given.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        let workspace =
            workspace.or_else(|| std::env::var_os("HEYRAG_WORKSPACE").map(PathBuf::from));
        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var_os("HEYRAG_CONFIG").map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.heyrag_dir().join("config.yaml"));

        if config_path.exists() {
            tracing::debug!("Loading config file {:?}", config_path);
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(url) = std::env::var("HEYRAG_OLLAMA_URL") {
            config.ollama.url = url;
        }

        if let Ok(model) = std::env::var("HEYRAG_MODEL") {
            config.ollama.model = model;
        }

        if let Ok(model) = std::env::var("HEYRAG_EMBEDDING_MODEL") {
            config.ollama.embedding_model = model;
        }

        if let Ok(url) = std::env::var("HEYRAG_CHROMA_URL") {
            config.chroma.url = url;
        }

        if let Ok(collection) = std::env::var("HEYRAG_COLLECTION") {
            config.chroma.collection = collection;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Merge YAML configuration text into a copy of this config.
    pub fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;
        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(ollama) = config_file.ollama {
            merge(&mut result.ollama.url, ollama.url);
            merge(&mut result.ollama.model, ollama.model);
            merge(&mut result.ollama.embedding_model, ollama.embedding_model);
        }

        if let Some(chroma) = config_file.chroma {
            merge(&mut result.chroma.url, chroma.url);
            merge(&mut result.chroma.collection, chroma.collection);
        }

        if let Some(rag) = config_file.rag {
            merge(&mut result.rag.top_k, rag.top_k);
            if rag.instruction.is_some() {
                result.rag.instruction = rag.instruction;
            }
        }

        if let Some(voice) = config_file.voice {
            let target = &mut result.voice;
            merge(&mut target.ffmpeg_binary, voice.ffmpeg_binary);
            merge(&mut target.stt_binary, voice.stt_binary);
            merge(&mut target.stt_model, voice.stt_model);
            merge(&mut target.stt_language, voice.stt_language);
            merge(&mut target.tts_binary, voice.tts_binary);
            merge(&mut target.tts_model, voice.tts_model);
            merge(&mut target.receive_timeout_secs, voice.receive_timeout_secs);
            merge(&mut target.min_audio_bytes, voice.min_audio_bytes);
        }

        if let Some(logging) = config_file.logging {
            if logging.level.is_some() {
                result.log_level = logging.level;
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            merge(&mut result.json_logs, logging.json);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        json_logs: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(model) = model {
            self.ollama.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if json_logs {
            self.json_logs = true;
        }

        self
    }

    /// Get the path to the .heyrag directory.
    pub fn heyrag_dir(&self) -> PathBuf {
        self.workspace.join(".heyrag")
    }

    /// Directory holding persisted conversations.
    pub fn conversations_dir(&self) -> PathBuf {
        self.heyrag_dir().join("conversations")
    }

    /// Ensure the .heyrag directory exists.
    pub fn ensure_heyrag_dir(&self) -> AppResult<()> {
        let heyrag_dir = self.heyrag_dir();
        if !heyrag_dir.exists() {
            std::fs::create_dir_all(&heyrag_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .heyrag directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> AppResult<()> {
        for (name, url) in [("ollama.url", &self.ollama.url), ("chroma.url", &self.chroma.url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AppError::Config(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }

        if self.ollama.model.trim().is_empty() {
            return Err(AppError::Config("ollama.model must not be empty".to_string()));
        }

        if self.ollama.embedding_model.trim().is_empty() {
            return Err(AppError::Config(
                "ollama.embeddingModel must not be empty".to_string(),
            ));
        }

        if self.rag.top_k == 0 {
            return Err(AppError::Config("rag.topK must be at least 1".to_string()));
        }

        if self.voice.receive_timeout_secs == 0 {
            return Err(AppError::Config(
                "voice.receiveTimeoutSecs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn merge<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}
