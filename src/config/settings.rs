//! Configuration settings for Lese.

use crate::error::{LeseError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub generation: GenerationSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub vector_store: VectorStoreSettings,
    pub retrieval: RetrievalSettings,
    pub prompts: PromptSettings,
}


/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.lese".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Generation backend type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// Local Ollama server via its OpenAI-compatible endpoint (default).
    #[default]
    Ollama,
    /// OpenAI API.
    OpenAI,
}

impl std::str::FromStr for GenerationProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" | "local" => Ok(GenerationProvider::Ollama),
            "openai" => Ok(GenerationProvider::OpenAI),
            _ => Err(format!("Unknown generation provider: {}", s)),
        }
    }
}

impl std::fmt::Display for GenerationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationProvider::Ollama => write!(f, "ollama"),
            GenerationProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Generation backend (ollama, openai).
    pub provider: GenerationProvider,
    /// Base URL override for the backend. Defaults to the local Ollama
    /// endpoint for the ollama provider.
    pub base_url: Option<String>,
    /// Chat model used for answer generation.
    pub model: String,
    /// Sampling temperature. Low values keep answers close to the context.
    pub temperature: f32,
    /// Maximum prior conversation turns included in the chat prompt.
    pub history_turns: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::Ollama,
            base_url: None,
            model: "llama3.2".to_string(),
            temperature: 0.3,
            history_turns: 3,
        }
    }
}

impl GenerationSettings {
    /// Effective base URL for the configured backend, if any.
    pub fn effective_base_url(&self) -> Option<String> {
        match (&self.base_url, &self.provider) {
            (Some(url), _) => Some(url.clone()),
            (None, GenerationProvider::Ollama) => {
                Some("http://localhost:11434/v1".to_string())
            }
            (None, GenerationProvider::OpenAI) => None,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions. Must match the vectors already stored in a
    /// collection; a mismatch is surfaced at embed time, never ignored.
    pub dimensions: u32,
    /// Number of chunk texts sent per embedding request.
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            batch_size: 64,
        }
    }
}

/// Text chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between adjacent chunks in characters.
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.lese/vectors.db".to_string(),
        }
    }
}

/// Retrieval and reranking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of chunks returned to the answer composer.
    pub top_k: usize,
    /// Over-fetch multiplier applied when reranking is enabled, so the
    /// reranker has a wider candidate pool than the final result.
    pub overfetch_factor: usize,
    /// Minimum similarity score for candidates (0.0-1.0).
    pub min_score: f32,
    /// Reranking strategy (none, lexical).
    pub rerank: String,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            overfetch_factor: 2,
            min_score: 0.0,
            rerank: "lexical".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}


impl Settings {
    /// Load settings from the default configuration file, with environment
    /// overrides applied and tunables validated.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply `LESE_*` environment variable overrides.
    ///
    /// This is the scalar configuration surface: backend selector, chat
    /// model, embedding model, store location, chunk size/overlap and
    /// retrieval top-k. Unparseable values fail here, not mid-pipeline.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("LESE_GENERATION_PROVIDER") {
            self.generation.provider = v.parse().map_err(LeseError::Config)?;
        }
        if let Ok(v) = std::env::var("LESE_CHAT_MODEL") {
            self.generation.model = v;
        }
        if let Ok(v) = std::env::var("LESE_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("LESE_STORE_PATH") {
            self.vector_store.sqlite_path = v;
        }
        if let Ok(v) = std::env::var("LESE_CHUNK_SIZE") {
            self.chunking.chunk_size = v
                .parse()
                .map_err(|_| LeseError::Config(format!("Invalid LESE_CHUNK_SIZE: {}", v)))?;
        }
        if let Ok(v) = std::env::var("LESE_CHUNK_OVERLAP") {
            self.chunking.overlap = v
                .parse()
                .map_err(|_| LeseError::Config(format!("Invalid LESE_CHUNK_OVERLAP: {}", v)))?;
        }
        if let Ok(v) = std::env::var("LESE_TOP_K") {
            self.retrieval.top_k = v
                .parse()
                .map_err(|_| LeseError::Config(format!("Invalid LESE_TOP_K: {}", v)))?;
        }
        Ok(())
    }

    /// Validate tunables so bad values fail at startup.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(LeseError::Config("chunk_size must be positive".to_string()));
        }
        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(LeseError::Config(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(LeseError::Config("retrieval.top_k must be positive".to_string()));
        }
        if self.retrieval.overfetch_factor == 0 {
            return Err(LeseError::Config(
                "retrieval.overfetch_factor must be at least 1".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(LeseError::Config("embedding.batch_size must be positive".to_string()));
        }
        self.retrieval
            .rerank
            .parse::<crate::rag::RerankStrategy>()
            .map_err(LeseError::Config)?;
        Ok(())
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| LeseError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lese")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }
}
