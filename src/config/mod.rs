//! Configuration module for Lese.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, GenerationProvider,
    GenerationSettings, PromptSettings, RetrievalSettings, Settings, VectorStoreSettings,
};
