//! TOML configuration file loading
//!
//! Supports `~/.config/causerie/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Audio/endpointing configuration
    #[serde(default)]
    pub audio: AudioFileConfig,

    /// Speech-to-text configuration
    #[serde(default)]
    pub stt: SttFileConfig,

    /// Chat/reply configuration
    #[serde(default)]
    pub chat: ChatFileConfig,

    /// Knowledge retrieval configuration
    #[serde(default)]
    pub knowledge: KnowledgeFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Audio capture and endpoint detection
#[derive(Debug, Default, Deserialize)]
pub struct AudioFileConfig {
    /// Capture sample rate in Hz
    pub sample_rate: Option<u32>,

    /// Frame duration in milliseconds
    pub frame_duration_ms: Option<u32>,

    /// Trailing silence before an utterance ends, in milliseconds
    pub max_silence_ms: Option<u32>,

    /// Frames of lead-in kept while idle
    pub pre_buffer_capacity: Option<usize>,

    /// RMS energy threshold for the speech classifier
    pub energy_threshold: Option<f32>,
}

/// Speech-to-text configuration
#[derive(Debug, Default, Deserialize)]
pub struct SttFileConfig {
    /// Transcription model (e.g. "whisper-1")
    pub model: Option<String>,

    /// ISO-639-1 language hint (e.g. "fr")
    pub language: Option<String>,
}

/// Chat/reply configuration
#[derive(Debug, Default, Deserialize)]
pub struct ChatFileConfig {
    /// Chat model (e.g. "gpt-3.5-turbo")
    pub model: Option<String>,

    /// Maximum reply tokens
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Persona system prompt
    pub system_prompt: Option<String>,
}

/// Knowledge retrieval configuration
#[derive(Debug, Default, Deserialize)]
pub struct KnowledgeFileConfig {
    /// Folder of `.txt` reference documents
    pub documents_dir: Option<String>,

    /// Embedding model (e.g. "text-embedding-3-small")
    pub embedding_model: Option<String>,

    /// Words per chunk
    pub chunk_size: Option<usize>,

    /// Overlapping words between consecutive chunks
    pub chunk_overlap: Option<usize>,

    /// Number of chunks retrieved per query
    pub top_k: Option<usize>,

    /// Minimum cosine similarity for retrieval
    pub min_similarity: Option<f32>,

    /// Maximum characters of context injected into the prompt
    pub max_context_chars: Option<usize>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be
/// parsed.
pub fn load_config_file() -> ConfigFile {
    let Some(path) = config_file_path() else {
        return ConfigFile::default();
    };

    if !path.exists() {
        return ConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/causerie/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("causerie").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_parses() {
        let content = r#"
            [audio]
            max_silence_ms = 900

            [stt]
            language = "fr"
        "#;

        let parsed: ConfigFile = toml::from_str(content).unwrap();
        assert_eq!(parsed.audio.max_silence_ms, Some(900));
        assert_eq!(parsed.audio.sample_rate, None);
        assert_eq!(parsed.stt.language.as_deref(), Some("fr"));
        assert!(parsed.chat.model.is_none());
    }

    #[test]
    fn test_empty_file_parses() {
        let parsed: ConfigFile = toml::from_str("").unwrap();
        assert!(parsed.api_keys.openai.is_none());
    }
}
