//! Configuration management for causerie
//!
//! Layered resolution: environment variables override the optional TOML file,
//! which overrides built-in defaults. Detector invariants (frame alignment of
//! the silence threshold) are validated at detector construction, not here.

pub mod file;

use std::path::PathBuf;

use crate::audio::{DetectorConfig, EnergyClassifier};
use crate::Result;

/// Default persona used when no system prompt is configured
const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly conversation partner. \
Reply briefly and naturally, in the same language the user speaks. Use simple \
vocabulary and short sentences. Answer directly without asking questions back.";

/// Assistant configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Audio capture and endpointing
    pub audio: AudioConfig,

    /// Speech-to-text
    pub stt: SttConfig,

    /// Reply generation
    pub chat: ChatConfig,

    /// Knowledge retrieval
    pub knowledge: KnowledgeConfig,

    /// OpenAI API key (STT, embeddings, chat)
    pub openai_api_key: Option<String>,

    /// Data directory (embedding cache)
    pub data_dir: PathBuf,
}

/// Audio capture and endpoint detection configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Capture sample rate in Hz
    pub sample_rate: u32,

    /// Frame duration in milliseconds
    pub frame_duration_ms: u32,

    /// Trailing silence before an utterance ends, in milliseconds
    pub max_silence_ms: u32,

    /// Frames of lead-in retained while idle (~900 ms at the defaults)
    pub pre_buffer_capacity: usize,

    /// RMS energy threshold for the speech classifier
    pub energy_threshold: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            frame_duration_ms: 30,
            max_silence_ms: 1200,
            pre_buffer_capacity: 30,
            energy_threshold: EnergyClassifier::DEFAULT_THRESHOLD,
        }
    }
}

impl AudioConfig {
    /// The detector configuration implied by these settings
    #[must_use]
    pub const fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            sample_rate: self.sample_rate,
            frame_duration_ms: self.frame_duration_ms,
            max_silence_ms: self.max_silence_ms,
            pre_buffer_capacity: self.pre_buffer_capacity,
        }
    }
}

/// Speech-to-text configuration
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// Transcription model
    pub model: String,

    /// ISO-639-1 language hint
    pub language: Option<String>,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: Some("fr".to_string()),
        }
    }
}

/// Reply generation configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Chat model
    pub model: String,

    /// Maximum reply tokens
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Persona system prompt
    pub system_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 150,
            temperature: 0.7,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Knowledge retrieval configuration
#[derive(Debug, Clone)]
pub struct KnowledgeConfig {
    /// Folder of `.txt` reference documents
    pub documents_dir: PathBuf,

    /// Embedding model
    pub embedding_model: String,

    /// Words per chunk
    pub chunk_size: usize,

    /// Overlapping words between consecutive chunks
    pub chunk_overlap: usize,

    /// Chunks retrieved per query
    pub top_k: usize,

    /// Minimum cosine similarity for retrieval
    pub min_similarity: f32,

    /// Maximum characters of injected context
    pub max_context_chars: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from("documents"),
            embedding_model: "text-embedding-3-small".to_string(),
            chunk_size: 300,
            chunk_overlap: 50,
            top_k: 2,
            min_similarity: 0.3,
            max_context_chars: 600,
        }
    }
}

impl Config {
    /// Load configuration: env > TOML file > defaults.
    ///
    /// # Errors
    ///
    /// Currently infallible beyond the `Result` signature reserved for future
    /// validation; detector invariants are checked at detector construction.
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();

        let audio_default = AudioConfig::default();
        let audio = AudioConfig {
            sample_rate: env_parse("CAUSERIE_SAMPLE_RATE")
                .or(fc.audio.sample_rate)
                .unwrap_or(audio_default.sample_rate),
            frame_duration_ms: env_parse("CAUSERIE_FRAME_DURATION_MS")
                .or(fc.audio.frame_duration_ms)
                .unwrap_or(audio_default.frame_duration_ms),
            max_silence_ms: env_parse("CAUSERIE_MAX_SILENCE_MS")
                .or(fc.audio.max_silence_ms)
                .unwrap_or(audio_default.max_silence_ms),
            pre_buffer_capacity: env_parse("CAUSERIE_PRE_BUFFER_CAPACITY")
                .or(fc.audio.pre_buffer_capacity)
                .unwrap_or(audio_default.pre_buffer_capacity),
            energy_threshold: env_parse("CAUSERIE_ENERGY_THRESHOLD")
                .or(fc.audio.energy_threshold)
                .unwrap_or(audio_default.energy_threshold),
        };

        let stt_default = SttConfig::default();
        let stt = SttConfig {
            model: std::env::var("CAUSERIE_STT_MODEL")
                .ok()
                .or(fc.stt.model)
                .unwrap_or(stt_default.model),
            language: std::env::var("CAUSERIE_LANGUAGE")
                .ok()
                .or(fc.stt.language)
                .or(stt_default.language)
                .filter(|l| !l.is_empty()),
        };

        let chat_default = ChatConfig::default();
        let chat = ChatConfig {
            model: std::env::var("CAUSERIE_CHAT_MODEL")
                .ok()
                .or(fc.chat.model)
                .unwrap_or(chat_default.model),
            max_tokens: env_parse("CAUSERIE_MAX_TOKENS")
                .or(fc.chat.max_tokens)
                .unwrap_or(chat_default.max_tokens),
            temperature: env_parse("CAUSERIE_TEMPERATURE")
                .or(fc.chat.temperature)
                .unwrap_or(chat_default.temperature),
            system_prompt: std::env::var("CAUSERIE_SYSTEM_PROMPT")
                .ok()
                .or(fc.chat.system_prompt)
                .unwrap_or(chat_default.system_prompt),
        };

        let knowledge_default = KnowledgeConfig::default();
        let knowledge = KnowledgeConfig {
            documents_dir: std::env::var("CAUSERIE_DOCUMENTS_DIR")
                .ok()
                .or(fc.knowledge.documents_dir)
                .map_or(knowledge_default.documents_dir, PathBuf::from),
            embedding_model: std::env::var("CAUSERIE_EMBEDDING_MODEL")
                .ok()
                .or(fc.knowledge.embedding_model)
                .unwrap_or(knowledge_default.embedding_model),
            chunk_size: env_parse("CAUSERIE_CHUNK_SIZE")
                .or(fc.knowledge.chunk_size)
                .unwrap_or(knowledge_default.chunk_size),
            chunk_overlap: env_parse("CAUSERIE_CHUNK_OVERLAP")
                .or(fc.knowledge.chunk_overlap)
                .unwrap_or(knowledge_default.chunk_overlap),
            top_k: env_parse("CAUSERIE_TOP_K")
                .or(fc.knowledge.top_k)
                .unwrap_or(knowledge_default.top_k),
            min_similarity: env_parse("CAUSERIE_MIN_SIMILARITY")
                .or(fc.knowledge.min_similarity)
                .unwrap_or(knowledge_default.min_similarity),
            max_context_chars: env_parse("CAUSERIE_MAX_CONTEXT_CHARS")
                .or(fc.knowledge.max_context_chars)
                .unwrap_or(knowledge_default.max_context_chars),
        };

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok().or(fc.api_keys.openai);

        let data_dir = directories::BaseDirs::new()
            .map_or_else(|| PathBuf::from("."), |d| d.data_dir().join("causerie"));

        Ok(Self {
            audio,
            stt,
            chat,
            knowledge,
            openai_api_key,
            data_dir,
        })
    }

    /// Path of the embedding cache file
    #[must_use]
    pub fn embedding_cache_path(&self) -> PathBuf {
        self.data_dir.join("embeddings.json")
    }
}

/// Parse an env var; unset yields `None`, a set-but-malformed value is
/// warned about and the default used
fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    parse_env_value(name, std::env::var(name).ok())
}

fn parse_env_value<T: std::str::FromStr>(name: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(
                var = name,
                value = %raw,
                "ignoring unparseable environment variable, using default"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_audio_tuning() {
        let audio = AudioConfig::default();
        assert_eq!(audio.sample_rate, 16000);
        assert_eq!(audio.frame_duration_ms, 30);
        assert_eq!(audio.max_silence_ms, 1200);
        assert_eq!(audio.pre_buffer_capacity, 30);
    }

    #[test]
    fn test_default_detector_config_is_valid() {
        let config = AudioConfig::default().detector_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_silence_frames(), 40);
        assert_eq!(config.frame_len(), 480);
    }

    #[test]
    fn test_env_value_parsing() {
        assert_eq!(
            parse_env_value::<u32>("CAUSERIE_MAX_SILENCE_MS", Some("900".to_string())),
            Some(900)
        );
        assert_eq!(parse_env_value::<u32>("CAUSERIE_MAX_SILENCE_MS", None), None);
        // Malformed values fall back to the default instead of panicking
        assert_eq!(
            parse_env_value::<u32>("CAUSERIE_MAX_SILENCE_MS", Some("abc".to_string())),
            None
        );
    }

    #[test]
    fn test_default_knowledge_tuning() {
        let k = KnowledgeConfig::default();
        assert_eq!(k.chunk_size, 300);
        assert_eq!(k.chunk_overlap, 50);
        assert_eq!(k.top_k, 2);
    }
}
