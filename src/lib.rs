//! Causerie - voice-driven conversational assistant
//!
//! This library provides the building blocks for a hands-free voice
//! session:
//! - Streaming speech endpoint detection (pre-buffer, silence-terminated
//!   recording, utterance assembly)
//! - Microphone capture as fixed-duration PCM frames
//! - Whisper transcription and chat completion clients
//! - Embedding-based knowledge retrieval over plain-text documents
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  Microphone                       │
//! └───────────────────────┬──────────────────────────┘
//!                         │ 30 ms i16 frames
//! ┌───────────────────────▼──────────────────────────┐
//! │              EndpointDetector                     │
//! │   pre-buffer  │  recording  │  silence counting  │
//! └───────────────────────┬──────────────────────────┘
//!                         │ UtteranceSegment (f32)
//! ┌───────────────────────▼──────────────────────────┐
//! │   STT  →  knowledge retrieval  →  chat reply      │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod assistant;
pub mod audio;
pub mod chat;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod stt;

pub use assistant::Assistant;
pub use audio::{
    AudioFrame, DetectorConfig, EndpointDetector, EnergyClassifier, FrameClassifier,
    UtteranceSegment,
};
pub use chat::ChatClient;
pub use config::Config;
pub use error::{Error, Result};
pub use knowledge::{
    EmbeddingClient, KnowledgeBase, KnowledgeChunk, Retrieved, chunk_text, cosine_similarity,
    format_context,
};
pub use stt::SpeechToText;
