//! Error types for causerie

use thiserror::Error;

/// Result type alias for causerie operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in causerie
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error, fatal to the component being constructed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A frame's length does not match the configured fixed size.
    /// Detector state is left unchanged; the caller may skip the frame.
    #[error("invalid frame size: expected {expected} samples, got {actual}")]
    InvalidFrameSize {
        /// Samples per frame implied by the detector configuration
        expected: usize,
        /// Samples actually supplied
        actual: usize,
    },

    /// Audio device or stream error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Chat completion error
    #[error("chat error: {0}")]
    Chat(String),

    /// Knowledge base error
    #[error("knowledge error: {0}")]
    Knowledge(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
