//! Audio pipeline: capture, endpoint detection, segment assembly
//!
//! The capture loop pulls fixed-duration frames from the microphone and feeds
//! them to the endpoint detector one at a time; completed utterances come out
//! as normalized segments ready for transcription.

pub mod assembler;
mod capture;
mod classifier;
mod endpoint;
mod frame;
mod pre_buffer;

pub use capture::{FrameCapture, samples_to_wav};
pub use classifier::{EnergyClassifier, FrameClassifier};
pub use endpoint::{DetectorConfig, EndpointDetector};
pub use frame::{AudioFrame, UtteranceSegment};
pub use pre_buffer::PreBuffer;
