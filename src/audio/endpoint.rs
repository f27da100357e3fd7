//! Streaming speech endpoint detection
//!
//! Turns a continuous stream of fixed-duration frames into discrete utterance
//! segments: each frame is classified as speech or silence, and a two-state
//! machine decides in real time when an utterance has begun and ended.

use crate::audio::{AudioFrame, FrameClassifier, PreBuffer, UtteranceSegment, assembler};
use crate::{Error, Result};

/// Endpoint detector configuration.
///
/// `max_silence_ms` must be an exact multiple of `frame_duration_ms` — the
/// silence threshold is expressed and compared in whole frames, never
/// fractional.
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Duration of one frame in milliseconds
    pub frame_duration_ms: u32,
    /// Trailing silence before an utterance is considered finished
    pub max_silence_ms: u32,
    /// Number of frames retained while idle (lead-in context)
    pub pre_buffer_capacity: usize,
}

impl DetectorConfig {
    /// Validate the configuration, failing fast on inconsistent values
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if any value is non-positive or
    /// `max_silence_ms` is not a multiple of `frame_duration_ms`.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample_rate must be positive".to_string()));
        }
        if self.frame_duration_ms == 0 {
            return Err(Error::InvalidConfig(
                "frame_duration_ms must be positive".to_string(),
            ));
        }
        if self.max_silence_ms == 0 {
            return Err(Error::InvalidConfig(
                "max_silence_ms must be positive".to_string(),
            ));
        }
        if self.pre_buffer_capacity == 0 {
            return Err(Error::InvalidConfig(
                "pre_buffer_capacity must be positive".to_string(),
            ));
        }
        if self.max_silence_ms % self.frame_duration_ms != 0 {
            return Err(Error::InvalidConfig(format!(
                "max_silence_ms ({}) must be a multiple of frame_duration_ms ({})",
                self.max_silence_ms, self.frame_duration_ms
            )));
        }
        Ok(())
    }

    /// Samples per frame at the configured rate and duration
    #[must_use]
    pub const fn frame_len(&self) -> usize {
        (self.sample_rate as usize * self.frame_duration_ms as usize) / 1000
    }

    /// Silence threshold as a whole frame count
    #[must_use]
    pub const fn max_silence_frames(&self) -> u32 {
        self.max_silence_ms / self.frame_duration_ms
    }
}

/// Detector mode: no utterance in progress, or one being captured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Recording,
}

/// Streaming endpoint detector.
///
/// Single-threaded and exclusively owned by one capture loop; frames must
/// arrive in strict temporal order. The classifier is injected at
/// construction and treated as a pure black box.
pub struct EndpointDetector<C> {
    config: DetectorConfig,
    classifier: C,
    frame_len: usize,
    max_silence_frames: u32,
    mode: Mode,
    pre_buffer: PreBuffer,
    speech_buffer: Vec<AudioFrame>,
    trailing_silence_frames: u32,
}

impl<C: FrameClassifier> EndpointDetector<C> {
    /// Create a detector, validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for out-of-range or inconsistent values.
    pub fn new(config: DetectorConfig, classifier: C) -> Result<Self> {
        config.validate()?;

        tracing::debug!(
            sample_rate = config.sample_rate,
            frame_duration_ms = config.frame_duration_ms,
            max_silence_frames = config.max_silence_frames(),
            pre_buffer_capacity = config.pre_buffer_capacity,
            "endpoint detector initialized"
        );

        Ok(Self {
            frame_len: config.frame_len(),
            max_silence_frames: config.max_silence_frames(),
            mode: Mode::Idle,
            pre_buffer: PreBuffer::new(config.pre_buffer_capacity),
            speech_buffer: Vec::new(),
            trailing_silence_frames: 0,
            config,
            classifier,
        })
    }

    /// Consume one frame and return a completed utterance, if any.
    ///
    /// There is no maximum-duration cutoff: an utterance that never goes
    /// silent accumulates until the caller imposes its own cap.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFrameSize` if the frame's length does not match the
    /// configured fixed size; the malformed frame is neither buffered nor
    /// counted and detector state is unchanged.
    pub fn process_frame(&mut self, frame: AudioFrame) -> Result<Option<UtteranceSegment>> {
        if frame.len() != self.frame_len {
            return Err(Error::InvalidFrameSize {
                expected: self.frame_len,
                actual: frame.len(),
            });
        }

        let is_speech = self.classifier.classify(&frame, self.config.sample_rate);

        match self.mode {
            Mode::Idle => {
                self.pre_buffer.push(frame);

                if is_speech {
                    // Seed with the lead-in context; the snapshot already
                    // contains the triggering frame.
                    self.speech_buffer = self.pre_buffer.snapshot();
                    self.trailing_silence_frames = 0;
                    self.mode = Mode::Recording;
                    tracing::debug!(
                        seeded_frames = self.speech_buffer.len(),
                        "speech onset, recording"
                    );
                }
                Ok(None)
            }
            Mode::Recording => {
                // Trailing silence is part of the segment and serves as
                // natural padding for the transcriber.
                self.speech_buffer.push(frame);

                if is_speech {
                    self.trailing_silence_frames = 0;
                    return Ok(None);
                }

                self.trailing_silence_frames += 1;
                if self.trailing_silence_frames < self.max_silence_frames {
                    return Ok(None);
                }

                let frames = std::mem::take(&mut self.speech_buffer);
                let segment = assembler::assemble(&frames, self.config.sample_rate);

                self.pre_buffer.clear();
                self.trailing_silence_frames = 0;
                self.mode = Mode::Idle;

                tracing::info!(
                    frames = frames.len(),
                    duration_ms = segment.duration().as_millis(),
                    "utterance complete"
                );

                Ok(Some(segment))
            }
        }
    }

    /// Discard any in-progress utterance and return to idle.
    ///
    /// Safe to call at any time; this is the only cancellation primitive.
    pub fn reset(&mut self) {
        self.mode = Mode::Idle;
        self.pre_buffer.clear();
        self.speech_buffer.clear();
        self.trailing_silence_frames = 0;
    }

    /// Whether an utterance is currently being captured
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.mode == Mode::Recording
    }

    /// The validated configuration
    #[must_use]
    pub const fn config(&self) -> &DetectorConfig {
        &self.config
    }
}
