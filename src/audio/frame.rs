//! Audio frame and utterance segment types

use std::time::Duration;

/// One fixed-duration slice of mono 16-bit PCM audio.
///
/// Frames are produced by the capture device at a strict cadence and consumed
/// exactly once by the endpoint detector. The sample count is fixed by the
/// detector configuration (`sample_rate * frame_duration_ms / 1000`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    samples: Vec<i16>,
}

impl AudioFrame {
    /// Wrap raw PCM samples into a frame
    #[must_use]
    pub const fn new(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    /// The frame's samples
    #[must_use]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Number of samples in the frame
    #[must_use]
    pub const fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the frame holds no samples
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A finalized utterance: normalized float samples plus total duration.
///
/// Produced by the segment assembler when the endpoint detector signals
/// completion; ownership transfers to the caller.
#[derive(Debug, Clone)]
pub struct UtteranceSegment {
    samples: Vec<f32>,
    duration: Duration,
}

impl UtteranceSegment {
    pub(crate) const fn new(samples: Vec<f32>, duration: Duration) -> Self {
        Self { samples, duration }
    }

    /// Samples normalized to [-1.0, 1.0)
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Total duration of the segment
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Consume the segment, yielding its samples
    #[must_use]
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}
