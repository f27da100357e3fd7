//! Segment assembly: buffered frames to a normalized utterance

use std::time::Duration;

use crate::audio::{AudioFrame, UtteranceSegment};

/// Concatenate frames in order and normalize to floating-point amplitude.
///
/// Each 16-bit sample is divided by 32768, giving values in [-1.0, 1.0).
/// Pure function; frame lengths are validated at ingestion, not here.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn assemble(frames: &[AudioFrame], sample_rate: u32) -> UtteranceSegment {
    let total: usize = frames.iter().map(AudioFrame::len).sum();
    let mut samples = Vec::with_capacity(total);

    for frame in frames {
        samples.extend(frame.samples().iter().map(|&s| f32::from(s) / 32768.0));
    }

    let duration = Duration::from_secs_f64(samples.len() as f64 / f64::from(sample_rate));

    UtteranceSegment::new(samples, duration)
}
