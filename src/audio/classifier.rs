//! Per-frame speech/silence classification
//!
//! The endpoint detector consumes the classifier as a black box: any
//! deterministic, side-effect-free function from one frame to a boolean.
//! Classifiers are constructed by the caller and injected, never held as
//! process-wide state.

use crate::audio::AudioFrame;

/// Classifies a single fixed-duration frame as speech or silence.
///
/// Implementations must be deterministic and side-effect-free from the
/// detector's perspective; the detector does not validate their output
/// beyond its type.
pub trait FrameClassifier {
    /// Return true if the frame contains speech
    fn classify(&self, frame: &AudioFrame, sample_rate: u32) -> bool;
}

/// RMS-energy classifier: a frame is speech when its root-mean-square
/// amplitude (normalized to [-1.0, 1.0)) exceeds the threshold.
#[derive(Debug, Clone)]
pub struct EnergyClassifier {
    threshold: f32,
}

impl EnergyClassifier {
    /// Default RMS threshold, suitable for close-mic speech at 16 kHz
    pub const DEFAULT_THRESHOLD: f32 = 0.01;

    /// Create a classifier with the given RMS threshold
    #[must_use]
    pub const fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl Default for EnergyClassifier {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

impl FrameClassifier for EnergyClassifier {
    fn classify(&self, frame: &AudioFrame, _sample_rate: u32) -> bool {
        rms_energy(frame.samples()) > self.threshold
    }
}

/// RMS energy of i16 samples, normalized to [0.0, 1.0]
#[allow(clippy::cast_precision_loss)]
fn rms_energy(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples
        .iter()
        .map(|&s| {
            let x = f32::from(s) / 32768.0;
            x * x
        })
        .sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_of_silence() {
        let silence = vec![0_i16; 480];
        assert!(rms_energy(&silence) < 0.001);
    }

    #[test]
    fn test_energy_of_loud_signal() {
        let loud = vec![16384_i16; 480];
        assert!(rms_energy(&loud) > 0.4);
    }

    #[test]
    fn test_empty_frame_is_silence() {
        assert!((rms_energy(&[])).abs() < f32::EPSILON);
    }

    #[test]
    fn test_classifier_threshold() {
        let classifier = EnergyClassifier::default();
        let quiet = AudioFrame::new(vec![10_i16; 480]);
        let loud = AudioFrame::new(vec![8000_i16; 480]);

        assert!(!classifier.classify(&quiet, 16000));
        assert!(classifier.classify(&loud, 16000));
    }

    #[test]
    fn test_classifier_is_deterministic() {
        let classifier = EnergyClassifier::default();
        let frame = AudioFrame::new(vec![5000_i16; 480]);

        let first = classifier.classify(&frame, 16000);
        for _ in 0..10 {
            assert_eq!(classifier.classify(&frame, 16000), first);
        }
    }
}
