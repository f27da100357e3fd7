//! Endpoint detection integration tests
//!
//! Runs synthesized PCM frames through the full detector pipeline without
//! requiring audio hardware.

use causerie::audio::samples_to_wav;
use causerie::{AudioFrame, DetectorConfig, EndpointDetector, EnergyClassifier};

const SAMPLE_RATE: u32 = 16_000;
const FRAME_MS: u32 = 30;
const FRAME_LEN: usize = 480;

fn test_config() -> DetectorConfig {
    DetectorConfig {
        sample_rate: SAMPLE_RATE,
        frame_duration_ms: FRAME_MS,
        max_silence_ms: 150, // 5 trailing silence frames
        pre_buffer_capacity: 4,
    }
}

/// One frame of a 440 Hz sine at roughly 30% full scale
fn speech_frame() -> AudioFrame {
    let samples: Vec<i16> = (0..FRAME_LEN)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let s = 0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin();
            (s * 32767.0) as i16
        })
        .collect();
    AudioFrame::new(samples)
}

fn silence_frame() -> AudioFrame {
    AudioFrame::new(vec![0; FRAME_LEN])
}

#[test]
fn sine_then_silence_yields_one_segment() {
    let mut detector =
        EndpointDetector::new(test_config(), EnergyClassifier::default()).unwrap();

    // Lead-in silence fills the pre-buffer without triggering
    for _ in 0..10 {
        assert!(detector.process_frame(silence_frame()).unwrap().is_none());
    }
    assert!(!detector.is_recording());

    // Ten frames of speech
    for _ in 0..10 {
        assert!(detector.process_frame(speech_frame()).unwrap().is_none());
    }
    assert!(detector.is_recording());

    // Four silence frames: not enough to terminate
    for _ in 0..4 {
        assert!(detector.process_frame(silence_frame()).unwrap().is_none());
    }

    // Fifth silence frame completes the utterance
    let segment = detector
        .process_frame(silence_frame())
        .unwrap()
        .expect("segment should complete");
    assert!(!detector.is_recording());

    // 3 silence lead-in frames + 10 speech + 5 trailing silence (the
    // pre-buffer snapshot includes the triggering frame)
    assert_eq!(segment.samples().len(), 18 * FRAME_LEN);
}

#[test]
fn segment_samples_are_normalized() {
    let mut detector =
        EndpointDetector::new(test_config(), EnergyClassifier::default()).unwrap();

    let mut segment = None;
    for _ in 0..10 {
        segment = detector.process_frame(speech_frame()).unwrap();
    }
    while segment.is_none() {
        segment = detector.process_frame(silence_frame()).unwrap();
    }
    let segment = segment.unwrap();

    assert!(
        segment
            .samples()
            .iter()
            .all(|s| (-1.0..1.0).contains(s)),
        "all samples must lie in [-1.0, 1.0)"
    );
    // The sine peaks near 30% full scale
    let peak = segment.samples().iter().fold(0.0f32, |m, s| m.max(s.abs()));
    assert!(peak > 0.25 && peak < 0.35, "peak was {peak}");
}

#[test]
fn detector_handles_consecutive_utterances() {
    let mut detector =
        EndpointDetector::new(test_config(), EnergyClassifier::default()).unwrap();

    for round in 0..3 {
        let mut completed = None;
        for _ in 0..6 {
            completed = detector.process_frame(speech_frame()).unwrap();
            assert!(completed.is_none());
        }
        for _ in 0..5 {
            assert!(completed.is_none());
            completed = detector.process_frame(silence_frame()).unwrap();
        }
        assert!(completed.is_some(), "round {round} should complete");
        assert!(!detector.is_recording());
    }
}

#[test]
fn undersized_frame_is_rejected_without_losing_state() {
    let mut detector =
        EndpointDetector::new(test_config(), EnergyClassifier::default()).unwrap();

    for _ in 0..3 {
        detector.process_frame(speech_frame()).unwrap();
    }
    assert!(detector.is_recording());

    let err = detector
        .process_frame(AudioFrame::new(vec![0; FRAME_LEN - 1]))
        .unwrap_err();
    assert!(err.to_string().contains("479"));
    assert!(detector.is_recording());

    // Recording still terminates normally afterwards
    let mut completed = None;
    for _ in 0..5 {
        completed = detector.process_frame(silence_frame()).unwrap();
    }
    assert!(completed.is_some());
}

#[test]
fn completed_segment_converts_to_wav() {
    let mut detector =
        EndpointDetector::new(test_config(), EnergyClassifier::default()).unwrap();

    let mut segment = None;
    for _ in 0..8 {
        segment = detector.process_frame(speech_frame()).unwrap();
    }
    while segment.is_none() {
        segment = detector.process_frame(silence_frame()).unwrap();
    }
    let segment = segment.unwrap();

    let wav = samples_to_wav(segment.samples(), SAMPLE_RATE).unwrap();
    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");
    assert!(wav.len() > 44);
}
