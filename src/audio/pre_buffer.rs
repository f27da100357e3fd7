//! Rolling pre-buffer of recent idle frames
//!
//! Energy-based classifiers often fire a frame or two after actual speech
//! onset. Keeping a short lead-in of the most recent frames lets the detector
//! seed a new utterance with the audio just before the trigger, so the first
//! phoneme is not clipped.

use std::collections::VecDeque;

use crate::audio::AudioFrame;

/// Fixed-capacity FIFO ring of the most recent frames.
///
/// Pushing at capacity evicts the oldest frame; the buffer never grows past
/// its configured capacity.
#[derive(Debug, Clone)]
pub struct PreBuffer {
    frames: VecDeque<AudioFrame>,
    capacity: usize,
}

impl PreBuffer {
    /// Create a pre-buffer holding at most `capacity` frames
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a frame, evicting the oldest if at capacity
    pub fn push(&mut self, frame: AudioFrame) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// Current contents in temporal order, oldest first
    #[must_use]
    pub fn snapshot(&self) -> Vec<AudioFrame> {
        self.frames.iter().cloned().collect()
    }

    /// Drop all buffered frames
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Number of buffered frames
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the buffer is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Configured maximum number of frames
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: i16) -> AudioFrame {
        AudioFrame::new(vec![value; 4])
    }

    #[test]
    fn test_push_within_capacity() {
        let mut buf = PreBuffer::new(3);
        buf.push(frame(1));
        buf.push(frame(2));
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut buf = PreBuffer::new(3);
        for i in 0..10 {
            buf.push(frame(i));
            assert!(buf.len() <= 3);
        }
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut buf = PreBuffer::new(2);
        buf.push(frame(1));
        buf.push(frame(2));
        buf.push(frame(3));

        let snap = buf.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].samples()[0], 2);
        assert_eq!(snap[1].samples()[0], 3);
    }

    #[test]
    fn test_snapshot_temporal_order() {
        let mut buf = PreBuffer::new(5);
        for i in 0..5 {
            buf.push(frame(i));
        }

        let snap = buf.snapshot();
        let values: Vec<i16> = snap.iter().map(|f| f.samples()[0]).collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let mut buf = PreBuffer::new(3);
        buf.push(frame(7));
        let _ = buf.snapshot();
        let _ = buf.snapshot();
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut buf = PreBuffer::new(3);
        buf.push(frame(1));
        buf.push(frame(2));
        buf.clear();
        assert!(buf.is_empty());
        assert!(buf.snapshot().is_empty());
    }
}
