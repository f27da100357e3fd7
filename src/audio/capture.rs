//! Microphone capture producing fixed-duration frames
//!
//! The input callback accumulates device samples and chops them into
//! fixed-length `AudioFrame`s, delivered over a channel in strict temporal
//! order — the cadence the endpoint detector requires. Devices exposing
//! either i16 or f32 input are supported; f32 samples are converted to i16
//! on arrival.

use std::sync::mpsc::{self, Receiver, Sender};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig};

use crate::audio::AudioFrame;
use crate::{Error, Result};

/// Captures mono audio from the default input device as PCM frames
pub struct FrameCapture {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    frame_len: usize,
    stream: Option<Stream>,
}

impl FrameCapture {
    /// Open the default input device at the given rate.
    ///
    /// # Errors
    ///
    /// Returns error if no input device exists or none of its configurations
    /// support mono i16 or f32 capture at `sample_rate`.
    pub fn new(sample_rate: u32, frame_duration_ms: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
                    && matches!(c.sample_format(), SampleFormat::I16 | SampleFormat::F32)
            })
            .ok_or_else(|| {
                Error::Audio(format!("no mono i16/f32 input config at {sample_rate} Hz"))
            })?;

        let sample_format = supported_config.sample_format();
        let config = supported_config
            .with_sample_rate(SampleRate(sample_rate))
            .config();

        let frame_len = (sample_rate as usize * frame_duration_ms as usize) / 1000;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            ?sample_format,
            frame_len,
            "audio capture initialized"
        );

        Ok(Self {
            device,
            config,
            sample_format,
            frame_len,
            stream: None,
        })
    }

    /// Start capturing; frames arrive on the returned channel.
    ///
    /// The stream runs until `stop` is called or the capture is dropped.
    /// `cpal` streams are not `Send`, so this must be called from the thread
    /// that will own the capture for its lifetime.
    ///
    /// # Errors
    ///
    /// Returns error if capture is already running or the input stream cannot
    /// be built or started.
    pub fn start(&mut self) -> Result<Receiver<AudioFrame>> {
        if self.stream.is_some() {
            return Err(Error::Audio("capture already running".to_string()));
        }

        let (tx, rx) = mpsc::channel();
        let mut chopper = FrameChopper::new(self.frame_len, tx);

        let err_fn = |err| {
            tracing::error!(error = %err, "audio capture error");
        };

        let stream = match self.sample_format {
            SampleFormat::I16 => self.device.build_input_stream(
                &self.config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    chopper.push_i16(data);
                },
                err_fn,
                None,
            ),
            SampleFormat::F32 => self.device.build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    chopper.push_f32(data);
                },
                err_fn,
                None,
            ),
            other => {
                return Err(Error::Audio(format!("unsupported sample format {other}")));
            }
        }
        .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(rx)
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Check if currently capturing
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for FrameCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Accumulates device samples and emits fixed-length frames in order
struct FrameChopper {
    pending: Vec<i16>,
    frame_len: usize,
    tx: Sender<AudioFrame>,
}

impl FrameChopper {
    fn new(frame_len: usize, tx: Sender<AudioFrame>) -> Self {
        Self {
            pending: Vec::with_capacity(frame_len * 2),
            frame_len,
            tx,
        }
    }

    fn push_i16(&mut self, data: &[i16]) {
        self.pending.extend_from_slice(data);
        self.drain_frames();
    }

    fn push_f32(&mut self, data: &[f32]) {
        #[allow(clippy::cast_possible_truncation)]
        self.pending
            .extend(data.iter().map(|&s| (s * 32768.0).clamp(-32768.0, 32767.0) as i16));
        self.drain_frames();
    }

    fn drain_frames(&mut self) {
        while self.pending.len() >= self.frame_len {
            let frame: Vec<i16> = self.pending.drain(..self.frame_len).collect();
            if self.tx.send(AudioFrame::new(frame)).is_err() {
                // Receiver dropped; frames are discarded until stop
                self.pending.clear();
                return;
            }
        }
    }
}

/// Encode normalized f32 samples as 16-bit PCM WAV bytes for STT upload
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
