//! Microphone capture via cpal.
//!
//! Interleaved input frames are split into planar channels, accumulated into
//! fixed-size rows and forwarded to an [`AudioReactive`] sink from the audio
//! callback.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::AudioReactive;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No audio input device found")]
    NoInputDevice,

    #[error("Failed to query input config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Unsupported input sample format: {0}")]
    SampleFormat(cpal::SampleFormat),

    #[error("Failed to build input stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("Failed to start input stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}

/// Running microphone stream. Capture stops when this is dropped.
pub struct MicrophoneCapture {
    _stream: cpal::Stream,
    sample_rate: u32,
    channels: usize,
}

impl MicrophoneCapture {
    /// Open the default input device and start forwarding rows to `sink`.
    pub fn start<S>(sink: S, samples_per_row: usize) -> Result<Self, CaptureError>
    where
        S: AudioReactive + Send + 'static,
    {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(CaptureError::NoInputDevice)?;
        let config = device.default_input_config()?;
        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(CaptureError::SampleFormat(config.sample_format()));
        }

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        log::info!(
            "Capturing from {} @ {}Hz, {} ch",
            device.name().unwrap_or_else(|_| "unknown device".to_string()),
            sample_rate,
            channels
        );

        let mut rows = RowAccumulator::new(channels, samples_per_row);
        let stream = device.build_input_stream(
            &config.into(),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                rows.push_interleaved(data, &sink);
            },
            |err| log::error!("Audio input stream error: {}", err),
            None,
        )?;
        stream.play()?;

        Ok(Self {
            _stream: stream,
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

/// Collects interleaved frames into planar rows of a fixed length.
struct RowAccumulator {
    planar: Vec<Vec<f32>>,
    samples_per_row: usize,
}

impl RowAccumulator {
    fn new(channels: usize, samples_per_row: usize) -> Self {
        let samples_per_row = samples_per_row.max(1);
        Self {
            planar: (0..channels.max(1))
                .map(|_| Vec::with_capacity(samples_per_row))
                .collect(),
            samples_per_row,
        }
    }

    fn push_interleaved(&mut self, data: &[f32], sink: &dyn AudioReactive) {
        let channels = self.planar.len();
        for frame in data.chunks_exact(channels) {
            for (channel, &sample) in self.planar.iter_mut().zip(frame) {
                channel.push(sample);
            }
            if self.planar[0].len() == self.samples_per_row {
                let views: Vec<&[f32]> = self.planar.iter().map(Vec::as_slice).collect();
                sink.on_channels(&views);
                for channel in &mut self.planar {
                    channel.clear();
                }
            }
        }
    }
}
