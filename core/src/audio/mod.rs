//! Audio sources and the hand-off into the render path.
//!
//! This module provides:
//! - The `AudioReactive` capability implemented by anything that consumes sample rows
//! - A lock-free ingest channel from the audio thread to the render thread
//! - Test signal generators and file loading via Symphonia
//! - Microphone capture via cpal (when the `capture` feature is enabled)

#[cfg(feature = "capture")]
pub mod capture;
pub mod ingest;
pub mod loader;
pub mod synth;

pub use ingest::{ingest_channel, waveform_abs_average, IngestQueue, IngestedRow, SampleIngest};
pub use loader::{load_audio, AudioData, AudioError};
pub use synth::{generate_sine, generate_white_noise, sine_rows};

#[cfg(feature = "capture")]
pub use capture::{CaptureError, MicrophoneCapture};

/// Consumer of audio sample rows.
///
/// Audio sources may call into this from their own thread, so implementations
/// must return quickly and never block.
pub trait AudioReactive {
    /// Receive roughly one row worth of first-channel samples.
    fn on_samples(&self, first_channel: &[f32]);

    /// Receive planar channel buffers. Only the first channel is forwarded by default.
    fn on_channels(&self, channels: &[&[f32]]) {
        if let Some(first) = channels.first() {
            self.on_samples(first);
        }
    }
}
