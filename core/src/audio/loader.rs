//! Audio file decoding via Symphonia, for replaying files into the lattice.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use thiserror::Error;

use super::AudioReactive;

/// Errors raised while loading an audio file.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to open audio file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode audio: {0}")]
    Decode(#[from] SymphoniaError),

    #[error("No audio track found in file")]
    NoAudioTrack,

    #[error("Audio track has no sample rate")]
    UnknownSampleRate,
}

/// Decoded interleaved samples.
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Interleaved samples in -1.0..1.0
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: usize,
}

impl AudioData {
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    /// Samples per channel.
    pub fn num_frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels
    }

    /// De-interleaved samples of channel `index`.
    pub fn channel(&self, index: usize) -> Vec<f32> {
        if index >= self.channels {
            return Vec::new();
        }
        self.samples
            .iter()
            .skip(index)
            .step_by(self.channels)
            .copied()
            .collect()
    }

    pub fn first_channel(&self) -> Vec<f32> {
        self.channel(0)
    }

    /// Split the first channel into rows of `samples_per_row`; a trailing partial
    /// row is dropped.
    pub fn rows(&self, samples_per_row: usize) -> Vec<Vec<f32>> {
        if samples_per_row == 0 {
            return Vec::new();
        }
        self.first_channel()
            .chunks_exact(samples_per_row)
            .map(<[f32]>::to_vec)
            .collect()
    }

    /// Feed every complete row into `sink`, returning the number of rows sent.
    pub fn replay_into<R>(&self, sink: &R, samples_per_row: usize) -> usize
    where
        R: AudioReactive + ?Sized,
    {
        let rows = self.rows(samples_per_row);
        for row in &rows {
            sink.on_samples(row);
        }
        rows.len()
    }
}

/// Decode a WAV, MP3, FLAC or AAC file to interleaved f32 samples.
pub fn load_audio(path: &Path) -> Result<AudioData, AudioError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AudioError::NoAudioTrack)?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(AudioError::UnknownSampleRate)?;
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let samples = decode_track(format.as_mut(), decoder.as_mut(), track_id)?;
    log::info!(
        "Loaded {} ({} Hz, {} ch, {} samples)",
        path.display(),
        sample_rate,
        channels,
        samples.len()
    );

    Ok(AudioData {
        samples,
        sample_rate,
        channels,
    })
}

fn decode_track(
    format: &mut dyn FormatReader,
    decoder: &mut dyn Decoder,
    track_id: u32,
) -> Result<Vec<f32>, AudioError> {
    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::debug!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let buf = sample_buf.get_or_insert_with(|| {
            SampleBuffer::new(decoded.capacity() as u64, *decoded.spec())
        });
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn stereo() -> AudioData {
        AudioData {
            samples: vec![0.1, -0.1, 0.2, -0.2, 0.3, -0.3, 0.4, -0.4, 0.5, -0.5],
            sample_rate: 8000,
            channels: 2,
        }
    }

    #[test]
    fn test_duration_and_frames() {
        let audio = AudioData {
            samples: vec![0.0; 44100 * 2],
            sample_rate: 44100,
            channels: 2,
        };
        assert!((audio.duration() - 1.0).abs() < 0.001);
        assert_eq!(audio.num_frames(), 44100);
    }

    #[test]
    fn test_channel_extraction() {
        let audio = stereo();
        assert_eq!(audio.first_channel(), vec![0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!(audio.channel(1)[0], -0.1);
        assert!(audio.channel(2).is_empty());
    }

    #[test]
    fn test_rows_drop_partial_tail() {
        let rows = stereo().rows(2);
        assert_eq!(rows, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
        assert!(stereo().rows(0).is_empty());
    }

    struct Collect(Mutex<Vec<Vec<f32>>>);

    impl AudioReactive for Collect {
        fn on_samples(&self, first_channel: &[f32]) {
            self.0.lock().unwrap().push(first_channel.to_vec());
        }
    }

    #[test]
    fn test_replay_into_sink() {
        let sink = Collect(Mutex::new(Vec::new()));
        assert_eq!(stereo().replay_into(&sink, 2), 2);
        assert_eq!(sink.0.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_audio(Path::new("/nonexistent/track.wav"));
        assert!(matches!(result, Err(AudioError::Io(_))));
    }
}
