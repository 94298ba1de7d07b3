//! Integration tests for the circular waveform buffer fed by the ingest channel.

use wavelattice::audio::{ingest_channel, sine_rows, AudioReactive};
use wavelattice::render::RendererConfig;
use wavelattice::waveform::{CircularWaveformBuffer, WaveformError};

const SAMPLE_RATE: u32 = 44100;

#[test]
fn test_default_lattice_ring_after_wrap() {
    // 20x25 lattice: 26 rows of 512 samples
    let config = RendererConfig::default();
    let mut buffer =
        CircularWaveformBuffer::configure(config.samples_per_row, config.waveform_rows()).unwrap();
    assert_eq!(buffer.rows(), 26);
    assert_eq!(buffer.size_bytes(), 26 * 512 * 4);

    let rows = sine_rows(440.0, SAMPLE_RATE, 512, 27, 0.8);
    let (ingest, queue) = ingest_channel(64);
    for row in &rows {
        ingest.on_samples(row);
    }
    for row in queue.drain() {
        buffer.write_row(&row.samples);
    }

    assert_eq!(buffer.rows_written(), 27);
    assert_eq!(buffer.cursor(), 1);
    // Row #26 wrapped into slot 0, row #25 sits in the last slot
    assert_eq!(buffer.row(0).unwrap(), &rows[26][..]);
    assert_eq!(buffer.row(25).unwrap(), &rows[25][..]);
    assert_eq!(buffer.row(1).unwrap(), &rows[1][..]);

    let params = buffer.params();
    assert_eq!(params.cursor, 1);
    assert_eq!(params.rows, 26);
    assert_eq!(params.samples_per_row, 512);
    assert_eq!(params.rows_written, 27);
}

#[test]
fn test_rows_oldest_first_after_wrap() {
    let mut buffer = CircularWaveformBuffer::configure(2, 3).unwrap();
    for i in 0..5 {
        buffer.write_row(&[i as f32, i as f32]);
    }
    let firsts: Vec<f32> = buffer.rows_oldest_first().map(|row| row[0]).collect();
    assert_eq!(firsts, vec![2.0, 3.0, 4.0]);
}

#[test]
fn test_region_exposes_whole_ring() {
    let mut buffer = CircularWaveformBuffer::configure(4, 2).unwrap();
    let write = buffer.write_row(&[1.0, 2.0, 3.0, 4.0]);
    assert_eq!(write.slot, 0);
    assert_eq!(write.sequence, 0);

    let write = buffer.write_row(&[5.0]);
    assert_eq!(write.slot, 1);
    assert_eq!(write.byte_offset, 16);

    let region = buffer.as_readable_region();
    assert_eq!(region.size_bytes(), 32);
    assert_eq!(region.samples, &[1.0, 2.0, 3.0, 4.0, 5.0, 0.0, 0.0, 0.0]);
    assert_eq!(region.params.cursor, 0);
}

#[test]
fn test_sine_rows_are_continuous() {
    let rows = sine_rows(1000.0, SAMPLE_RATE, 64, 4, 1.0);
    let joined: Vec<f32> = rows.concat();
    let single = &sine_rows(1000.0, SAMPLE_RATE, 256, 1, 1.0)[0];
    for (a, b) in joined.iter().zip(single) {
        assert!((a - b).abs() < 1e-5);
    }
}

#[test]
fn test_oversized_ring_is_rejected() {
    assert!(matches!(
        CircularWaveformBuffer::configure_with_limit(1024, 1024, 1024),
        Err(WaveformError::Overflow { .. })
    ));
    assert!(matches!(
        CircularWaveformBuffer::configure(usize::MAX, 2),
        Err(WaveformError::Overflow { .. })
    ));
    assert!(matches!(
        CircularWaveformBuffer::configure(0, 2),
        Err(WaveformError::ZeroSized { .. })
    ));
}

#[test]
fn test_full_ingest_drops_rows() {
    let (ingest, queue) = ingest_channel(2);
    for _ in 0..5 {
        ingest.on_samples(&[0.1; 8]);
    }
    assert_eq!(ingest.dropped(), 3);
    assert_eq!(queue.dropped(), 3);
    assert_eq!(queue.drain().count(), 2);
}
