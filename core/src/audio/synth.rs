//! Synthetic audio signals for demos, benches and tests.

use std::f32::consts::PI;

/// Sine wave of `duration` seconds.
pub fn generate_sine(frequency: f32, sample_rate: u32, duration: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (duration * sample_rate as f32) as usize;
    (0..num_samples)
        .map(|i| amplitude * sine_at(frequency, sample_rate, i))
        .collect()
}

/// Reproducible white noise from a 64-bit LCG.
pub fn generate_white_noise(
    sample_rate: u32,
    duration: f32,
    amplitude: f32,
    seed: u64,
) -> Vec<f32> {
    let num_samples = (duration * sample_rate as f32) as usize;
    let mut state = seed;
    (0..num_samples)
        .map(|_| {
            state = lcg_next(state);
            amplitude * ((state as f32 / u64::MAX as f32) * 2.0 - 1.0)
        })
        .collect()
}

/// `count` consecutive rows of a continuous sine, `samples_per_row` samples each.
///
/// Row `k` starts at sample `k * samples_per_row`, so the rows join without a
/// phase jump, like successive microphone buffers would.
pub fn sine_rows(
    frequency: f32,
    sample_rate: u32,
    samples_per_row: usize,
    count: usize,
    amplitude: f32,
) -> Vec<Vec<f32>> {
    (0..count)
        .map(|row| {
            let start = row * samples_per_row;
            (start..start + samples_per_row)
                .map(|i| amplitude * sine_at(frequency, sample_rate, i))
                .collect()
        })
        .collect()
}

pub(crate) fn lcg_next(state: u64) -> u64 {
    state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407)
}

fn sine_at(frequency: f32, sample_rate: u32, index: usize) -> f32 {
    let t = index as f32 / sample_rate as f32;
    (2.0 * PI * frequency * t).sin()
}
