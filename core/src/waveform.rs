//! Circular buffer of audio sample rows mirrored into GPU-visible memory.
//!
//! The buffer is one contiguous `rows * samples_per_row` region. Row `k` of the
//! input stream lands in slot `k % rows`, so after wraparound the region holds
//! the most recent `rows` rows and the write cursor points at the oldest one.

use thiserror::Error;

/// Errors raised while sizing the waveform region.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaveformError {
    #[error("Waveform buffer needs non-zero dimensions, got {samples_per_row} samples x {rows} rows")]
    ZeroSized { samples_per_row: usize, rows: usize },

    #[error("Waveform buffer of {samples_per_row} samples x {rows} rows exceeds the {limit} byte allocation limit")]
    Overflow {
        samples_per_row: usize,
        rows: usize,
        limit: u64,
    },
}

/// Circular parameters published to the shader alongside the region.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CircularParams {
    pub samples_per_row: u32,
    pub rows: u32,
    /// Slot the next row will be written to (the oldest retained row once full).
    pub cursor: u32,
    /// Total rows written, saturating at `u32::MAX`.
    pub rows_written: u32,
}

/// Where a `write_row` call landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowWrite {
    pub slot: usize,
    /// Offset of the slot in bytes from the start of the region.
    pub byte_offset: u64,
    /// Zero-based index of the row in the input stream.
    pub sequence: u64,
}

/// Read-only view of the region and its circular parameters.
#[derive(Debug, Clone, Copy)]
pub struct WaveformRegion<'a> {
    pub samples: &'a [f32],
    pub params: CircularParams,
}

impl WaveformRegion<'_> {
    pub fn size_bytes(&self) -> u64 {
        std::mem::size_of_val(self.samples) as u64
    }
}

/// Fixed-capacity ring of sample rows.
#[derive(Debug, Clone)]
pub struct CircularWaveformBuffer {
    samples: Vec<f32>,
    samples_per_row: usize,
    rows: usize,
    cursor: usize,
    rows_written: u64,
}

impl CircularWaveformBuffer {
    /// Allocate a zeroed region, limited only by the address space.
    pub fn configure(samples_per_row: usize, rows: usize) -> Result<Self, WaveformError> {
        Self::configure_with_limit(samples_per_row, rows, isize::MAX as u64)
    }

    /// Allocate a zeroed region whose byte size must not exceed `max_bytes`.
    pub fn configure_with_limit(
        samples_per_row: usize,
        rows: usize,
        max_bytes: u64,
    ) -> Result<Self, WaveformError> {
        if samples_per_row == 0 || rows == 0 {
            return Err(WaveformError::ZeroSized {
                samples_per_row,
                rows,
            });
        }

        let overflow = WaveformError::Overflow {
            samples_per_row,
            rows,
            limit: max_bytes,
        };
        let len = samples_per_row.checked_mul(rows).ok_or(overflow.clone())?;
        let bytes = len
            .checked_mul(std::mem::size_of::<f32>())
            .ok_or(overflow.clone())?;
        if bytes as u64 > max_bytes || u32::try_from(rows).is_err() {
            return Err(overflow);
        }
        u32::try_from(samples_per_row).map_err(|_| overflow)?;

        log::debug!(
            "Configured waveform buffer: {} rows x {} samples ({} bytes)",
            rows,
            samples_per_row,
            bytes
        );

        Ok(Self {
            samples: vec![0.0; len],
            samples_per_row,
            rows,
            cursor: 0,
            rows_written: 0,
        })
    }

    /// Copy one row into slot `cursor` and advance the cursor.
    ///
    /// Short rows are zero-padded and long rows truncated to `samples_per_row`.
    pub fn write_row(&mut self, samples: &[f32]) -> RowWrite {
        let slot = self.cursor;
        let start = slot * self.samples_per_row;
        let dest = &mut self.samples[start..start + self.samples_per_row];

        let n = samples.len().min(self.samples_per_row);
        dest[..n].copy_from_slice(&samples[..n]);
        dest[n..].fill(0.0);

        if samples.len() != self.samples_per_row {
            log::trace!(
                "Waveform row of {} samples fitted to {}",
                samples.len(),
                self.samples_per_row
            );
        }

        let sequence = self.rows_written;
        self.rows_written += 1;
        self.cursor = (self.cursor + 1) % self.rows;

        RowWrite {
            slot,
            byte_offset: (start * std::mem::size_of::<f32>()) as u64,
            sequence,
        }
    }

    pub fn as_readable_region(&self) -> WaveformRegion<'_> {
        WaveformRegion {
            samples: &self.samples,
            params: self.params(),
        }
    }

    pub fn params(&self) -> CircularParams {
        CircularParams {
            samples_per_row: self.samples_per_row as u32,
            rows: self.rows as u32,
            cursor: self.cursor as u32,
            rows_written: u32::try_from(self.rows_written).unwrap_or(u32::MAX),
        }
    }

    /// Contents of one slot.
    pub fn row(&self, slot: usize) -> Option<&[f32]> {
        (slot < self.rows)
            .then(|| &self.samples[slot * self.samples_per_row..(slot + 1) * self.samples_per_row])
    }

    /// Retained rows from oldest to newest. Slots never written are skipped.
    pub fn rows_oldest_first(&self) -> impl Iterator<Item = &[f32]> + '_ {
        let filled = (self.rows_written.min(self.rows as u64)) as usize;
        let first = (self.cursor + self.rows - filled) % self.rows;
        (0..filled).map(move |i| {
            let slot = (first + i) % self.rows;
            &self.samples[slot * self.samples_per_row..(slot + 1) * self.samples_per_row]
        })
    }

    pub fn samples_per_row(&self) -> usize {
        self.samples_per_row
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn size_bytes(&self) -> u64 {
        (self.samples.len() * std::mem::size_of::<f32>()) as u64
    }
}
