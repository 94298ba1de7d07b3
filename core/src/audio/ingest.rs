//! Bounded hand-off of sample rows from the audio thread to the render thread.
//!
//! The audio side never blocks: when the queue is full the row is dropped and
//! counted. The render side drains whatever is pending at the start of `update`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TryIter, TrySendError};
use std::sync::Arc;

use super::AudioReactive;

/// One row of first-channel samples plus the level of all channels.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedRow {
    pub samples: Vec<f32>,
    pub abs_average: f32,
}

/// Create a connected ingest pair holding at most `capacity` pending rows.
pub fn ingest_channel(capacity: usize) -> (SampleIngest, IngestQueue) {
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        SampleIngest {
            tx,
            dropped: Arc::clone(&dropped),
        },
        IngestQueue { rx, dropped },
    )
}

/// Mean absolute amplitude over every sample of every channel.
pub fn waveform_abs_average(channels: &[&[f32]]) -> f32 {
    let count: usize = channels.iter().map(|c| c.len()).sum();
    if count == 0 {
        return 0.0;
    }
    let total: f32 = channels
        .iter()
        .flat_map(|c| c.iter())
        .map(|s| s.abs())
        .sum();
    total / count as f32
}

/// Audio-thread end of the ingest channel.
#[derive(Debug, Clone)]
pub struct SampleIngest {
    tx: SyncSender<IngestedRow>,
    dropped: Arc<AtomicU64>,
}

impl SampleIngest {
    /// Queue a row without blocking. Returns false if it was dropped.
    pub fn push_row(&self, row: IngestedRow) -> bool {
        match self.tx.try_send(row) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped.is_power_of_two() {
                    log::warn!("Ingest queue full, {} sample rows dropped so far", dropped);
                }
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                log::debug!("Ingest queue closed, discarding sample row");
                false
            }
        }
    }

    /// Rows dropped because the render side fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl AudioReactive for SampleIngest {
    fn on_samples(&self, first_channel: &[f32]) {
        self.on_channels(&[first_channel]);
    }

    fn on_channels(&self, channels: &[&[f32]]) {
        let Some(first) = channels.first() else {
            return;
        };
        self.push_row(IngestedRow {
            samples: first.to_vec(),
            abs_average: waveform_abs_average(channels),
        });
    }
}

/// Render-thread end of the ingest channel.
#[derive(Debug)]
pub struct IngestQueue {
    rx: Receiver<IngestedRow>,
    dropped: Arc<AtomicU64>,
}

impl IngestQueue {
    /// Every row pending right now, oldest first.
    pub fn drain(&self) -> TryIter<'_, IngestedRow> {
        self.rx.try_iter()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
