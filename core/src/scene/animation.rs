//! Animation strategies for the lattice and its composite object.
//!
//! The lattice only exposes the mechanism (`LatticeNode::update_cell_transforms`);
//! what the cells actually do is decided by an [`AnimationPolicy`] owned by the
//! renderer.

use std::f32::consts::TAU;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::lattice::{CellCoord, LatticeDims};
use super::object::{SceneObject, DEFAULT_ROTATION_RATE};
use super::transform::Transform;

/// Drives one cell's transform from elapsed time.
pub trait AnimationPolicy: Send {
    fn cell_transform(
        &self,
        cell: CellCoord,
        dims: LatticeDims,
        elapsed: f32,
        transform: &mut Transform,
    );
}

impl<F> AnimationPolicy for F
where
    F: Fn(CellCoord, LatticeDims, f32, &mut Transform) + Send,
{
    fn cell_transform(
        &self,
        cell: CellCoord,
        dims: LatticeDims,
        elapsed: f32,
        transform: &mut Transform,
    ) {
        self(cell, dims, elapsed, transform)
    }
}

/// Named per-cell rotation strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WavePolicy {
    /// Cells keep the identity rotation.
    Static,
    /// Periodic rotation with a phase offset per row and column.
    TravelingWave {
        amplitude_degrees: f32,
        frequency_hz: f32,
        row_phase: f32,
        col_phase: f32,
        axis: [f32; 3],
    },
    /// Like `TravelingWave` along rows, with amplitude growing towards the bottom row.
    RowRipple {
        amplitude_degrees: f32,
        frequency_hz: f32,
        axis: [f32; 3],
    },
}

impl Default for WavePolicy {
    fn default() -> Self {
        Self::TravelingWave {
            amplitude_degrees: 15.0,
            frequency_hz: 0.5,
            row_phase: 0.35,
            col_phase: 0.0,
            axis: [1.0, 0.0, 0.0],
        }
    }
}

impl AnimationPolicy for WavePolicy {
    fn cell_transform(
        &self,
        cell: CellCoord,
        dims: LatticeDims,
        elapsed: f32,
        transform: &mut Transform,
    ) {
        match *self {
            Self::Static => {
                transform.rotation_angle = 0.0;
            }
            Self::TravelingWave {
                amplitude_degrees,
                frequency_hz,
                row_phase,
                col_phase,
                axis,
            } => {
                let phase = cell.row as f32 * row_phase + cell.col as f32 * col_phase;
                transform.rotation_angle =
                    amplitude_degrees * (TAU * frequency_hz * elapsed + phase).sin();
                transform.rotation_axis = Vec3::from_array(axis);
            }
            Self::RowRipple {
                amplitude_degrees,
                frequency_hz,
                axis,
            } => {
                let depth = (cell.row + 1) as f32 / dims.rows as f32;
                transform.rotation_angle =
                    amplitude_degrees * depth * (TAU * (frequency_hz * elapsed - depth)).sin();
                transform.rotation_axis = Vec3::from_array(axis);
            }
        }
    }
}

/// Motion applied to the composite object each frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectMotion {
    Still,
    /// Spin at `rate_degrees_per_sec * spin_factor` about an axis that swings
    /// as `-sin(elapsed / axis_period) * axis_weights`.
    Tumble {
        rate_degrees_per_sec: f32,
        spin_factor: f32,
        axis_weights: [f32; 3],
        axis_period: f32,
    },
}

impl Default for ObjectMotion {
    fn default() -> Self {
        Self::Tumble {
            rate_degrees_per_sec: DEFAULT_ROTATION_RATE,
            spin_factor: 3.0,
            axis_weights: [0.5, 0.5, 1.0],
            axis_period: 4.0,
        }
    }
}

impl ObjectMotion {
    /// Advance `object` by one frame of `delta` seconds at `elapsed` seconds.
    pub fn apply(&self, object: &mut SceneObject, delta: f32, elapsed: f32) {
        if let Self::Tumble {
            rate_degrees_per_sec,
            spin_factor,
            axis_weights,
            axis_period,
        } = *self
        {
            object.rotation_rate = rate_degrees_per_sec;
            object.rotate_for_time(delta, spin_factor);
            let swing = if axis_period > 0.0 {
                -(elapsed / axis_period).sin()
            } else {
                -1.0
            };
            object.transform.rotation_axis = swing * Vec3::from_array(axis_weights);
        }
    }
}

/// Scale applied to the composite once the lattice is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LatticeScale {
    /// Scale X by `rows * x_per_row` and Y by `cols * y_per_col`.
    PerCount { x_per_row: f32, y_per_col: f32 },
    Fixed { scale: [f32; 3] },
    Identity,
}

impl Default for LatticeScale {
    fn default() -> Self {
        Self::PerCount {
            x_per_row: 0.1,
            y_per_col: 0.1,
        }
    }
}

impl LatticeScale {
    pub fn factor(&self, dims: LatticeDims) -> Vec3 {
        match *self {
            Self::PerCount {
                x_per_row,
                y_per_col,
            } => Vec3::new(
                dims.rows as f32 * x_per_row,
                dims.cols as f32 * y_per_col,
                1.0,
            ),
            Self::Fixed { scale } => Vec3::from_array(scale),
            Self::Identity => Vec3::ONE,
        }
    }

    /// Multiply the factor into an existing transform's scale.
    pub fn apply(&self, dims: LatticeDims, transform: &mut Transform) {
        transform.scale *= self.factor(dims);
    }
}
