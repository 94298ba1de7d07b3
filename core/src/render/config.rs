//! Renderer configuration, loadable from JSON.

use std::path::Path;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::scene::{LatticeScale, ObjectMotion, QuadLatticeGenerator, Transform, WavePolicy};
use crate::sync::MAX_INFLIGHT_FRAMES;

/// Vertex program that displaces lattice cells by the waveform ring.
pub const DEFAULT_VERTEX_PROGRAM: &str = "lattice_circular_wave";
/// Fragment program that samples the texture with a periodic colour shift.
pub const DEFAULT_FRAGMENT_PROGRAM: &str = "tex_quad_periodic_color_shift";

/// Everything the renderer needs besides its backend and target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub vertex_program: String,
    pub fragment_program: String,
    pub lattice_cols: usize,
    pub lattice_rows: usize,
    /// Samples per waveform row, roughly one audio callback.
    pub samples_per_row: usize,
    pub inflight_frames: usize,
    /// Pending rows the audio thread may queue before rows are dropped.
    pub ingest_capacity: usize,
    /// Colour shift gained per unit of mean absolute amplitude.
    pub color_shift_rate: f32,
    pub clear_color: [f64; 4],
    pub camera: CameraConfig,
    pub object: ObjectPlacement,
    pub lattice_scale: LatticeScale,
    pub wave: WavePolicy,
    pub motion: ObjectMotion,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            vertex_program: DEFAULT_VERTEX_PROGRAM.to_string(),
            fragment_program: DEFAULT_FRAGMENT_PROGRAM.to_string(),
            lattice_cols: 20,
            lattice_rows: 25,
            samples_per_row: 512,
            inflight_frames: MAX_INFLIGHT_FRAMES,
            ingest_capacity: 64,
            color_shift_rate: 0.5,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            camera: CameraConfig::default(),
            object: ObjectPlacement::default(),
            lattice_scale: LatticeScale::default(),
            wave: WavePolicy::default(),
            motion: ObjectMotion::default(),
        }
    }
}

impl RendererConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check the values `configure` cannot recover from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        QuadLatticeGenerator::new(self.lattice_cols, self.lattice_rows)?;
        if self.samples_per_row == 0 {
            return Err(ConfigError::ZeroSamplesPerRow);
        }
        if self.inflight_frames == 0 {
            return Err(ConfigError::ZeroInflightFrames);
        }
        if self.vertex_program.is_empty() {
            return Err(ConfigError::MissingProgram(self.vertex_program.clone()));
        }
        if self.fragment_program.is_empty() {
            return Err(ConfigError::MissingProgram(self.fragment_program.clone()));
        }
        Ok(())
    }

    /// Waveform rows: one per lattice row plus the row being written.
    pub fn waveform_rows(&self) -> usize {
        self.lattice_rows + 1
    }
}

/// Perspective camera looking at the lattice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub eye: [f32; 3],
    pub target: [f32; 3],
    pub up: [f32; 3],
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: [0.0, 0.0, 6.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fov_degrees: 65.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl CameraConfig {
    /// Projection times view for a drawable of the given size.
    pub fn view_proj(&self, width: u32, height: u32) -> Mat4 {
        let aspect = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
        let proj = Mat4::perspective_rh(self.fov_degrees.to_radians(), aspect, self.near, self.far);
        let view = Mat4::look_at_rh(
            Vec3::from_array(self.eye),
            Vec3::from_array(self.target),
            Vec3::from_array(self.up),
        );
        proj * view
    }
}

/// Initial transform of the composite before the lattice scale is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectPlacement {
    pub position: [f32; 3],
    pub scale: [f32; 3],
    pub rotation_angle: f32,
    pub rotation_axis: [f32; 3],
}

impl Default for ObjectPlacement {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 2.0],
            scale: [0.6, 0.6, 0.6],
            rotation_angle: 90.0,
            rotation_axis: [1.0, 1.0, 1.0],
        }
    }
}

impl ObjectPlacement {
    pub fn apply(&self, transform: &mut Transform) -> Result<(), ConfigError> {
        transform.set(
            Vec3::from_array(self.position),
            self.rotation_angle,
            Vec3::from_array(self.rotation_axis),
            Vec3::from_array(self.scale),
        )?;
        Ok(())
    }
}
