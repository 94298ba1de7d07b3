//! Seams between the renderer state machine and the graphics API.
//!
//! The renderer owns the frame lifecycle; a backend owns GPU objects. The wgpu
//! implementation lives in `crate::gpu`, tests drive the renderer with a
//! recording backend.

use std::fmt;

use super::error::{ConfigError, FrameError};
use crate::scene::{CellUniforms, TexturedVertex};
use crate::sync::InflightPermit;
use crate::waveform::{CircularParams, RowWrite, WaveformRegion};

/// Where frames are drawn.
pub trait PresentationTarget {
    type Drawable;

    /// Current size in pixels.
    fn drawable_size(&self) -> (u32, u32);

    fn pixel_format(&self) -> wgpu::TextureFormat;

    fn sample_count(&self) -> u32;

    /// Next drawable to render into, or `None` if the target has none to give.
    fn next_drawable(&mut self) -> Option<Self::Drawable>;
}

/// Maps program names to compiled program handles.
pub trait ProgramRegistry {
    type Program: Clone + fmt::Debug;

    fn resolve(&self, name: &str) -> Option<Self::Program>;
}

/// GPU side of the renderer.
pub trait RenderBackend: ProgramRegistry {
    type Target: PresentationTarget;

    /// Largest single buffer the backend can allocate, in bytes.
    fn max_buffer_bytes(&self) -> u64;

    fn build_pipeline(
        &mut self,
        descriptor: &PipelineDescriptor<Self::Program>,
    ) -> Result<(), ConfigError>;

    /// Create the vertex buffer, per-slot uniform storage and the waveform region.
    fn allocate(&mut self, scene: &SceneAllocation<'_>) -> Result<(), ConfigError>;

    /// Replace the vertex buffer contents after the lattice changed shape.
    fn write_vertices(&mut self, vertices: &[TexturedVertex]);

    /// Write one frame's uniforms into slot `slot`.
    fn write_frame(&mut self, slot: usize, frame: &FrameUniforms, cells: &[CellUniforms]);

    /// Mirror one waveform row and the updated circular parameters.
    fn write_waveform(&mut self, write: RowWrite, row: &[f32], params: CircularParams);

    /// Record and submit the draw. `permit` must be dropped once the GPU is done
    /// with the frame, or immediately if nothing was submitted.
    fn encode(
        &mut self,
        drawable: <Self::Target as PresentationTarget>::Drawable,
        pass: &EncodePass,
        permit: InflightPermit,
    ) -> Result<(), FrameError>;

    /// Called when every in-flight slot is held, right before `update` blocks.
    /// Backends whose completion callbacks only run when the CPU drives the
    /// device do that here.
    fn drive_completions(&mut self) {}

    /// Drop GPU resources. The backend is not used again.
    fn release(&mut self) {}
}

/// Depth test settings recorded in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthPolicy {
    pub compare: wgpu::CompareFunction,
    pub write_enabled: bool,
    /// `None` draws without a depth attachment.
    pub format: Option<wgpu::TextureFormat>,
}

impl Default for DepthPolicy {
    fn default() -> Self {
        Self {
            compare: wgpu::CompareFunction::Always,
            write_enabled: true,
            format: None,
        }
    }
}

/// Fixed-function state and programs for the lattice pipeline.
#[derive(Debug, Clone)]
pub struct PipelineDescriptor<P> {
    pub vertex: P,
    pub fragment: P,
    pub front_face: wgpu::FrontFace,
    pub cull_mode: Option<wgpu::Face>,
    pub topology: wgpu::PrimitiveTopology,
    pub depth: DepthPolicy,
    pub color_format: wgpu::TextureFormat,
    pub sample_count: u32,
}

/// Buffers the backend must create during configure.
#[derive(Debug, Clone, Copy)]
pub struct SceneAllocation<'a> {
    pub vertices: &'a [TexturedVertex],
    pub cell_count: usize,
    /// Number of per-frame uniform slots, equal to the gate capacity.
    pub slots: usize,
    pub waveform: WaveformRegion<'a>,
    pub lattice: LatticeSize,
}

/// Per-frame uniforms shared by every vertex of the draw.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    /// Composite model matrix
    pub model: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    /// Seconds since start
    pub time: f32,
    pub color_shift: f32,
    pub _padding: [f32; 2],
}

/// Lattice dimensions as seen by the vertex program.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LatticeSize {
    pub cols: u32,
    pub rows: u32,
    pub _padding: [u32; 2],
}

impl LatticeSize {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols: cols as u32,
            rows: rows as u32,
            _padding: [0; 2],
        }
    }
}

/// What one encode call draws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodePass {
    /// Uniform slot written by the matching update.
    pub slot: usize,
    pub vertex_count: u32,
    pub clear_color: [f64; 4],
}
