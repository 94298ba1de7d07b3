//! Wavelattice Core
//!
//! Real-time audio-reactive lattice renderer: a textured quad subdivided into a
//! grid of independently animated cells, lifted by a streaming waveform.
//!
//! # Features
//!
//! - Scene model with `T * R * S` transforms and a quad lattice generator
//! - Circular waveform buffer shared with the vertex program
//! - Renderer state machine with an in-flight frame gate
//! - Audio loading (WAV, MP3, FLAC, AAC) via Symphonia
//! - GPU rendering via wgpu (Metal on macOS, Vulkan on Linux)
//! - Microphone input via cpal (when the `capture` feature is enabled)

pub mod audio;
pub mod gpu;
pub mod render;
pub mod scene;
pub mod sync;
pub mod waveform;

// Re-export commonly used types
pub use audio::{load_audio, AudioData, AudioReactive, SampleIngest};
pub use gpu::{BufferTexture, GpuContext, ImageTexture, OffscreenTarget, WgpuBackend};
pub use render::{
    ConfigError, FrameClock, FrameError, RenderBackend, RenderError, Renderer, RendererConfig,
    RendererState,
};
pub use scene::{
    AnimationPolicy, CellCoord, LatticeDims, LatticeNode, Quad, QuadLatticeGenerator, SceneError,
    SceneObject, TexturedVertex, Transform, WavePolicy,
};
pub use sync::{InflightGate, InflightPermit, MAX_INFLIGHT_FRAMES};
pub use waveform::{CircularParams, CircularWaveformBuffer, RowWrite, WaveformError};
