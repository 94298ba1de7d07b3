//! wgpu rendering for the lattice.
//!
//! Provides headless device creation, the shader program registry, texture
//! providers, and [`WgpuBackend`], the `RenderBackend` that draws the lattice
//! into an [`OffscreenTarget`].

pub mod backend;
pub mod context;
pub mod layouts;
pub mod pipelines;
pub mod registry;
pub mod texture_provider;
pub mod textures;

pub use backend::WgpuBackend;
pub use context::{GpuContext, GpuError};
pub use registry::{ShaderProgram, ShaderRegistry};
pub use texture_provider::{BufferTexture, ImageTexture, TextureProvider};
pub use textures::{OffscreenTarget, ReadbackBuffer, RenderTarget, TextureError};
