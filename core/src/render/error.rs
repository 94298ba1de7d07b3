//! Error taxonomy of the renderer.
//!
//! Configuration and allocation errors abort `configure` and are returned to
//! the caller. Frame errors are logged and the frame is skipped.

use thiserror::Error;

use crate::scene::SceneError;
use crate::waveform::WaveformError;

/// Setup failed; the renderer stays inert.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid scene parameters: {0}")]
    Scene(#[from] SceneError),

    #[error("samples_per_row must be at least 1")]
    ZeroSamplesPerRow,

    #[error("inflight_frames must be at least 1")]
    ZeroInflightFrames,

    #[error("Program '{0}' not found in the registry")]
    MissingProgram(String),

    #[error("Pipeline creation failed: {0}")]
    Pipeline(String),

    #[error("Resource creation failed: {0}")]
    Resource(String),

    #[error("Texture unavailable: {0}")]
    Texture(String),

    #[error("Renderer is already configured")]
    AlreadyConfigured,

    #[error("Renderer has been torn down")]
    TornDown,

    #[error("Invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Error returned from `Renderer::configure`.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Allocation error: {0}")]
    Allocation(#[from] WaveformError),
}

/// A single frame could not be produced. Always recoverable.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("No drawable available")]
    MissingDrawable,

    #[error("Surface error: {0}")]
    Surface(String),

    #[error("encode called without a preceding update")]
    NotUpdated,
}
