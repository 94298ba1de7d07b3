//! Scene model: transforms, drawable objects and the quad lattice.
//!
//! This module provides:
//! - `Transform` with the `T * R * S` model matrix rule
//! - `SceneObject` owning vertices, a transform and its uniform slot
//! - `QuadLatticeGenerator` / `LatticeNode` for tiling a quad into cells
//! - Animation strategies that drive cell and composite transforms

pub mod animation;
pub mod lattice;
pub mod object;
pub mod transform;

use thiserror::Error;

pub use animation::{AnimationPolicy, LatticeScale, ObjectMotion, WavePolicy};
pub use lattice::{CellCoord, CellUniforms, LatticeDims, LatticeNode, QuadLatticeGenerator};
pub use object::{Quad, SceneObject, TexturedVertex};
pub use transform::{ModelUniforms, Transform};

/// Errors raised by the scene model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Transform components must be finite")]
    NonFinite,

    #[error("Lattice must have at least one column and one row, got {cols}x{rows}")]
    EmptyLattice { cols: usize, rows: usize },

    #[error("Cell ({col}, {row}) is outside the lattice")]
    CellOutOfRange { col: usize, row: usize },

    #[error("Cell vertex run must hold {expected} vertices, got {actual}")]
    CellVertexCount { expected: usize, actual: usize },
}
