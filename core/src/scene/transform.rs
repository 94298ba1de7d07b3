//! Per-object transform state and model matrix composition.

use glam::{Mat4, Vec3};

use super::SceneError;

/// Model matrix as laid out in a GPU uniform slot.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniforms {
    pub model: [[f32; 4]; 4],
}

impl Default for ModelUniforms {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

/// Position, rotation and scale of a scene object.
///
/// The model matrix is always recomputed from these fields as
/// `translate(position) * rotate(rotation_angle, rotation_axis) * scale(scale)`.
/// Nothing is accumulated into the matrix between frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub scale: Vec3,
    /// Rotation angle in degrees.
    pub rotation_angle: f32,
    /// Rotation axis; need not be normalized. A zero axis means no rotation.
    pub rotation_axis: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        scale: Vec3::ONE,
        rotation_angle: 0.0,
        rotation_axis: Vec3::Z,
    };

    /// Replace the whole transform state.
    ///
    /// Non-finite components are rejected and leave the state untouched.
    pub fn set(
        &mut self,
        position: Vec3,
        rotation_angle: f32,
        rotation_axis: Vec3,
        scale: Vec3,
    ) -> Result<(), SceneError> {
        if !position.is_finite()
            || !rotation_angle.is_finite()
            || !rotation_axis.is_finite()
            || !scale.is_finite()
        {
            return Err(SceneError::NonFinite);
        }
        self.position = position;
        self.rotation_angle = rotation_angle;
        self.rotation_axis = rotation_axis;
        self.scale = scale;
        Ok(())
    }

    /// Rotation component alone.
    pub fn rotation_matrix(&self) -> Mat4 {
        if self.rotation_axis.length_squared() <= f32::EPSILON {
            return Mat4::IDENTITY;
        }
        Mat4::from_axis_angle(
            self.rotation_axis.normalize(),
            self.rotation_angle.to_radians(),
        )
    }

    /// Compose the model matrix from the current state.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * self.rotation_matrix()
            * Mat4::from_scale(self.scale)
    }
}
