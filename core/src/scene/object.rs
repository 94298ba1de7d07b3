//! Scene objects: vertex data plus transform plus an owned uniform slot.

use glam::Vec3;

use super::transform::{ModelUniforms, Transform};

/// Vertex with homogeneous position and texture coordinates.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TexturedVertex {
    pub position: [f32; 4],
    pub tex_coords: [f32; 2],
}

impl TexturedVertex {
    pub const fn new(position: [f32; 4], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            tex_coords,
        }
    }

    /// Component-wise `a * (1 - t) + b * t`.
    ///
    /// Uses this form rather than `a + (b - a) * t` so that `t == 0` and
    /// `t == 1` reproduce the endpoints bit-exactly.
    pub fn lerp(a: &Self, b: &Self, t: f32) -> Self {
        let mix = |x: f32, y: f32| x * (1.0 - t) + y * t;
        Self {
            position: [
                mix(a.position[0], b.position[0]),
                mix(a.position[1], b.position[1]),
                mix(a.position[2], b.position[2]),
                mix(a.position[3], b.position[3]),
            ],
            tex_coords: [
                mix(a.tex_coords[0], b.tex_coords[0]),
                mix(a.tex_coords[1], b.tex_coords[1]),
            ],
        }
    }

    pub fn xyz(&self) -> Vec3 {
        Vec3::new(self.position[0], self.position[1], self.position[2])
    }
}

/// A quad given by its four corners.
///
/// Parametric coordinates run `u` from left to right and `v` from top to bottom,
/// matching texture space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Quad {
    pub top_left: TexturedVertex,
    pub top_right: TexturedVertex,
    pub bottom_left: TexturedVertex,
    pub bottom_right: TexturedVertex,
}

impl Quad {
    /// Vertices emitted per quad (two triangles).
    pub const VERTEX_COUNT: usize = 6;

    /// Unit quad spanning -1..1 on X and Y at z = 0 with full texture coverage.
    pub fn unit() -> Self {
        Self {
            top_left: TexturedVertex::new([-1.0, 1.0, 0.0, 1.0], [0.0, 0.0]),
            top_right: TexturedVertex::new([1.0, 1.0, 0.0, 1.0], [1.0, 0.0]),
            bottom_left: TexturedVertex::new([-1.0, -1.0, 0.0, 1.0], [0.0, 1.0]),
            bottom_right: TexturedVertex::new([1.0, -1.0, 0.0, 1.0], [1.0, 1.0]),
        }
    }

    /// Bilinear interpolation of the corners at parametric `(u, v)`.
    pub fn point(&self, u: f32, v: f32) -> TexturedVertex {
        let top = TexturedVertex::lerp(&self.top_left, &self.top_right, u);
        let bottom = TexturedVertex::lerp(&self.bottom_left, &self.bottom_right, u);
        TexturedVertex::lerp(&top, &bottom, v)
    }

    /// Two counter-clockwise triangles: `TL, BL, TR` and `TR, BL, BR`.
    pub fn triangles(&self) -> [TexturedVertex; Self::VERTEX_COUNT] {
        [
            self.top_left,
            self.bottom_left,
            self.top_right,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
        ]
    }

    /// Recover the corners from a vertex run produced by [`Quad::triangles`].
    pub fn from_triangles(vertices: &[TexturedVertex]) -> Option<Self> {
        if vertices.len() != Self::VERTEX_COUNT {
            return None;
        }
        Some(Self {
            top_left: vertices[0],
            bottom_left: vertices[1],
            top_right: vertices[2],
            bottom_right: vertices[5],
        })
    }

    /// Average of the four corner positions.
    pub fn center(&self) -> Vec3 {
        (self.top_left.xyz() + self.top_right.xyz() + self.bottom_left.xyz() + self.bottom_right.xyz())
            * 0.25
    }

    pub fn corners(&self) -> [TexturedVertex; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
        ]
    }
}

/// Default rates for the time-based motion helpers.
pub const DEFAULT_ROTATION_RATE: f32 = 10.0;
pub const DEFAULT_TRANSLATION_RATE: f32 = 0.1;
pub const DEFAULT_SCALE_RATE: f32 = 0.1;

/// Drawable object with its own transform and uniform slot.
///
/// The uniform slot is written only through [`SceneObject::sync_uniform`].
#[derive(Debug, Clone)]
pub struct SceneObject {
    name: String,
    vertices: Vec<TexturedVertex>,
    pub transform: Transform,
    uniform: ModelUniforms,
    uniform_syncs: u64,
    /// Degrees per second used by [`SceneObject::rotate_for_time`].
    pub rotation_rate: f32,
    pub translation_rate: f32,
    pub scale_rate: f32,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, vertices: Vec<TexturedVertex>) -> Self {
        let mut object = Self {
            name: name.into(),
            vertices,
            transform: Transform::IDENTITY,
            uniform: ModelUniforms::default(),
            uniform_syncs: 0,
            rotation_rate: DEFAULT_ROTATION_RATE,
            translation_rate: DEFAULT_TRANSLATION_RATE,
            scale_rate: DEFAULT_SCALE_RATE,
        };
        object.sync_uniform();
        object
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[TexturedVertex] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub(crate) fn replace_vertices(&mut self, vertices: Vec<TexturedVertex>) {
        self.vertices = vertices;
    }

    /// Copy the current model matrix into the uniform slot.
    pub fn sync_uniform(&mut self) {
        self.uniform.model = self.transform.model_matrix().to_cols_array_2d();
        self.uniform_syncs += 1;
    }

    /// Uniform contents as of the last sync.
    pub fn uniform(&self) -> &ModelUniforms {
        &self.uniform
    }

    /// Number of syncs since creation (creation counts as one).
    pub fn uniform_syncs(&self) -> u64 {
        self.uniform_syncs
    }

    /// Advance the rotation angle by `rotation_rate * dt * factor` degrees.
    pub fn rotate_for_time(&mut self, dt: f32, factor: f32) -> f32 {
        let rotation = self.rotation_rate * dt * factor;
        self.transform.rotation_angle += rotation;
        rotation
    }

    /// Advance the position by `translation_rate * dt * direction`.
    pub fn translate_for_time(&mut self, dt: f32, direction: Vec3) -> Vec3 {
        let translation = self.translation_rate * dt * direction;
        self.transform.position += translation;
        translation
    }

    /// Grow the scale by `scale_rate * dt * amount`.
    pub fn scale_for_time(&mut self, dt: f32, amount: Vec3) -> Vec3 {
        let delta = self.scale_rate * dt * amount;
        self.transform.scale += delta;
        delta
    }
}
