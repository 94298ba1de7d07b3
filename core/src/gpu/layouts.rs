//! Bind group layout builders.

use wgpu::{BindGroupLayout, BindGroupLayoutEntry, Device, ShaderStages};

/// Builder for bind group layouts.
pub struct BindGroupLayoutBuilder {
    label: Option<&'static str>,
    entries: Vec<BindGroupLayoutEntry>,
}

impl BindGroupLayoutBuilder {
    pub fn new(label: &'static str) -> Self {
        Self {
            label: Some(label),
            entries: Vec::new(),
        }
    }

    /// Add a uniform buffer entry.
    pub fn uniform(self, binding: u32, visibility: ShaderStages) -> Self {
        self.buffer(binding, visibility, wgpu::BufferBindingType::Uniform)
    }

    /// Add a read-only storage buffer entry.
    pub fn storage(self, binding: u32, visibility: ShaderStages) -> Self {
        self.buffer(
            binding,
            visibility,
            wgpu::BufferBindingType::Storage { read_only: true },
        )
    }

    fn buffer(
        mut self,
        binding: u32,
        visibility: ShaderStages,
        ty: wgpu::BufferBindingType,
    ) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
        self
    }

    /// Add a filterable 2D texture entry.
    pub fn texture_2d(mut self, binding: u32, visibility: ShaderStages) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        self
    }

    /// Add a filtering sampler entry.
    pub fn sampler(mut self, binding: u32, visibility: ShaderStages) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        self
    }

    pub fn build(self, device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: self.label,
            entries: &self.entries,
        })
    }
}

/// Bindings of the lattice programs, in the order they are bound each frame.
pub mod binding {
    pub const FRAME: u32 = 0;
    pub const CELLS: u32 = 1;
    pub const WAVEFORM: u32 = 2;
    pub const CIRCULAR_PARAMS: u32 = 3;
    pub const LATTICE_SIZE: u32 = 4;
    pub const TEXTURE: u32 = 5;
    pub const SAMPLER: u32 = 6;
}

/// Layout for one frame slot of the lattice programs.
pub fn create_lattice_layout(device: &Device) -> BindGroupLayout {
    let both = ShaderStages::VERTEX | ShaderStages::FRAGMENT;
    BindGroupLayoutBuilder::new("lattice_bind_group_layout")
        .uniform(binding::FRAME, both)
        .storage(binding::CELLS, ShaderStages::VERTEX)
        .storage(binding::WAVEFORM, ShaderStages::VERTEX)
        .uniform(binding::CIRCULAR_PARAMS, ShaderStages::VERTEX)
        .uniform(binding::LATTICE_SIZE, ShaderStages::VERTEX)
        .texture_2d(binding::TEXTURE, ShaderStages::FRAGMENT)
        .sampler(binding::SAMPLER, ShaderStages::FRAGMENT)
        .build(device)
}
