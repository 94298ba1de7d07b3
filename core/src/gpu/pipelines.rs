//! Render pipeline construction.

use wgpu::{
    BindGroupLayout, ColorTargetState, Device, PipelineLayout, RenderPipeline, ShaderModule,
    TextureFormat, VertexBufferLayout,
};

use crate::scene::TexturedVertex;

const TEXTURED_VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x2];

/// Vertex buffer layout of [`TexturedVertex`].
pub fn textured_vertex_layout() -> VertexBufferLayout<'static> {
    VertexBufferLayout {
        array_stride: std::mem::size_of::<TexturedVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &TEXTURED_VERTEX_ATTRIBUTES,
    }
}

/// Builder for render pipelines whose stages may come from different modules.
pub struct RenderPipelineBuilder<'a> {
    label: Option<&'static str>,
    layout: Option<&'a PipelineLayout>,
    vertex: (&'a ShaderModule, &'a str),
    fragment: (&'a ShaderModule, &'a str),
    vertex_buffers: Vec<VertexBufferLayout<'static>>,
    format: TextureFormat,
    primitive: wgpu::PrimitiveState,
    sample_count: u32,
}

impl<'a> RenderPipelineBuilder<'a> {
    pub fn new(
        label: &'static str,
        vertex: (&'a ShaderModule, &'a str),
        fragment: (&'a ShaderModule, &'a str),
    ) -> Self {
        Self {
            label: Some(label),
            layout: None,
            vertex,
            fragment,
            vertex_buffers: Vec::new(),
            format: TextureFormat::Rgba8Unorm,
            primitive: wgpu::PrimitiveState::default(),
            sample_count: 1,
        }
    }

    pub fn layout(mut self, layout: &'a PipelineLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn vertex_buffers(mut self, buffers: Vec<VertexBufferLayout<'static>>) -> Self {
        self.vertex_buffers = buffers;
        self
    }

    pub fn format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    /// Winding, culling and topology.
    pub fn primitive(
        mut self,
        topology: wgpu::PrimitiveTopology,
        front_face: wgpu::FrontFace,
        cull_mode: Option<wgpu::Face>,
    ) -> Self {
        self.primitive = wgpu::PrimitiveState {
            topology,
            front_face,
            cull_mode,
            ..Default::default()
        };
        self
    }

    pub fn sample_count(mut self, count: u32) -> Self {
        self.sample_count = count.max(1);
        self
    }

    pub fn build(self, device: &Device) -> RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: self.label,
            layout: self.layout,
            vertex: wgpu::VertexState {
                module: self.vertex.0,
                entry_point: Some(self.vertex.1),
                buffers: &self.vertex_buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: self.fragment.0,
                entry_point: Some(self.fragment.1),
                targets: &[Some(ColorTargetState {
                    format: self.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: self.primitive,
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: self.sample_count,
                ..Default::default()
            },
            multiview_mask: None,
            cache: None,
        })
    }
}

/// Create a pipeline layout from bind group layouts.
pub fn create_pipeline_layout(
    device: &Device,
    label: &'static str,
    layouts: &[&BindGroupLayout],
) -> PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: layouts,
        immediate_size: 0,
    })
}
