//! wgpu implementation of [`RenderBackend`].

use std::collections::VecDeque;
use std::sync::Arc;

use wgpu::{
    BindGroup, BindGroupLayout, Buffer, Device, Queue, RenderPipeline, Sampler, SubmissionIndex,
    TextureView,
};

use super::layouts::{binding, create_lattice_layout};
use super::pipelines::{create_pipeline_layout, textured_vertex_layout, RenderPipelineBuilder};
use super::registry::{ShaderProgram, ShaderRegistry};
use super::texture_provider::TextureProvider;
use super::textures::OffscreenTarget;
use super::GpuContext;
use crate::render::{
    ConfigError, EncodePass, FrameError, FrameUniforms, LatticeSize, PipelineDescriptor,
    ProgramRegistry, RenderBackend, SceneAllocation,
};
use crate::scene::{CellUniforms, TexturedVertex};
use crate::sync::InflightPermit;
use crate::waveform::{CircularParams, RowWrite};

/// Buffers for one uniform slot.
struct FrameSlot {
    frame: Buffer,
    cells: Buffer,
    bind_group: BindGroup,
}

/// Everything `allocate` creates.
struct SceneResources {
    vertices: Buffer,
    waveform: Buffer,
    circular: Buffer,
    _lattice: Buffer,
    slots: Vec<FrameSlot>,
}

/// Draws the lattice with wgpu into an [`OffscreenTarget`].
pub struct WgpuBackend {
    device: Arc<Device>,
    queue: Arc<Queue>,
    registry: ShaderRegistry,
    texture: Box<dyn TextureProvider>,
    layout: BindGroupLayout,
    sampler: Sampler,
    pipeline: Option<RenderPipeline>,
    resources: Option<SceneResources>,
    /// Most recent submissions, oldest first, at most one per slot.
    submissions: VecDeque<SubmissionIndex>,
    max_buffer_bytes: u64,
}

impl WgpuBackend {
    /// Backend with the built-in programs and the given texture.
    pub fn new(ctx: &GpuContext, texture: Box<dyn TextureProvider>) -> Self {
        let layout = create_lattice_layout(&ctx.device);
        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lattice_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self {
            device: Arc::clone(&ctx.device),
            queue: Arc::clone(&ctx.queue),
            registry: ShaderRegistry::with_builtin(&ctx.device),
            texture,
            layout,
            sampler,
            pipeline: None,
            resources: None,
            submissions: VecDeque::new(),
            max_buffer_bytes: ctx.max_storage_bytes(),
        }
    }

    /// Register extra programs before `configure`.
    pub fn registry_mut(&mut self) -> &mut ShaderRegistry {
        &mut self.registry
    }

    fn buffer(&self, label: &str, size: u64, usage: wgpu::BufferUsages) -> Buffer {
        // Zero-sized bindings are invalid
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size.max(16),
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn bind_group(
        &self,
        texture: &TextureView,
        frame: &Buffer,
        cells: &Buffer,
        waveform: &Buffer,
        circular: &Buffer,
        lattice: &Buffer,
    ) -> BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lattice_bind_group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: binding::FRAME,
                    resource: frame.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: binding::CELLS,
                    resource: cells.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: binding::WAVEFORM,
                    resource: waveform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: binding::CIRCULAR_PARAMS,
                    resource: circular.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: binding::LATTICE_SIZE,
                    resource: lattice.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: binding::TEXTURE,
                    resource: wgpu::BindingResource::TextureView(texture),
                },
                wgpu::BindGroupEntry {
                    binding: binding::SAMPLER,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }
}

impl ProgramRegistry for WgpuBackend {
    type Program = ShaderProgram;

    fn resolve(&self, name: &str) -> Option<ShaderProgram> {
        self.registry.resolve(name)
    }
}

impl RenderBackend for WgpuBackend {
    type Target = OffscreenTarget;

    fn max_buffer_bytes(&self) -> u64 {
        self.max_buffer_bytes
    }

    fn build_pipeline(
        &mut self,
        descriptor: &PipelineDescriptor<ShaderProgram>,
    ) -> Result<(), ConfigError> {
        if let Some(format) = descriptor.depth.format {
            return Err(ConfigError::Pipeline(format!(
                "depth attachments are not supported (requested {:?})",
                format
            )));
        }

        let layout = create_pipeline_layout(&self.device, "lattice_pipeline_layout", &[&self.layout]);
        let vertex = &descriptor.vertex;
        let fragment = &descriptor.fragment;
        // Validation failures would otherwise reach the uncaptured error handler
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = RenderPipelineBuilder::new(
            "lattice_pipeline",
            (vertex.module.as_ref(), vertex.entry_point.as_str()),
            (fragment.module.as_ref(), fragment.entry_point.as_str()),
        )
        .layout(&layout)
        .vertex_buffers(vec![textured_vertex_layout()])
        .format(descriptor.color_format)
        .primitive(descriptor.topology, descriptor.front_face, descriptor.cull_mode)
        .sample_count(descriptor.sample_count)
        .build(&self.device);
        if let Some(error) = pollster::block_on(scope.pop()) {
            return Err(ConfigError::Pipeline(error.to_string()));
        }

        log::debug!(
            "Built lattice pipeline ({} / {}, {:?})",
            vertex.entry_point,
            fragment.entry_point,
            descriptor.color_format
        );
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn allocate(&mut self, scene: &SceneAllocation<'_>) -> Result<(), ConfigError> {
        if !self.texture.finalize(&self.device, &self.queue) {
            return Err(ConfigError::Texture("texture provider could not finalize".into()));
        }
        let Some(texture_view) = self.texture.view().cloned() else {
            return Err(ConfigError::Texture("texture provider has no view".into()));
        };
        if scene.slots == 0 {
            return Err(ConfigError::ZeroInflightFrames);
        }

        let vertex_bytes: &[u8] = bytemuck::cast_slice(scene.vertices);
        let vertices = self.buffer(
            "lattice_vertices",
            vertex_bytes.len() as u64,
            wgpu::BufferUsages::VERTEX,
        );
        self.queue.write_buffer(&vertices, 0, vertex_bytes);

        let waveform_bytes = scene.waveform.size_bytes();
        if waveform_bytes > self.max_buffer_bytes {
            return Err(ConfigError::Resource(format!(
                "waveform region of {} bytes exceeds device limit of {}",
                waveform_bytes, self.max_buffer_bytes
            )));
        }
        let waveform = self.buffer("lattice_waveform", waveform_bytes, wgpu::BufferUsages::STORAGE);
        self.queue
            .write_buffer(&waveform, 0, bytemuck::cast_slice(scene.waveform.samples));

        let circular = self.buffer(
            "lattice_circular_params",
            std::mem::size_of::<CircularParams>() as u64,
            wgpu::BufferUsages::UNIFORM,
        );
        self.queue
            .write_buffer(&circular, 0, bytemuck::bytes_of(&scene.waveform.params));

        let lattice = self.buffer(
            "lattice_size",
            std::mem::size_of::<LatticeSize>() as u64,
            wgpu::BufferUsages::UNIFORM,
        );
        self.queue
            .write_buffer(&lattice, 0, bytemuck::bytes_of(&scene.lattice));

        let cell_bytes = (scene.cell_count * std::mem::size_of::<CellUniforms>()) as u64;
        let slots = (0..scene.slots)
            .map(|_| {
                let frame = self.buffer(
                    "lattice_frame_uniforms",
                    std::mem::size_of::<FrameUniforms>() as u64,
                    wgpu::BufferUsages::UNIFORM,
                );
                let cells = self.buffer("lattice_cell_uniforms", cell_bytes, wgpu::BufferUsages::STORAGE);
                let bind_group =
                    self.bind_group(&texture_view, &frame, &cells, &waveform, &circular, &lattice);
                FrameSlot {
                    frame,
                    cells,
                    bind_group,
                }
            })
            .collect();

        log::debug!(
            "Allocated {} vertex bytes, {} waveform bytes, {} slots of {} cell bytes",
            vertex_bytes.len(),
            waveform_bytes,
            scene.slots,
            cell_bytes
        );
        self.resources = Some(SceneResources {
            vertices,
            waveform,
            circular,
            _lattice: lattice,
            slots,
        });
        Ok(())
    }

    fn write_vertices(&mut self, vertices: &[TexturedVertex]) {
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let grow = match self.resources.as_ref() {
            Some(resources) => resources.vertices.size() < bytes.len() as u64,
            None => return,
        };
        if grow {
            let buffer = self.buffer("lattice_vertices", bytes.len() as u64, wgpu::BufferUsages::VERTEX);
            if let Some(resources) = self.resources.as_mut() {
                resources.vertices = buffer;
            }
        }
        if let Some(resources) = self.resources.as_ref() {
            self.queue.write_buffer(&resources.vertices, 0, bytes);
        }
    }

    fn write_frame(&mut self, slot: usize, frame: &FrameUniforms, cells: &[CellUniforms]) {
        let Some(slot) = self.resources.as_ref().and_then(|r| r.slots.get(slot)) else {
            log::warn!("Frame slot {} was never allocated", slot);
            return;
        };
        self.queue.write_buffer(&slot.frame, 0, bytemuck::bytes_of(frame));
        if !cells.is_empty() {
            self.queue
                .write_buffer(&slot.cells, 0, bytemuck::cast_slice(cells));
        }
    }

    fn write_waveform(&mut self, write: RowWrite, row: &[f32], params: CircularParams) {
        let Some(resources) = self.resources.as_ref() else {
            return;
        };
        self.queue
            .write_buffer(&resources.waveform, write.byte_offset, bytemuck::cast_slice(row));
        self.queue
            .write_buffer(&resources.circular, 0, bytemuck::bytes_of(&params));
    }

    fn encode(
        &mut self,
        drawable: TextureView,
        pass: &EncodePass,
        permit: InflightPermit,
    ) -> Result<(), FrameError> {
        let (Some(pipeline), Some(resources)) = (self.pipeline.as_ref(), self.resources.as_ref())
        else {
            return Err(FrameError::Surface("backend has no pipeline or resources".into()));
        };
        let Some(slot) = resources.slots.get(pass.slot) else {
            return Err(FrameError::Surface(format!("no uniform slot {}", pass.slot)));
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lattice_encoder"),
            });
        {
            let [r, g, b, a] = pass.clear_color;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lattice_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &drawable,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &slot.bind_group, &[]);
            render_pass.set_vertex_buffer(0, resources.vertices.slice(..));
            render_pass.draw(0..pass.vertex_count, 0..1);
        }

        let submission = self.queue.submit(std::iter::once(encoder.finish()));
        // The slot is reusable once the GPU has consumed this submission
        self.queue.on_submitted_work_done(move || drop(permit));
        if self.submissions.len() == resources.slots.len() {
            self.submissions.pop_front();
        }
        self.submissions.push_back(submission);
        if let Err(e) = self.device.poll(wgpu::PollType::Poll) {
            log::debug!("Non-blocking poll failed: {}", e);
        }
        Ok(())
    }

    fn drive_completions(&mut self) {
        // Every slot is held, so the oldest tracked submission frees the next one
        let poll = match self.submissions.pop_front() {
            Some(index) => wgpu::PollType::Wait {
                submission_index: Some(index),
                timeout: None,
            },
            None => wgpu::PollType::wait_indefinitely(),
        };
        if let Err(e) = self.device.poll(poll) {
            log::warn!("Device poll failed: {}", e);
        }
    }

    fn release(&mut self) {
        self.resources = None;
        self.pipeline = None;
        self.submissions.clear();
        log::debug!("Released lattice GPU resources");
    }
}
