//! Renderer state machine.
//!
//! One `Renderer` drives the whole frame lifecycle from an injected
//! [`RendererConfig`]:
//!
//! ```text
//! Unconfigured --configure--> Configured --update--> Updating --encode--> Encoding
//!                                              ^                              |
//!                                              +-----------update-------------+
//! any --teardown--> TornDown
//! ```
//!
//! `update` blocks on the in-flight gate, so at most `inflight_frames` frames
//! are ever between `update` and GPU completion.

pub mod backend;
pub mod clock;
pub mod config;
pub mod error;

use std::sync::Arc;

pub use backend::{
    DepthPolicy, EncodePass, FrameUniforms, LatticeSize, PipelineDescriptor, PresentationTarget,
    ProgramRegistry, RenderBackend, SceneAllocation,
};
pub use clock::FrameClock;
pub use config::{CameraConfig, ObjectPlacement, RendererConfig};
pub use error::{ConfigError, FrameError, RenderError};

use crate::audio::{ingest_channel, AudioReactive, IngestQueue, SampleIngest};
use crate::scene::{
    AnimationPolicy, CellUniforms, LatticeNode, Quad, QuadLatticeGenerator, SceneObject,
};
use crate::sync::{InflightGate, InflightPermit};
use crate::waveform::CircularWaveformBuffer;

/// Lifecycle state. `Updating` and `Encoding` name the phase that last completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Unconfigured,
    Configured,
    Updating,
    Encoding,
    TornDown,
}

/// Frame prepared by `update` and waiting for `encode`.
struct PendingFrame {
    slot: usize,
    permit: InflightPermit,
}

/// Audio-reactive lattice renderer over a [`RenderBackend`].
pub struct Renderer<B: RenderBackend> {
    backend: B,
    config: RendererConfig,
    state: RendererState,
    gate: Arc<InflightGate>,
    pending: Option<PendingFrame>,
    frame_index: u64,
    ingest: SampleIngest,
    queue: IngestQueue,
    policy: Box<dyn AnimationPolicy>,
    lattice: Option<LatticeNode>,
    waveform: Option<CircularWaveformBuffer>,
    uploaded_generation: u64,
    cell_scratch: Vec<CellUniforms>,
    color_shift: f32,
    drawable_size: (u32, u32),
    frames_encoded: u64,
    frames_skipped: u64,
}

impl<B: RenderBackend> Renderer<B> {
    /// Create an unconfigured renderer animated by `config.wave`.
    pub fn new(backend: B, config: RendererConfig) -> Self {
        let (ingest, queue) = ingest_channel(config.ingest_capacity);
        let policy: Box<dyn AnimationPolicy> = Box::new(config.wave.clone());
        Self {
            backend,
            gate: InflightGate::new(config.inflight_frames),
            state: RendererState::Unconfigured,
            pending: None,
            frame_index: 0,
            ingest,
            queue,
            policy,
            lattice: None,
            waveform: None,
            uploaded_generation: 0,
            cell_scratch: Vec::new(),
            color_shift: 0.0,
            drawable_size: (0, 0),
            frames_encoded: 0,
            frames_skipped: 0,
            config,
        }
    }

    /// Replace the cell animation with a custom policy.
    pub fn with_policy<P>(mut self, policy: P) -> Self
    where
        P: AnimationPolicy + 'static,
    {
        self.policy = Box::new(policy);
        self
    }

    /// Build the pipeline, the lattice and every GPU resource.
    ///
    /// On failure the error is logged once and returned, and the renderer stays
    /// `Unconfigured` with `update`/`encode` as no-ops.
    pub fn configure(&mut self, target: &B::Target) -> Result<(), RenderError> {
        match self.state {
            RendererState::Unconfigured => {}
            RendererState::TornDown => return Err(ConfigError::TornDown.into()),
            _ => return Err(ConfigError::AlreadyConfigured.into()),
        }

        match self.build(target) {
            Ok((lattice, waveform)) => {
                log::info!(
                    "Renderer configured: {}x{} lattice, {} vertices, {} waveform rows of {} samples, {} in-flight frames",
                    self.config.lattice_cols,
                    self.config.lattice_rows,
                    lattice.vertex_count(),
                    waveform.rows(),
                    waveform.samples_per_row(),
                    self.gate.capacity()
                );
                self.uploaded_generation = lattice.vertex_generation();
                self.lattice = Some(lattice);
                self.waveform = Some(waveform);
                self.drawable_size = target.drawable_size();
                self.state = RendererState::Configured;
                Ok(())
            }
            Err(e) => {
                log::error!("Renderer configuration failed: {}", e);
                Err(e)
            }
        }
    }

    fn build(
        &mut self,
        target: &B::Target,
    ) -> Result<(LatticeNode, CircularWaveformBuffer), RenderError> {
        let config = &self.config;
        config.validate()?;

        let vertex = self
            .backend
            .resolve(&config.vertex_program)
            .ok_or_else(|| ConfigError::MissingProgram(config.vertex_program.clone()))?;
        let fragment = self
            .backend
            .resolve(&config.fragment_program)
            .ok_or_else(|| ConfigError::MissingProgram(config.fragment_program.clone()))?;

        self.backend.build_pipeline(&PipelineDescriptor {
            vertex,
            fragment,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            topology: wgpu::PrimitiveTopology::TriangleList,
            depth: DepthPolicy::default(),
            color_format: target.pixel_format(),
            sample_count: target.sample_count(),
        })?;

        let mut lattice = QuadLatticeGenerator::new(config.lattice_cols, config.lattice_rows)
            .map_err(ConfigError::from)?
            .generate(&Quad::unit());
        let dims = lattice.dims();
        let composite = lattice.composite_mut();
        config.object.apply(&mut composite.transform)?;
        config.lattice_scale.apply(dims, &mut composite.transform);
        lattice.sync_uniforms();

        let waveform = CircularWaveformBuffer::configure_with_limit(
            config.samples_per_row,
            config.waveform_rows(),
            self.backend.max_buffer_bytes(),
        )?;

        self.backend.allocate(&SceneAllocation {
            vertices: lattice.vertices(),
            cell_count: dims.cell_count(),
            slots: self.gate.capacity(),
            waveform: waveform.as_readable_region(),
            lattice: LatticeSize::new(dims.cols, dims.rows),
        })?;

        Ok((lattice, waveform))
    }

    /// Prepare the next frame: take an in-flight slot (blocking while all are
    /// held), apply pending audio rows, animate and write the slot's uniforms.
    pub fn update(&mut self, clock: &FrameClock) {
        match self.state {
            RendererState::Configured | RendererState::Updating | RendererState::Encoding => {}
            RendererState::Unconfigured | RendererState::TornDown => return,
        }

        if let Some(stale) = self.pending.take() {
            log::debug!("Frame in slot {} was never encoded, releasing it", stale.slot);
            self.frames_skipped += 1;
        }

        let permit = match self.gate.try_acquire() {
            Some(permit) => permit,
            None => {
                self.backend.drive_completions();
                self.gate.acquire()
            }
        };
        let slot = (self.frame_index % self.gate.capacity() as u64) as usize;
        self.frame_index += 1;

        self.apply_ingested();

        let Some(lattice) = self.lattice.as_mut() else {
            return;
        };
        let (elapsed, delta) = (clock.elapsed(), clock.delta());
        lattice.update_cell_transforms(elapsed, self.policy.as_ref());
        self.config
            .motion
            .apply(lattice.composite_mut(), delta, elapsed);
        lattice.sync_uniforms();

        if lattice.vertex_generation() != self.uploaded_generation {
            self.backend.write_vertices(lattice.vertices());
            self.uploaded_generation = lattice.vertex_generation();
        }

        lattice.fill_cell_uniforms(&mut self.cell_scratch);
        let (width, height) = self.drawable_size;
        let frame = FrameUniforms {
            model: lattice.composite_uniform().model,
            view_proj: self
                .config
                .camera
                .view_proj(width, height)
                .to_cols_array_2d(),
            time: elapsed,
            color_shift: self.color_shift,
            _padding: [0.0; 2],
        };
        self.backend.write_frame(slot, &frame, &self.cell_scratch);

        self.pending = Some(PendingFrame { slot, permit });
        self.state = RendererState::Updating;
    }

    fn apply_ingested(&mut self) {
        let Some(waveform) = self.waveform.as_mut() else {
            return;
        };
        for row in self.queue.drain() {
            self.color_shift += self.config.color_shift_rate * row.abs_average;
            let write = waveform.write_row(&row.samples);
            if let Some(stored) = waveform.row(write.slot) {
                self.backend
                    .write_waveform(write, stored, waveform.params());
            }
            log::trace!("Waveform row {} -> slot {}", write.sequence, write.slot);
        }
    }

    /// Submit the frame prepared by the last `update`.
    ///
    /// A missing drawable or a backend failure skips the frame and releases its slot.
    pub fn encode(&mut self, target: &mut B::Target) {
        match self.state {
            RendererState::Updating => {}
            RendererState::Configured | RendererState::Encoding => {
                log::warn!("Skipping frame: {}", FrameError::NotUpdated);
                self.frames_skipped += 1;
                return;
            }
            RendererState::Unconfigured | RendererState::TornDown => return,
        }
        self.state = RendererState::Encoding;

        let Some(pending) = self.pending.take() else {
            return;
        };
        self.drawable_size = target.drawable_size();

        let Some(drawable) = target.next_drawable() else {
            log::warn!("Skipping frame: {}", FrameError::MissingDrawable);
            self.frames_skipped += 1;
            return;
        };

        let pass = EncodePass {
            slot: pending.slot,
            vertex_count: self.vertex_count(),
            clear_color: self.config.clear_color,
        };
        match self.backend.encode(drawable, &pass, pending.permit) {
            Ok(()) => self.frames_encoded += 1,
            Err(e) => {
                log::warn!("Skipping frame: {}", e);
                self.frames_skipped += 1;
            }
        }
    }

    /// Release everything. Frames already submitted still release their slots
    /// when the GPU completes them.
    pub fn teardown(&mut self) {
        if self.state == RendererState::TornDown {
            return;
        }
        self.pending = None;
        self.backend.release();
        self.lattice = None;
        self.waveform = None;
        self.state = RendererState::TornDown;
        log::info!(
            "Renderer torn down after {} frames ({} skipped)",
            self.frames_encoded,
            self.frames_skipped
        );
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Handle for audio sources; usable from any thread.
    pub fn ingest(&self) -> SampleIngest {
        self.ingest.clone()
    }

    pub fn lattice(&self) -> Option<&LatticeNode> {
        self.lattice.as_ref()
    }

    /// Mutable lattice access. Shape changes are uploaded on the next `update`.
    pub fn lattice_mut(&mut self) -> Option<&mut LatticeNode> {
        self.lattice.as_mut()
    }

    pub fn composite(&self) -> Option<&SceneObject> {
        self.lattice.as_ref().map(LatticeNode::composite)
    }

    pub fn waveform(&self) -> Option<&CircularWaveformBuffer> {
        self.waveform.as_ref()
    }

    pub fn gate(&self) -> &Arc<InflightGate> {
        &self.gate
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn color_shift(&self) -> f32 {
        self.color_shift
    }

    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    fn vertex_count(&self) -> u32 {
        self.lattice
            .as_ref()
            .map_or(0, |lattice| lattice.vertex_count() as u32)
    }
}

impl<B: RenderBackend> AudioReactive for Renderer<B> {
    fn on_samples(&self, first_channel: &[f32]) {
        self.ingest.on_samples(first_channel);
    }

    fn on_channels(&self, channels: &[&[f32]]) {
        self.ingest.on_channels(channels);
    }
}
