//! Render targets, CPU readback and the offscreen presentation target.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use wgpu::{Device, Queue, Texture, TextureFormat, TextureUsages, TextureView};

use super::GpuContext;
use crate::render::PresentationTarget;

#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to map readback buffer: {0}")]
    Map(#[from] wgpu::BufferAsyncError),

    #[error("Device poll failed: {0}")]
    Poll(String),

    #[error("Readback callback was dropped")]
    CallbackDropped,

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Pixel buffer does not match {width}x{height}")]
    SizeMismatch { width: u32, height: u32 },
}

/// Texture plus its default view.
pub struct RenderTarget {
    texture: Texture,
    view: TextureView,
}

impl RenderTarget {
    pub fn new(
        device: &Device,
        label: &str,
        width: u32,
        height: u32,
        format: TextureFormat,
        usage: TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Color attachment that can be copied back to the CPU.
    pub fn for_output(
        device: &Device,
        label: &str,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Self {
        Self::new(
            device,
            label,
            width,
            height,
            format,
            TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_SRC,
        )
    }

    pub fn view(&self) -> &TextureView {
        &self.view
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// A fresh view of the same texture.
    pub fn create_view(&self) -> TextureView {
        self.texture
            .create_view(&wgpu::TextureViewDescriptor::default())
    }
}

/// Mappable buffer for copying a 4-byte-per-pixel texture to the CPU.
pub struct ReadbackBuffer {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_row_bytes: u32,
    unpadded_row_bytes: u32,
}

impl ReadbackBuffer {
    pub fn new(device: &Device, width: u32, height: u32) -> Self {
        let unpadded_row_bytes = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row_bytes = unpadded_row_bytes.div_ceil(align) * align;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_buffer"),
            size: (padded_row_bytes * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            width,
            height,
            padded_row_bytes,
            unpadded_row_bytes,
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Bytes per row including copy alignment padding.
    pub fn padded_row_bytes(&self) -> u32 {
        self.padded_row_bytes
    }

    /// Record a copy of `texture` into this buffer.
    pub fn copy_from(&self, encoder: &mut wgpu::CommandEncoder, texture: &Texture) {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_row_bytes),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Map the buffer and return tightly packed pixels.
    pub fn read_pixels(&self, device: &Device) -> Result<Vec<u8>, TextureError> {
        let buffer_slice = self.buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| TextureError::Poll(e.to_string()))?;
        receiver
            .recv()
            .map_err(|_| TextureError::CallbackDropped)??;

        let mut pixels = Vec::with_capacity((self.width * self.height * 4) as usize);
        {
            let data = buffer_slice.get_mapped_range();
            for row in 0..self.height {
                let start = (row * self.padded_row_bytes) as usize;
                let end = start + self.unpadded_row_bytes as usize;
                pixels.extend_from_slice(&data[start..end]);
            }
        }
        self.buffer.unmap();
        Ok(pixels)
    }
}

/// Headless presentation target: one RGBA texture that is always available.
pub struct OffscreenTarget {
    device: Arc<Device>,
    queue: Arc<Queue>,
    target: RenderTarget,
    readback: ReadbackBuffer,
    width: u32,
    height: u32,
    /// When false, `next_drawable` yields nothing, like a view that has gone away.
    available: bool,
}

impl OffscreenTarget {
    pub const FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

    pub fn new(ctx: &GpuContext, width: u32, height: u32) -> Self {
        let target = RenderTarget::for_output(&ctx.device, "offscreen_target", width, height, Self::FORMAT);
        let readback = ReadbackBuffer::new(&ctx.device, width, height);
        Self {
            device: Arc::clone(&ctx.device),
            queue: Arc::clone(&ctx.queue),
            target,
            readback,
            width,
            height,
            available: true,
        }
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Copy the current contents back as tightly packed RGBA8.
    pub fn capture(&self) -> Result<Vec<u8>, TextureError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("offscreen_capture"),
            });
        self.readback.copy_from(&mut encoder, self.target.texture());
        self.queue.submit(std::iter::once(encoder.finish()));
        self.readback.read_pixels(&self.device)
    }

    /// Capture the current contents and write them as a PNG.
    pub fn save_png(&self, path: &Path) -> Result<(), TextureError> {
        let pixels = self.capture()?;
        let image = image::RgbaImage::from_raw(self.width, self.height, pixels).ok_or(
            TextureError::SizeMismatch {
                width: self.width,
                height: self.height,
            },
        )?;
        image.save(path)?;
        log::info!("Saved frame to {}", path.display());
        Ok(())
    }
}

impl PresentationTarget for OffscreenTarget {
    type Drawable = TextureView;

    fn drawable_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pixel_format(&self) -> TextureFormat {
        Self::FORMAT
    }

    fn sample_count(&self) -> u32 {
        1
    }

    fn next_drawable(&mut self) -> Option<TextureView> {
        self.available.then(|| self.target.create_view())
    }
}
