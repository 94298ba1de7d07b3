//! Textures sampled by the lattice fragment program.

use std::path::Path;

use wgpu::{Device, Queue, Texture, TextureView};

use super::textures::TextureError;
use crate::audio::synth::lcg_next;

/// Something that can produce a bindable texture once a device exists.
pub trait TextureProvider {
    /// Upload to the GPU. Returns false if the texture cannot be created.
    fn finalize(&mut self, device: &Device, queue: &Queue) -> bool;

    /// Bindable view; `None` until `finalize` succeeds.
    fn view(&self) -> Option<&TextureView>;
}

struct Uploaded {
    _texture: Texture,
    view: TextureView,
}

fn upload_rgba(
    device: &Device,
    queue: &Queue,
    label: &str,
    (width, height): (u32, u32),
    pixels: &[u8],
) -> Option<Uploaded> {
    if width == 0 || height == 0 || pixels.len() != (width * height * 4) as usize {
        log::warn!("Texture '{}' has no usable pixels ({}x{})", label, width, height);
        return None;
    }
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Some(Uploaded {
        _texture: texture,
        view,
    })
}

/// Procedural RGBA noise texture.
pub struct BufferTexture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    uploaded: Option<Uploaded>,
}

impl BufferTexture {
    pub fn new(width: u32, height: u32, seed: u64) -> Self {
        let mut state = seed;
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            state = lcg_next(state);
            let [r, g, b, ..] = (state >> 32).to_le_bytes();
            pixels.extend_from_slice(&[r, g, b, 255]);
        }
        Self {
            width,
            height,
            pixels,
            uploaded: None,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl TextureProvider for BufferTexture {
    fn finalize(&mut self, device: &Device, queue: &Queue) -> bool {
        self.uploaded = upload_rgba(
            device,
            queue,
            "buffer_texture",
            (self.width, self.height),
            &self.pixels,
        );
        self.uploaded.is_some()
    }

    fn view(&self) -> Option<&TextureView> {
        self.uploaded.as_ref().map(|u| &u.view)
    }
}

/// Texture decoded from an image file.
pub struct ImageTexture {
    image: image::RgbaImage,
    uploaded: Option<Uploaded>,
}

impl ImageTexture {
    pub fn open(path: &Path) -> Result<Self, TextureError> {
        let image = image::open(path)?.to_rgba8();
        log::debug!(
            "Decoded {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Self::from_image(image))
    }

    pub fn from_image(image: image::RgbaImage) -> Self {
        Self {
            image,
            uploaded: None,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

impl TextureProvider for ImageTexture {
    fn finalize(&mut self, device: &Device, queue: &Queue) -> bool {
        self.uploaded = upload_rgba(
            device,
            queue,
            "image_texture",
            self.image.dimensions(),
            self.image.as_raw(),
        );
        self.uploaded.is_some()
    }

    fn view(&self) -> Option<&TextureView> {
        self.uploaded.as_ref().map(|u| &u.view)
    }
}
