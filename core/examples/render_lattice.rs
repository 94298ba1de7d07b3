//! Example: Render the audio-reactive lattice offscreen and save the last frame.
//!
//! Feeds a synthetic sine (or an audio file, if given) into the renderer one row
//! per frame and writes a PNG.
//!
//! Run with:
//!     cargo run --example render_lattice --features tokio -- [audio-file] [config.json]

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use wavelattice::audio::{load_audio, sine_rows, AudioReactive};
use wavelattice::gpu::{BufferTexture, GpuContext, OffscreenTarget, WgpuBackend};
use wavelattice::render::{FrameClock, Renderer, RendererConfig};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;
const FPS: u32 = 60;
const FRAMES: usize = 180;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let audio_path = args.next();
    let config = match args.next() {
        Some(path) => RendererConfig::from_json_file(Path::new(&path))
            .with_context(|| format!("loading {}", path))?,
        None => RendererConfig::default(),
    };

    let rows = match &audio_path {
        Some(path) => {
            let audio = load_audio(Path::new(path)).with_context(|| format!("decoding {}", path))?;
            log::info!(
                "Loaded {} ({:.2}s, {} Hz, {} channels)",
                path,
                audio.duration(),
                audio.sample_rate,
                audio.channels
            );
            audio.rows(config.samples_per_row)
        }
        None => sine_rows(220.0, 44100, config.samples_per_row, FRAMES, 0.8),
    };

    let ctx = GpuContext::new().await?;
    log::info!("GPU: {}", ctx.adapter_info().name);

    let backend = WgpuBackend::new(&ctx, Box::new(BufferTexture::new(256, 256, 7)));
    let mut target = OffscreenTarget::new(&ctx, WIDTH, HEIGHT);
    let mut renderer = Renderer::new(backend, config);
    renderer.configure(&target)?;

    let mut clock = FrameClock::manual();
    let frame_time = Duration::from_secs_f64(1.0 / FPS as f64);
    for frame in 0..FRAMES {
        if let Some(row) = rows.get(frame) {
            renderer.on_samples(row);
        }
        clock.advance(frame_time);
        renderer.update(&clock);
        renderer.encode(&mut target);
    }
    ctx.wait_idle();

    let output = Path::new("lattice_frame.png");
    target.save_png(output)?;
    log::info!(
        "Rendered {} frames ({} skipped), color shift {:.2}",
        renderer.frames_encoded(),
        renderer.frames_skipped(),
        renderer.color_shift()
    );

    renderer.teardown();
    Ok(())
}
