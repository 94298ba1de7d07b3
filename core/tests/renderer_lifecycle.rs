//! Integration tests for the renderer state machine.


use std::io::Write;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use renderer_fixtures::{small_config, MockBackend, MockTarget};
use wavelattice::audio::AudioReactive;
use wavelattice::render::{
    ConfigError, FrameClock, RenderError, Renderer, RendererConfig, RendererState,
};
use wavelattice::scene::{CellCoord, LatticeDims, Quad, Transform};
use wavelattice::waveform::WaveformError;

fn configured(backend: MockBackend) -> (Renderer<MockBackend>, MockTarget) {
    let target = MockTarget::new(640, 480);
    let mut renderer = Renderer::new(backend, small_config());
    renderer.configure(&target).unwrap();
    (renderer, target)
}

fn frame(renderer: &mut Renderer<MockBackend>, target: &mut MockTarget, clock: &mut FrameClock) {
    clock.advance(Duration::from_millis(16));
    renderer.update(clock);
    renderer.encode(target);
}

// ==================== Configuration ====================

#[test]
fn test_configure_allocates_scene() {
    let (renderer, _target) = configured(MockBackend::new());
    assert_eq!(renderer.state(), RendererState::Configured);

    let backend = renderer.backend();
    assert_eq!(backend.pipelines.len(), 1);
    let pipeline = &backend.pipelines[0];
    assert_eq!(pipeline.vertex, "lattice_circular_wave");
    assert_eq!(pipeline.fragment, "tex_quad_periodic_color_shift");
    assert_eq!(pipeline.front_face, wgpu::FrontFace::Ccw);
    assert_eq!(pipeline.cull_mode, None);
    assert_eq!(pipeline.topology, wgpu::PrimitiveTopology::TriangleList);
    assert_eq!(pipeline.depth.compare, wgpu::CompareFunction::Always);
    assert!(pipeline.depth.write_enabled);
    assert_eq!(pipeline.color_format, wgpu::TextureFormat::Bgra8Unorm);

    // 4x3 cells, 6 vertices each; 3 lattice rows + 1 waveform rows of 16 samples
    let allocation = &backend.allocations[0];
    assert_eq!(allocation.vertex_count, 72);
    assert_eq!(allocation.cell_count, 12);
    assert_eq!(allocation.slots, 3);
    assert_eq!(allocation.waveform_bytes, 16 * 4 * 4);
    assert_eq!(allocation.params.rows, 4);
    assert_eq!(allocation.params.cursor, 0);
    assert_eq!(allocation.params.rows_written, 0);
}

#[test]
fn test_configure_twice_is_rejected() {
    let (mut renderer, target) = configured(MockBackend::new());
    let result = renderer.configure(&target);
    assert!(matches!(
        result,
        Err(RenderError::Configuration(ConfigError::AlreadyConfigured))
    ));
    assert_eq!(renderer.state(), RendererState::Configured);
    assert_eq!(renderer.backend().allocations.len(), 1);
}

#[test]
fn test_missing_program_leaves_renderer_inert() {
    let backend = MockBackend::new().without_program("tex_quad_periodic_color_shift");
    let mut target = MockTarget::new(640, 480);
    let mut renderer = Renderer::new(backend, small_config());

    match renderer.configure(&target) {
        Err(RenderError::Configuration(ConfigError::MissingProgram(name))) => {
            assert_eq!(name, "tex_quad_periodic_color_shift");
        }
        other => panic!("expected missing program, got {:?}", other),
    }
    assert_eq!(renderer.state(), RendererState::Unconfigured);

    let clock = FrameClock::manual();
    renderer.update(&clock);
    renderer.encode(&mut target);
    assert!(renderer.backend().frames.is_empty());
    assert!(renderer.backend().encodes.is_empty());
    assert_eq!(renderer.gate().in_flight(), 0);
    assert!(renderer.lattice().is_none());
}

#[test]
fn test_pipeline_failure_leaves_renderer_inert() {
    let backend = MockBackend {
        fail_pipeline: true,
        ..MockBackend::new()
    };
    let mut target = MockTarget::new(640, 480);
    let mut renderer = Renderer::new(backend, small_config());

    assert!(matches!(
        renderer.configure(&target),
        Err(RenderError::Configuration(ConfigError::Pipeline(_)))
    ));
    assert_eq!(renderer.state(), RendererState::Unconfigured);
    assert!(renderer.backend().allocations.is_empty());

    let clock = FrameClock::manual();
    renderer.update(&clock);
    renderer.encode(&mut target);
    assert!(renderer.backend().frames.is_empty());
    assert!(renderer.backend().encodes.is_empty());
    assert_eq!(target.handed_out, 0);
    assert_eq!(renderer.frames_encoded(), 0);
}

#[test]
fn test_allocation_failure_leaves_renderer_unconfigured() {
    let backend = MockBackend {
        fail_allocate: true,
        ..MockBackend::new()
    };
    let target = MockTarget::new(640, 480);
    let mut renderer = Renderer::new(backend, small_config());

    assert!(matches!(
        renderer.configure(&target),
        Err(RenderError::Configuration(ConfigError::Resource(_)))
    ));
    assert_eq!(renderer.state(), RendererState::Unconfigured);
    assert!(renderer.waveform().is_none());
}

#[test]
fn test_waveform_larger_than_device_limit() {
    let backend = MockBackend {
        max_buffer_bytes: 100,
        ..MockBackend::new()
    };
    let target = MockTarget::new(640, 480);
    let mut renderer = Renderer::new(backend, small_config());

    assert!(matches!(
        renderer.configure(&target),
        Err(RenderError::Allocation(WaveformError::Overflow { limit: 100, .. }))
    ));
    assert!(renderer.backend().allocations.is_empty());
}

#[test]
fn test_invalid_lattice_is_config_error() {
    let config = RendererConfig {
        lattice_cols: 0,
        ..small_config()
    };
    let target = MockTarget::new(640, 480);
    let mut renderer = Renderer::new(MockBackend::new(), config);

    assert!(matches!(
        renderer.configure(&target),
        Err(RenderError::Configuration(ConfigError::Scene(_)))
    ));
    assert!(renderer.backend().pipelines.is_empty());
}

#[test]
fn test_config_from_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "lattice_cols": 2,
            "lattice_rows": 2,
            "samples_per_row": 8,
            "inflight_frames": 2,
            "wave": {{ "kind": "static" }}
        }}"#
    )
    .unwrap();

    let config = RendererConfig::from_json_file(file.path()).unwrap();
    let target = MockTarget::new(320, 240);
    let mut renderer = Renderer::new(MockBackend::new(), config);
    renderer.configure(&target).unwrap();

    let allocation = &renderer.backend().allocations[0];
    assert_eq!(allocation.cell_count, 4);
    assert_eq!(allocation.slots, 2);
    assert_eq!(allocation.waveform_bytes, 8 * 3 * 4);
}

// ==================== Frame lifecycle ====================

#[test]
fn test_update_encode_cycle() {
    let (mut renderer, mut target) = configured(MockBackend::new());
    let clock = FrameClock::manual();

    renderer.update(&clock);
    assert_eq!(renderer.state(), RendererState::Updating);
    renderer.encode(&mut target);
    assert_eq!(renderer.state(), RendererState::Encoding);

    let backend = renderer.backend();
    assert_eq!(backend.encodes.len(), 1);
    assert_eq!(backend.encodes[0].slot, 0);
    assert_eq!(backend.encodes[0].vertex_count, 72);
    assert_eq!(backend.encodes[0].clear_color, [0.0, 0.0, 0.0, 1.0]);
    assert_eq!(backend.frames[0].2, 12);
    assert_eq!(renderer.frames_encoded(), 1);
}

#[test]
fn test_slots_rotate_through_capacity() {
    let (mut renderer, mut target) = configured(MockBackend::new());
    let mut clock = FrameClock::manual();

    for _ in 0..5 {
        frame(&mut renderer, &mut target, &mut clock);
    }

    let slots: Vec<usize> = renderer.backend().encodes.iter().map(|e| e.slot).collect();
    assert_eq!(slots, vec![0, 1, 2, 0, 1]);
    assert_eq!(renderer.gate().in_flight(), 0);
}

#[test]
fn test_encode_without_update_is_skipped() {
    let (mut renderer, mut target) = configured(MockBackend::new());

    renderer.encode(&mut target);
    assert_eq!(renderer.state(), RendererState::Configured);
    assert_eq!(renderer.frames_skipped(), 1);
    assert!(renderer.backend().encodes.is_empty());
    assert_eq!(target.handed_out, 0);
}

#[test]
fn test_missing_drawable_skips_frame_and_frees_slot() {
    let (backend, held) = MockBackend::holding();
    let (mut renderer, mut target) = configured(backend);
    target.available = false;

    let clock = FrameClock::manual();
    renderer.update(&clock);
    assert_eq!(renderer.gate().in_flight(), 1);
    renderer.encode(&mut target);

    assert_eq!(renderer.frames_skipped(), 1);
    assert_eq!(renderer.frames_encoded(), 0);
    assert!(renderer.backend().encodes.is_empty());
    assert!(held.lock().unwrap().is_empty());
    assert_eq!(renderer.gate().in_flight(), 0);

    // The next frame proceeds normally once a drawable is back
    target.available = true;
    renderer.update(&clock);
    renderer.encode(&mut target);
    assert_eq!(renderer.frames_encoded(), 1);
}

#[test]
fn test_second_update_releases_unencoded_frame() {
    let (backend, _held) = MockBackend::holding();
    let (mut renderer, _target) = configured(backend);
    let clock = FrameClock::manual();

    renderer.update(&clock);
    renderer.update(&clock);
    assert_eq!(renderer.frames_skipped(), 1);
    assert_eq!(renderer.gate().in_flight(), 1);
    assert_eq!(renderer.backend().frames.len(), 2);
}

#[test]
fn test_update_blocks_until_a_frame_completes() {
    let (backend, held) = MockBackend::holding();
    let (mut renderer, mut target) = configured(backend);
    let mut clock = FrameClock::manual();

    for _ in 0..3 {
        frame(&mut renderer, &mut target, &mut clock);
    }
    assert_eq!(renderer.gate().in_flight(), 3);

    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || {
        clock.advance(Duration::from_millis(16));
        renderer.update(&clock);
        tx.send(()).unwrap();
        renderer
    });

    assert!(
        rx.recv_timeout(Duration::from_millis(100)).is_err(),
        "update must block while every slot is in flight"
    );

    // Completing the oldest frame lets the blocked update through
    let oldest = held.lock().unwrap().remove(0);
    drop(oldest);
    rx.recv_timeout(Duration::from_secs(5))
        .expect("update should resume after a completion");

    let renderer = worker.join().unwrap();
    assert_eq!(renderer.state(), RendererState::Updating);
    assert_eq!(renderer.gate().in_flight(), 3);
    assert_eq!(renderer.backend().frames.last().unwrap().0, 0);
}

// ==================== Audio ====================

#[test]
fn test_ingested_rows_reach_waveform_and_color_shift() {
    let (mut renderer, mut target) = configured(MockBackend::new());
    let ingest = renderer.ingest();

    ingest.on_samples(&[0.5; 16]);
    renderer.on_samples(&[-0.5; 16]);
    assert_eq!(renderer.waveform().unwrap().rows_written(), 0);

    let clock = FrameClock::manual();
    renderer.update(&clock);
    renderer.encode(&mut target);

    // Default rate 0.5 times two rows of mean |x| = 0.5
    assert!((renderer.color_shift() - 0.5).abs() < 1e-6);
    assert!((renderer.backend().frames[0].1.color_shift - 0.5).abs() < 1e-6);

    let waveform = renderer.waveform().unwrap();
    assert_eq!(waveform.rows_written(), 2);
    assert_eq!(waveform.cursor(), 2);

    let writes = &renderer.backend().waveform_writes;
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].0.slot, 0);
    assert_eq!(writes[1].0.slot, 1);
    assert_eq!(writes[1].0.byte_offset, 16 * 4);
    assert_eq!(writes[1].1, vec![-0.5; 16]);
    assert_eq!(writes[1].2.cursor, 2);
}

#[test]
fn test_rows_are_fitted_to_row_width() {
    let (mut renderer, _target) = configured(MockBackend::new());
    renderer.on_samples(&[1.0; 4]);
    renderer.on_samples(&[1.0; 40]);
    renderer.update(&FrameClock::manual());

    let writes = &renderer.backend().waveform_writes;
    assert_eq!(writes[0].1.len(), 16);
    assert_eq!(&writes[0].1[..4], &[1.0; 4]);
    assert!(writes[0].1[4..].iter().all(|&s| s == 0.0));
    assert_eq!(writes[1].1, vec![1.0; 16]);
}

// ==================== Animation ====================

#[test]
fn test_custom_policy_drives_cells() {
    let target = MockTarget::new(640, 480);
    let mut renderer = Renderer::new(MockBackend::new(), small_config()).with_policy(
        |cell: CellCoord, _dims: LatticeDims, elapsed: f32, transform: &mut Transform| {
            transform.rotation_angle = cell.col as f32 * 10.0 + elapsed;
        },
    );
    renderer.configure(&target).unwrap();

    let mut clock = FrameClock::manual();
    clock.advance(Duration::from_secs(1));
    renderer.update(&clock);

    let lattice = renderer.lattice().unwrap();
    let cell = lattice.cell(CellCoord::new(2, 1)).unwrap();
    assert!((cell.transform.rotation_angle - 21.0).abs() < 1e-4);
    assert_eq!(
        cell.uniform().model,
        cell.transform.model_matrix().to_cols_array_2d()
    );
}

#[test]
fn test_shape_change_is_uploaded_once() {
    let (mut renderer, _target) = configured(MockBackend::new());
    let clock = FrameClock::manual();

    renderer.update(&clock);
    assert!(renderer.backend().vertex_uploads.is_empty());

    let smaller = Quad::unit().triangles().map(|mut v| {
        v.position[0] *= 0.5;
        v
    });
    renderer
        .lattice_mut()
        .unwrap()
        .replace_cell_vertices(CellCoord::new(0, 0), smaller.to_vec())
        .unwrap();

    renderer.update(&clock);
    renderer.update(&clock);
    assert_eq!(renderer.backend().vertex_uploads, vec![72]);
}

#[test]
fn test_view_projection_uses_drawable_aspect() {
    let (mut renderer, _target) = configured(MockBackend::new());
    renderer.update(&FrameClock::manual());

    let expected = renderer.config().camera.view_proj(640, 480).to_cols_array_2d();
    assert_eq!(renderer.backend().frames[0].1.view_proj, expected);
}

// ==================== Teardown ====================

#[test]
fn test_teardown_releases_backend() {
    let (backend, held) = MockBackend::holding();
    let (mut renderer, mut target) = configured(backend);
    let clock = FrameClock::manual();

    renderer.update(&clock);
    renderer.encode(&mut target);
    renderer.teardown();

    assert_eq!(renderer.state(), RendererState::TornDown);
    assert!(renderer.backend().released);
    assert!(renderer.lattice().is_none());

    renderer.update(&clock);
    assert_eq!(renderer.backend().frames.len(), 1);
    assert!(matches!(
        renderer.configure(&target),
        Err(RenderError::Configuration(ConfigError::TornDown))
    ));

    // Frames submitted before teardown still complete
    assert_eq!(renderer.gate().in_flight(), 1);
    held.lock().unwrap().clear();
    assert_eq!(renderer.gate().in_flight(), 0);
}
