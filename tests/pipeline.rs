//! End-to-end checks on a headless pipeline.
//!
//! Structure, programs and transitions are checked on wgpu's no-op backend,
//! so they run everywhere. Checks that read pixels back need a real adapter
//! (software ones work); when none is available they log and return early.

use pixeljam::*;

const RED: &str = "@fragment fn fs() -> @location(0) vec4f { return vec4f(1.0, 0.0, 0.0, 1.0); }";

const HALVE: &str = r#"
@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let uv = pos.xy / resolution;
    return textureSample(prev_layer, prev_layer_sampler, uv) * vec4f(0.5, 0.5, 0.5, 1.0);
}
"#;

const PASSTHROUGH: &str = r#"
@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let uv = pos.xy / prev_layer_resolution;
    return textureSample(prev_layer, prev_layer_sampler, uv);
}
"#;

const ACCUMULATE: &str = r#"
@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    let uv = pos.xy / resolution;
    let last = textureSample(backbuffer, backbuffer_sampler, uv);
    return vec4f(last.r + 0.25, 0.0, 0.0, 1.0);
}
"#;

/// Valid WGSL whose fragment input no vertex stage provides.
const UNLINKABLE: &str = r#"
@fragment
fn fs(@location(3) uv: vec2f) -> @location(0) vec4f {
    return vec4f(uv, 0.0, 1.0);
}
"#;

type Headless = RenderPipeline<HeadlessDisplay, ()>;

fn noop_host() -> Host {
    Host::initialize(HostConfig::noop())
}

fn noop(host: &Host, screen: Size, layout: Layout, scaling: ScalingRule) -> Headless {
    let provider = HeadlessDisplayProvider::new(screen);
    RenderPipeline::create(host, &provider, layout, scaling).unwrap()
}

fn noop_small(host: &Host) -> Headless {
    noop(host, Size::new(64, 32), Layout::Fullscreen, ScalingRule::IDENTITY)
}

fn adapter_host() -> Host {
    Host::initialize(HostConfig::default())
}

fn on_adapter(host: &Host) -> Option<Headless> {
    let provider = HeadlessDisplayProvider::new(Size::new(64, 32));
    match RenderPipeline::create(host, &provider, Layout::Fullscreen, ScalingRule::IDENTITY) {
        Ok(pipeline) => Some(pipeline),
        Err(ConstructionError::Gpu(err @ (GpuError::NoAdapter(_) | GpuError::Device(_)))) => {
            eprintln!("skipping: {err}");
            None
        }
        Err(err) => panic!("pipeline creation failed: {err}"),
    }
}

fn with_layers(pipeline: &mut Headless, sources: &[&str]) {
    for source in sources {
        let index = pipeline.append_render_layer(source, ()).unwrap();
        pipeline.build_render_layer(index).unwrap();
    }
    pipeline.apply_offscreen_change();
}

fn frame(pipeline: &mut Headless) {
    pipeline.set_uniforms(0.0, Vec2::ZERO, 0.5);
    pipeline.render().unwrap();
}

fn center_pixel(pipeline: &Headless) -> [u8; 4] {
    let pixels = pipeline.read_output().unwrap();
    let Size { width, height } = pipeline.output_size();
    let offset = (((height / 2) * width + width / 2) * 4) as usize;
    [pixels[offset], pixels[offset + 1], pixels[offset + 2], pixels[offset + 3]]
}

fn assert_near(actual: u8, expected: u8) {
    assert!(actual.abs_diff(expected) <= 1, "expected ~{expected}, got {actual}");
}

// Structure and programs

#[test]
fn only_the_last_layer_targets_the_display() {
    let host = noop_host();
    for count in 1..=MAX_RENDER_LAYERS {
        let mut pipeline = noop_small(&host);
        pipeline.set_backbuffer(true);
        with_layers(&mut pipeline, &vec![RED; count]);

        for layer in pipeline.layers() {
            let expected = if layer.index() + 1 == count {
                TargetKind::Display
            } else {
                TargetKind::Offscreen
            };
            assert_eq!(layer.target_kind(), expected, "layer {} of {count}", layer.index());
            assert_eq!(layer.texture_unit(), layer.index());
        }
        assert_eq!(pipeline.feedback_unit(), count);
        frame(&mut pipeline);
    }
}

#[test]
fn appending_demotes_the_terminal_layer() {
    let host = noop_host();
    let mut pipeline = noop_small(&host);
    with_layers(&mut pipeline, &[RED]);
    assert_eq!(pipeline.layer(0).unwrap().target_kind(), TargetKind::Display);
    assert!(pipeline.layer(0).unwrap().offscreen().is_none());

    let index = pipeline.append_render_layer(PASSTHROUGH, ()).unwrap();
    pipeline.build_render_layer(index).unwrap();
    pipeline.apply_offscreen_change();

    let demoted = pipeline.layer(0).unwrap();
    assert_eq!(demoted.target_kind(), TargetKind::Offscreen);
    assert_eq!(demoted.offscreen().unwrap().size(), pipeline.output_size());
    assert_eq!(pipeline.layer(1).unwrap().target_kind(), TargetKind::Display);
    frame(&mut pipeline);
}

#[test]
fn capacity_is_eight_layers() {
    let host = noop_host();
    let mut pipeline = noop_small(&host);
    for expected in 0..MAX_RENDER_LAYERS {
        assert_eq!(pipeline.append_render_layer(RED, ()), Ok(expected));
    }
    assert_eq!(
        pipeline.append_render_layer(RED, ()),
        Err(AppendError::CapacityExceeded { capacity: 8 })
    );
    assert_eq!(pipeline.layer_count(), 8);
}

#[test]
fn compile_failure_keeps_the_running_program() {
    let host = noop_host();
    let mut pipeline = noop_small(&host);
    with_layers(&mut pipeline, &[RED]);
    let id = pipeline.layer(0).unwrap().program_id();

    pipeline
        .layer_mut(0)
        .unwrap()
        .set_source("@fragment fn fs() -> @location(0) vec4f { return vec4f(0.0) }")
        .unwrap();
    let err = pipeline.build_render_layer(0).unwrap_err();
    assert!(matches!(err, BuildError::Compile(_)), "{err}");
    assert_eq!(pipeline.layer(0).unwrap().program_id(), id);
    frame(&mut pipeline);
}

#[test]
fn link_failure_keeps_the_running_program() {
    let host = noop_host();
    let mut pipeline = noop_small(&host);
    with_layers(&mut pipeline, &[RED, PASSTHROUGH]);
    let ids: Vec<_> = pipeline.layers().iter().map(|l| l.program_id()).collect();

    pipeline.layer_mut(1).unwrap().set_source(UNLINKABLE).unwrap();
    let err = pipeline.build_render_layer(1).unwrap_err();
    assert!(matches!(err, BuildError::Link(_)), "{err}");

    let after: Vec<_> = pipeline.layers().iter().map(|l| l.program_id()).collect();
    assert_eq!(after, ids);
    frame(&mut pipeline);
}

#[test]
fn build_of_missing_layer_is_rejected() {
    let host = noop_host();
    let mut pipeline = noop_small(&host);
    assert_eq!(pipeline.build_render_layer(3), Err(BuildError::NoSuchLayer(3)));
}

#[test]
fn deallocation_is_idempotent() {
    let host = noop_host();
    let mut pipeline = noop_small(&host);
    pipeline.set_backbuffer(true);
    with_layers(&mut pipeline, &[RED, PASSTHROUGH]);

    pipeline.deallocate_offscreen();
    pipeline.deallocate_offscreen();
    assert!(!pipeline.has_feedback_texture());
    for layer in pipeline.layers() {
        assert_eq!(layer.target_kind(), TargetKind::Unallocated);
    }

    pipeline.allocate_offscreen();
    assert!(pipeline.has_feedback_texture());
    assert_eq!(pipeline.layer(0).unwrap().target_kind(), TargetKind::Offscreen);
    frame(&mut pipeline);
}

#[test]
fn offscreen_format_change_relinks_layers() {
    let host = noop_host();
    let mut pipeline = noop_small(&host);
    with_layers(&mut pipeline, &[RED, HALVE, PASSTHROUGH]);
    let ids: Vec<_> = pipeline.layers().iter().map(|l| l.program_id()).collect();

    pipeline.set_offscreen_pixel_format(PixelFormat::Rgba5551);
    pipeline.set_offscreen_interpolation_mode(InterpolationMode::Bilinear);
    assert_eq!(pipeline.offscreen_settings().pixel_format, PixelFormat::Rgba8888);
    pipeline.apply_offscreen_change();
    assert_eq!(pipeline.offscreen_settings().pixel_format, PixelFormat::Rgba5551);

    let expected = PixelFormat::Rgba5551.target_format();
    for layer in &pipeline.layers()[..2] {
        assert_eq!(layer.offscreen().unwrap().format(), expected);
        assert_eq!(layer.program().unwrap().target(), expected);
    }
    let relinked: Vec<_> = pipeline.layers().iter().map(|l| l.program_id()).collect();
    assert_eq!(relinked, ids);
    frame(&mut pipeline);
}

#[test]
fn prelude_inputs_are_reflected_per_layer() {
    let host = noop_host();
    let mut pipeline = noop_small(&host);
    with_layers(&mut pipeline, &[RED, ACCUMULATE]);

    assert!(pipeline.layer(0).unwrap().locations().is_empty());
    let used: Vec<_> = pipeline.layer(1).unwrap().locations().iter().collect();
    assert_eq!(
        used,
        [Binding::Resolution, Binding::Backbuffer, Binding::BackbufferSampler]
    );
}

// Construction and transitions

#[test]
fn empty_screen_fails_construction() {
    let host = noop_host();
    let provider = HeadlessDisplayProvider::new(Size::new(0, 0));
    let result: Result<Headless, _> =
        RenderPipeline::create(&host, &provider, Layout::Fullscreen, ScalingRule::IDENTITY);
    assert!(matches!(result, Err(ConstructionError::Display(_))));
}

#[test]
fn zero_scaling_fails_construction() {
    let host = noop_host();
    let provider = HeadlessDisplayProvider::new(Size::new(64, 32));
    let scaling = ScalingRule::new(0, 2).unwrap();
    let result: Result<Headless, _> =
        RenderPipeline::create(&host, &provider, Layout::Fullscreen, scaling);
    assert!(matches!(result, Err(ConstructionError::EmptyOutput(_))));
}

#[test]
fn output_follows_layout_and_scaling() {
    let host = noop_host();
    let mut pipeline = noop(&host, Size::new(640, 360), Layout::RightTop, ScalingRule::HALF);
    with_layers(&mut pipeline, &[RED, PASSTHROUGH]);
    assert_eq!(pipeline.get_window_size(), Size::new(320, 180));
    assert_eq!(pipeline.get_source_size(), Size::new(160, 90));
    assert_eq!(pipeline.output_size(), Size::new(160, 90));

    pipeline.set_window_scaling(1, 1).unwrap();
    pipeline.apply_window_scaling_change().unwrap();
    assert_eq!(pipeline.output_size(), Size::new(320, 180));
    assert_eq!(pipeline.get_source_size(), pipeline.output_size());

    pipeline.set_layout(Layout::Fullscreen);
    pipeline.apply_layout_change().unwrap();
    assert_eq!(pipeline.current_layout(), Layout::Fullscreen);
    assert_eq!(pipeline.get_window_size(), Size::new(640, 360));
    assert_eq!(pipeline.output_size(), Size::new(640, 360));
    assert_eq!(
        pipeline.layer(0).unwrap().offscreen().unwrap().size(),
        Size::new(640, 360)
    );
    frame(&mut pipeline);
}

#[test]
fn scaling_apply_also_takes_the_staged_layout() {
    let host = noop_host();
    let mut pipeline = noop(&host, Size::new(640, 360), Layout::RightTop, ScalingRule::HALF);
    with_layers(&mut pipeline, &[RED, PASSTHROUGH]);

    pipeline.set_layout(Layout::Fullscreen);
    pipeline.set_window_scaling(1, 1).unwrap();
    pipeline.apply_window_scaling_change().unwrap();

    assert_eq!(pipeline.current_layout(), Layout::Fullscreen);
    assert_eq!(pipeline.scaling(), ScalingRule::IDENTITY);
    assert_eq!(pipeline.get_window_size(), Size::new(640, 360));
    assert_eq!(pipeline.output_size(), Size::new(640, 360));
    assert_eq!(
        pipeline.layer(0).unwrap().offscreen().unwrap().size(),
        Size::new(640, 360)
    );
}

#[test]
fn layout_apply_also_takes_the_staged_scaling() {
    let host = noop_host();
    let mut pipeline = noop(&host, Size::new(640, 360), Layout::Fullscreen, ScalingRule::HALF);
    with_layers(&mut pipeline, &[RED]);
    assert_eq!(pipeline.output_size(), Size::new(320, 180));

    pipeline.set_window_scaling(1, 1).unwrap();
    pipeline.apply_layout_change().unwrap();

    assert_eq!(pipeline.scaling(), ScalingRule::IDENTITY);
    assert_eq!(pipeline.output_size(), Size::new(640, 360));
    assert_eq!(pipeline.get_source_size(), Size::new(640, 360));
}

#[test]
fn failed_transition_blocks_rendering_until_recovery() {
    let host = noop_host();
    let mut pipeline = noop_small(&host);
    with_layers(&mut pipeline, &[RED]);

    pipeline.set_window_scaling(0, 2).unwrap();
    let err = pipeline.apply_window_scaling_change().unwrap_err();
    assert!(matches!(err, TransitionError::EmptyOutput(_)), "{err}");
    assert_eq!(pipeline.health(), Health::Failed);
    assert!(matches!(pipeline.render(), Err(RenderError::PipelineFailed)));

    pipeline.set_window_scaling(1, 2).unwrap();
    pipeline.apply_window_scaling_change().unwrap();
    assert_eq!(pipeline.health(), Health::Ready);
    assert_eq!(pipeline.output_size(), Size::new(32, 16));
    frame(&mut pipeline);
}

#[test]
fn rejected_display_change_fails_the_transition() {
    let host = noop_host();
    let mut pipeline = noop_small(&host);
    with_layers(&mut pipeline, &[RED]);

    pipeline.display_mut().reject_next_change("output unplugged");
    pipeline.set_layout(Layout::Left);
    let err = pipeline.apply_layout_change().unwrap_err();
    assert!(
        matches!(err, TransitionError::Display(DisplayError::Rejected(_))),
        "{err}"
    );
    assert!(matches!(pipeline.render(), Err(RenderError::PipelineFailed)));

    pipeline.apply_layout_change().unwrap();
    assert_eq!(pipeline.get_window_size(), Size::new(32, 32));
    frame(&mut pipeline);
}

#[test]
fn scaling_setter_validates_ratio() {
    let host = noop_host();
    let mut pipeline = noop_small(&host);
    assert_eq!(
        pipeline.set_window_scaling(1, 0),
        Err(ScalingError::ZeroDenominator)
    );
    assert!(pipeline.set_window_scaling(3, 2).is_err());
    assert_eq!(pipeline.scaling(), ScalingRule::IDENTITY);
}

// Pixels

#[test]
fn layers_chain_through_offscreen_targets() {
    let host = adapter_host();
    let Some(mut pipeline) = on_adapter(&host) else {
        return;
    };
    with_layers(&mut pipeline, &[RED, HALVE, PASSTHROUGH]);
    frame(&mut pipeline);

    let [r, g, b, a] = center_pixel(&pipeline);
    assert_near(r, 128);
    assert_eq!((g, b, a), (0, 0, 255));
}

#[test]
fn demoted_layer_feeds_the_new_terminal() {
    let host = adapter_host();
    let Some(mut pipeline) = on_adapter(&host) else {
        return;
    };
    with_layers(&mut pipeline, &[RED]);
    with_layers(&mut pipeline, &[PASSTHROUGH]);
    frame(&mut pipeline);
    assert_near(center_pixel(&pipeline)[0], 255);
}

#[test]
fn failed_rebuild_keeps_the_output() {
    let host = adapter_host();
    let Some(mut pipeline) = on_adapter(&host) else {
        return;
    };
    with_layers(&mut pipeline, &[RED]);
    frame(&mut pipeline);
    let before = center_pixel(&pipeline);

    pipeline.layer_mut(0).unwrap().set_source(UNLINKABLE).unwrap();
    assert!(pipeline.build_render_layer(0).is_err());
    frame(&mut pipeline);
    assert_eq!(center_pixel(&pipeline), before);
}

#[test]
fn feedback_lags_one_frame() {
    let host = adapter_host();
    let Some(mut pipeline) = on_adapter(&host) else {
        return;
    };
    pipeline.set_backbuffer(true);
    with_layers(&mut pipeline, &[ACCUMULATE]);
    assert!(pipeline.has_feedback_texture());

    frame(&mut pipeline);
    assert_near(center_pixel(&pipeline)[0], 64);
    frame(&mut pipeline);
    assert_near(center_pixel(&pipeline)[0], 128);
}

#[test]
fn interior_layers_see_the_previous_composite() {
    let host = adapter_host();
    for passes in [2, 3] {
        let Some(mut pipeline) = on_adapter(&host) else {
            return;
        };
        pipeline.set_backbuffer(true);
        let mut sources = vec![ACCUMULATE];
        sources.resize(passes, PASSTHROUGH);
        with_layers(&mut pipeline, &sources);
        assert_eq!(pipeline.layer(0).unwrap().target_kind(), TargetKind::Offscreen);

        frame(&mut pipeline);
        assert_near(center_pixel(&pipeline)[0], 64);
        frame(&mut pipeline);
        assert_near(center_pixel(&pipeline)[0], 128);
        frame(&mut pipeline);
        assert_near(center_pixel(&pipeline)[0], 191);
    }
}

#[test]
fn disabled_backbuffer_samples_black() {
    let host = adapter_host();
    let Some(mut pipeline) = on_adapter(&host) else {
        return;
    };
    with_layers(&mut pipeline, &[ACCUMULATE]);
    assert!(!pipeline.has_feedback_texture());

    for _ in 0..3 {
        frame(&mut pipeline);
        assert_near(center_pixel(&pipeline)[0], 64);
    }
}

#[test]
fn readback_follows_a_transition() {
    let host = adapter_host();
    let Some(mut pipeline) = on_adapter(&host) else {
        return;
    };
    with_layers(&mut pipeline, &[RED, PASSTHROUGH]);

    pipeline.set_window_scaling(1, 2).unwrap();
    pipeline.apply_window_scaling_change().unwrap();
    frame(&mut pipeline);
    assert_eq!(pipeline.read_output().unwrap().len(), 32 * 16 * 4);
    assert_near(center_pixel(&pipeline)[0], 255);
}

#[test]
fn narrow_formats_keep_the_chain_intact() {
    let host = adapter_host();
    let Some(mut pipeline) = on_adapter(&host) else {
        return;
    };
    with_layers(&mut pipeline, &[RED, HALVE, PASSTHROUGH]);
    pipeline.set_offscreen_pixel_format(PixelFormat::Rgba5551);
    pipeline.apply_offscreen_change();

    frame(&mut pipeline);
    let [r, _, _, a] = center_pixel(&pipeline);
    assert_near(r, 128);
    assert_eq!(a, 255);
}
