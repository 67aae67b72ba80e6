//! The live-coding host: one window, one pipeline, shader files on disk.

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use crate::display::{StackingLayer, WinitDisplay, WinitDisplayProvider};
use crate::error::{AppError, RenderError};
use crate::format::{InterpolationMode, OffscreenSettings, PixelFormat, WrapMode};
use crate::host::{Host, HostConfig};
use crate::hot_shader::HotShader;
use crate::input::{Command, Input};
use crate::layout::{Layout, Size};
use crate::pipeline::RenderPipeline;
use crate::scaling::ScalingRule;

/// Largest scaling denominator reachable from the keyboard.
pub const MAX_DENOMINATOR: u32 = 16;

type Pipeline = RenderPipeline<WinitDisplay, HotShader>;

/// Configuration for the host application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub layout: Layout,
    pub scaling: ScalingRule,
    pub offscreen: OffscreenSettings,
    pub backbuffer: bool,
    /// Layer shader files, in pass order.
    pub layers: Vec<PathBuf>,
    /// Index of the monitor the window is placed on.
    pub output_device: usize,
    pub stacking: StackingLayer,
    pub print_render_time: bool,
    pub host: HostConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "pixeljam".to_string(),
            layout: Layout::default(),
            scaling: ScalingRule::default(),
            offscreen: OffscreenSettings::default(),
            backbuffer: false,
            layers: Vec::new(),
            output_device: 0,
            stacking: StackingLayer::default(),
            print_render_time: false,
            host: HostConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn scaling(mut self, scaling: ScalingRule) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn pixel_format(mut self, format: PixelFormat) -> Self {
        self.offscreen.pixel_format = format;
        self
    }

    pub fn interpolation(mut self, mode: InterpolationMode) -> Self {
        self.offscreen.interpolation = mode;
        self
    }

    pub fn wrap(mut self, mode: WrapMode) -> Self {
        self.offscreen.wrap = mode;
        self
    }

    pub fn backbuffer(mut self, enable: bool) -> Self {
        self.backbuffer = enable;
        self
    }

    /// Appends a layer shader file.
    pub fn layer(mut self, path: impl Into<PathBuf>) -> Self {
        self.layers.push(path.into());
        self
    }

    pub fn layers<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.layers.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn output_device(mut self, device: usize) -> Self {
        self.output_device = device;
        self
    }

    pub fn stacking(mut self, stacking: StackingLayer) -> Self {
        self.stacking = stacking;
        self
    }

    pub fn print_render_time(mut self, enable: bool) -> Self {
        self.print_render_time = enable;
        self
    }

    pub fn host(mut self, host: HostConfig) -> Self {
        self.host = host;
        self
    }
}

/// Runs the host application until the window is closed.
///
/// Sets up the process-wide [`Host`] for the duration of the run.
pub fn run(config: AppConfig) -> Result<(), AppError> {
    let host = Host::initialize(config.host.clone());
    let result = run_with_host(&host, config);
    host.deinitialize();
    result
}

/// Runs the host application on an existing [`Host`].
pub fn run_with_host(host: &Host, config: AppConfig) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = PixeljamApp {
        host,
        config,
        state: State::Pending,
    };
    event_loop.run_app(&mut app)?;
    app.finish()
}

struct PixeljamApp<'h> {
    host: &'h Host,
    config: AppConfig,
    state: State,
}

enum State {
    Pending,
    Running(Box<Session>),
    Failed(AppError),
    Finished,
}

impl PixeljamApp<'_> {
    fn finish(self) -> Result<(), AppError> {
        match self.state {
            State::Failed(err) => Err(err),
            _ => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        log::error!("{err}");
        self.state = State::Failed(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for PixeljamApp<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !matches!(self.state, State::Pending) {
            return;
        }
        match Session::start(event_loop, self.host, &self.config) {
            Ok(session) => self.state = State::Running(Box::new(session)),
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let State::Running(session) = &mut self.state else {
            return;
        };
        if session.pipeline.display().window().id() != id {
            return;
        }

        if let Some(command) = session.input.handle_event(&event) {
            if session.execute(command) == Flow::Exit {
                self.state = State::Finished;
                event_loop.exit();
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                self.state = State::Finished;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                session
                    .pipeline
                    .notify_window_resized(Size::new(size.width, size.height));
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = session.frame() {
                    self.fail(event_loop, err.into());
                    return;
                }
                session.pipeline.display().window().request_redraw();
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

struct Session {
    pipeline: Pipeline,
    input: Input,
    start_time: Instant,
    print_render_time: bool,
    /// Layout to return to when leaving fullscreen.
    windowed_layout: Layout,
}

impl Session {
    fn start(
        event_loop: &ActiveEventLoop,
        host: &Host,
        config: &AppConfig,
    ) -> Result<Self, AppError> {
        let provider = WinitDisplayProvider::new(event_loop, &config.title, config.output_device);
        let mut pipeline = Pipeline::create_with_stacking(
            host,
            &provider,
            config.layout,
            config.scaling,
            config.stacking,
        )?;

        for path in &config.layers {
            let shader = match HotShader::new(path) {
                Ok(shader) => shader,
                Err(err) => {
                    log::error!("cannot load {}: {err}", path.display());
                    continue;
                }
            };
            let source = shader.source().to_owned();
            match pipeline.append_render_layer(&source, shader) {
                Ok(index) => log::info!("layer {index}: {}", path.display()),
                Err(err) => log::error!("cannot add {}: {err}", path.display()),
            }
        }
        if pipeline.layer_count() == 0 {
            return Err(AppError::NoLayers);
        }

        // Build after appending so every layer links against its final role.
        for index in 0..pipeline.layer_count() {
            let _ = pipeline.build_render_layer(index);
        }

        pipeline.set_backbuffer(config.backbuffer);
        pipeline.set_offscreen_pixel_format(config.offscreen.pixel_format);
        pipeline.set_offscreen_interpolation_mode(config.offscreen.interpolation);
        pipeline.set_offscreen_wrap_mode(config.offscreen.wrap);
        pipeline.apply_offscreen_change();

        log::info!(
            "window {}, offscreen {} ({})",
            pipeline.get_window_size(),
            pipeline.get_source_size(),
            pipeline.scaling()
        );
        pipeline.display().window().request_redraw();

        Ok(Self {
            pipeline,
            input: Input::new(),
            start_time: Instant::now(),
            print_render_time: config.print_render_time,
            windowed_layout: config.layout,
        })
    }

    fn frame(&mut self) -> Result<(), RenderError> {
        self.reload_changed_layers();

        let time = self.start_time.elapsed().as_secs_f32();
        let mouse = self.input.mouse(self.pipeline.get_window_size());
        self.pipeline.set_uniforms(time, mouse, rand::random::<f32>());

        let started = Instant::now();
        match self.pipeline.render() {
            Ok(()) => {}
            // Waiting for a transition that succeeds.
            Err(RenderError::PipelineFailed) => return Ok(()),
            Err(RenderError::Present(err)) if !is_fatal(&err) => {
                log::warn!("frame {} dropped: {err}", self.pipeline.frame_count());
                return Ok(());
            }
            Err(err) => return Err(err),
        }

        if self.print_render_time {
            let elapsed = started.elapsed();
            print!("\rrender time: {:8.3} ms", elapsed.as_secs_f64() * 1000.0);
            let _ = std::io::stdout().flush();
        }
        Ok(())
    }

    fn reload_changed_layers(&mut self) {
        for index in 0..self.pipeline.layer_count() {
            let Some(layer) = self.pipeline.layer_mut(index) else {
                continue;
            };
            if !layer.tag_mut().check_reload() {
                continue;
            }
            let source = layer.tag().source().to_owned();
            if let Err(err) = layer.set_source(&source) {
                log::error!("layer {index}: {err}");
                continue;
            }
            let _ = self.pipeline.build_render_layer(index);
        }
    }

    fn execute(&mut self, command: Command) -> Flow {
        match command {
            Command::Quit => return Flow::Exit,
            Command::ToggleFullscreen => {
                let layout =
                    toggle_fullscreen(self.pipeline.current_layout(), &mut self.windowed_layout);
                self.change_layout(layout);
            }
            Command::NextLayout | Command::PreviousLayout => {
                let forward = command == Command::NextLayout;
                let layout = Pipeline::get_layout(self.pipeline.current_layout(), forward);
                self.windowed_layout = layout;
                self.change_layout(layout);
            }
            Command::CoarserScaling => self.change_scaling(1),
            Command::FinerScaling => self.change_scaling(-1),
            Command::ToggleBackbuffer => {
                let enable = !self.pipeline.backbuffer_enabled();
                self.pipeline.set_backbuffer(enable);
                self.pipeline.apply_offscreen_change();
                log::info!("backbuffer {}", if enable { "ON" } else { "OFF" });
            }
            Command::ToggleRenderTime => {
                self.print_render_time = !self.print_render_time;
                if !self.print_render_time {
                    println!();
                }
            }
            Command::Help => println!("{}", Command::HELP),
        }
        Flow::Continue
    }

    fn change_layout(&mut self, layout: Layout) {
        self.pipeline.set_layout(layout);
        if self.pipeline.apply_layout_change().is_ok() {
            log::info!("layout {layout:?}: window {}", self.pipeline.get_window_size());
        }
    }

    fn change_scaling(&mut self, delta: i32) {
        let current = self.pipeline.scaling();
        let denominator = step_denominator(current.numerator(), current.denominator(), delta);
        if denominator == current.denominator() {
            return;
        }
        if let Err(err) = self
            .pipeline
            .set_window_scaling(current.numerator(), denominator)
        {
            log::warn!("{err}");
            return;
        }
        if self.pipeline.apply_window_scaling_change().is_ok() {
            log::info!(
                "offscreen {} ({})",
                self.pipeline.get_source_size(),
                self.pipeline.scaling()
            );
        }
    }
}

/// Errors after which presenting cannot continue.
fn is_fatal(err: &crate::error::GpuError) -> bool {
    matches!(err, crate::error::GpuError::OutOfMemory)
}

/// Next layout for the fullscreen key. Entering fullscreen remembers the
/// current layout in `windowed`; leaving restores it.
fn toggle_fullscreen(current: Layout, windowed: &mut Layout) -> Layout {
    if current == Layout::Fullscreen {
        *windowed
    } else {
        *windowed = current;
        Layout::Fullscreen
    }
}

/// Moves the scaling denominator by `delta`, kept within
/// `numerator..=MAX_DENOMINATOR` so the ratio never upscales.
fn step_denominator(numerator: u32, current: u32, delta: i32) -> u32 {
    let low = numerator.max(1);
    let stepped = current.saturating_add_signed(delta);
    stepped.clamp(low, MAX_DENOMINATOR.max(low))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fullscreen_toggle_restores_previous_layout() {
        let mut windowed = Layout::RightTop;
        let entered = toggle_fullscreen(Layout::LeftBottom, &mut windowed);
        assert_eq!(entered, Layout::Fullscreen);
        assert_eq!(windowed, Layout::LeftBottom);

        let left = toggle_fullscreen(entered, &mut windowed);
        assert_eq!(left, Layout::LeftBottom);
    }

    #[test]
    fn denominator_steps_within_bounds() {
        assert_eq!(step_denominator(1, 2, 1), 3);
        assert_eq!(step_denominator(1, 2, -1), 1);
        assert_eq!(step_denominator(1, 1, -1), 1);
        assert_eq!(step_denominator(1, 16, 1), 16);
        assert_eq!(step_denominator(0, 1, -1), 1);
    }

    #[test]
    fn denominator_never_drops_below_numerator() {
        assert_eq!(step_denominator(3, 4, -1), 3);
        assert_eq!(step_denominator(3, 3, -1), 3);
        assert_eq!(step_denominator(20, 20, 1), 20);
    }

    #[test]
    fn config_builder_collects_layers() {
        let config = AppConfig::new()
            .layout(Layout::Left)
            .backbuffer(true)
            .layer("a.wgsl")
            .layers(["b.wgsl", "c.wgsl"]);
        assert_eq!(config.layout, Layout::Left);
        assert!(config.backbuffer);
        assert_eq!(
            config.layers,
            vec![PathBuf::from("a.wgsl"), PathBuf::from("b.wgsl"), PathBuf::from("c.wgsl")]
        );
    }
}
