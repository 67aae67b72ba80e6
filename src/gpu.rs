//! GPU device and presentable surface management.
//!
//! This module provides [`GpuContext`], which owns the wgpu device and queue
//! and the single presentable surface a pipeline renders into.
//!
//! # Surfaces
//!
//! A surface is a *back buffer* (an `Rgba8Unorm` texture at output
//! resolution that the terminal pass renders into) plus, for real windows, a
//! swapchain. [`GpuContext::swap_buffers`] stretches the back buffer over the
//! swapchain image with nearest filtering and presents it. That stretch is
//! what turns a downscaled output resolution into a full-size window.
//!
//! The surface lifecycle mirrors a classic GL context:
//!
//! ```no_run
//! # use pixeljam::{GpuContext, Host, HostConfig, NativeWindow, Size};
//! # fn demo() -> Result<(), pixeljam::GpuError> {
//! let host = Host::initialize(HostConfig::default());
//! let mut gpu = GpuContext::new(&host)?;
//!
//! gpu.create_surface(&NativeWindow::Headless, Size::new(640, 360))?;
//! gpu.make_current(Size::new(1280, 720))?;
//!
//! // ... record passes into gpu.backbuffer_view() ...
//!
//! gpu.swap_buffers()?;
//! gpu.unmake_current();
//! gpu.destroy_surface();
//! # Ok(())
//! # }
//! ```
//!
//! # Error scopes
//!
//! Every operation that creates or submits GPU work outside a `Result`-bearing
//! call runs inside [`GpuContext::diagnose`], which captures validation
//! errors and logs them with a label instead of letting them abort.

use std::sync::Arc;
use std::sync::mpsc;

use crate::blit::Blitter;
use crate::display::NativeWindow;
use crate::error::GpuError;
use crate::format::TargetFormat;
use crate::host::Host;
use crate::layout::Size;

/// Texture format of the back buffer the terminal pass renders into.
pub const DISPLAY_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// The adapter, device, and queue plus the current presentable surface.
///
/// `device` and `queue` are public so callers can reach the full wgpu API.
pub struct GpuContext {
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    adapter: wgpu::Adapter,
    instance: Arc<wgpu::Instance>,
    surface: Option<PresentSurface>,
    current: bool,
}

struct PresentSurface {
    backbuffer: wgpu::Texture,
    backbuffer_view: wgpu::TextureView,
    size: Size,
    swapchain: Option<Swapchain>,
}

struct Swapchain {
    // Declared before `window` so the surface drops first.
    surface: wgpu::Surface<'static>,
    config: Option<wgpu::SurfaceConfiguration>,
    blitter: Option<Blitter>,
    window: Arc<winit::window::Window>,
}

impl GpuContext {
    /// Selects an adapter and opens a device on it.
    pub fn new(host: &Host) -> Result<Self, GpuError> {
        let instance = Arc::clone(host.instance());
        let config = host.config();

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: config.power_preference,
            compatible_surface: None,
            force_fallback_adapter: config.force_fallback_adapter,
        }))?;

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?}, {:?})", info.name, info.device_type, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("pixeljam device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))?;

        Ok(Self {
            device,
            queue,
            adapter,
            instance,
            surface: None,
            current: false,
        })
    }

    /// Creates a back buffer of `size` bound to `window`.
    ///
    /// Any previous surface must have been destroyed first.
    pub fn create_surface(&mut self, window: &NativeWindow, size: Size) -> Result<(), GpuError> {
        if size.is_empty() {
            return Err(GpuError::EmptySurface(size));
        }
        if self.surface.is_some() {
            log::warn!("create_surface called with a live surface; destroying it first");
            self.destroy_surface();
        }

        let backbuffer = self.scoped("back buffer", |device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("back buffer"),
                size: wgpu::Extent3d {
                    width: size.width,
                    height: size.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DISPLAY_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            })
        })?;
        let backbuffer_view = backbuffer.create_view(&wgpu::TextureViewDescriptor::default());

        let swapchain = match window {
            NativeWindow::Winit(window) => {
                let surface = self.instance.create_surface(Arc::clone(window))?;
                Some(Swapchain {
                    surface,
                    config: None,
                    blitter: None,
                    window: Arc::clone(window),
                })
            }
            NativeWindow::Headless => None,
        };

        log::debug!("surface created: {size} ({window:?})");
        self.surface = Some(PresentSurface {
            backbuffer,
            backbuffer_view,
            size,
            swapchain,
        });
        Ok(())
    }

    /// Releases the current surface, if any.
    pub fn destroy_surface(&mut self) {
        self.current = false;
        if let Some(surface) = self.surface.take() {
            surface.backbuffer.destroy();
            log::debug!("surface destroyed: {}", surface.size);
        }
    }

    /// Makes the surface the render destination and configures its swapchain
    /// for a window of `window_size`.
    pub fn make_current(&mut self, window_size: Size) -> Result<(), GpuError> {
        let Some(surface) = self.surface.as_mut() else {
            return Err(GpuError::NotCurrent);
        };

        if let Some(swapchain) = surface.swapchain.as_mut() {
            let caps = swapchain.surface.get_capabilities(&self.adapter);
            let format = caps
                .formats
                .iter()
                .find(|f| !f.is_srgb())
                .or(caps.formats.first())
                .copied()
                .ok_or(GpuError::UnsupportedSurface)?;

            let size = if window_size.is_empty() {
                surface.size
            } else {
                window_size
            };

            let config = wgpu::SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                format,
                width: size.width,
                height: size.height,
                present_mode: wgpu::PresentMode::Fifo,
                alpha_mode: caps
                    .alpha_modes
                    .first()
                    .copied()
                    .unwrap_or(wgpu::CompositeAlphaMode::Auto),
                view_formats: vec![],
                desired_maximum_frame_latency: 2,
            };

            let device = &self.device;
            scoped_on(device, "configure swapchain", |device| {
                swapchain.surface.configure(device, &config)
            })?;

            let reuse = swapchain
                .blitter
                .as_ref()
                .is_some_and(|b| b.target().format == format);
            if !reuse {
                swapchain.blitter = Some(Blitter::new(
                    device,
                    TargetFormat::full(format),
                    "present blit",
                ));
            }
            swapchain.config = Some(config);
            log::debug!("swapchain configured: {size} {format:?}");
        }

        self.current = true;
        Ok(())
    }

    pub fn unmake_current(&mut self) {
        self.current = false;
    }

    pub fn is_current(&self) -> bool {
        self.current && self.surface.is_some()
    }

    /// The texture the terminal pass renders into, while a surface is current.
    pub fn backbuffer_view(&self) -> Option<&wgpu::TextureView> {
        self.current_surface().map(|s| &s.backbuffer_view)
    }

    pub fn surface_size(&self) -> Option<Size> {
        self.surface.as_ref().map(|s| s.size)
    }

    /// Presents the back buffer.
    ///
    /// Headless surfaces keep the frame in the back buffer. A lost or outdated
    /// swapchain is reconfigured and the frame is dropped.
    pub fn swap_buffers(&mut self) -> Result<(), GpuError> {
        if !self.current {
            return Err(GpuError::NotCurrent);
        }
        let Some(surface) = self.surface.as_ref() else {
            return Err(GpuError::NotCurrent);
        };
        let Some(swapchain) = surface.swapchain.as_ref() else {
            return Ok(());
        };
        let (Some(config), Some(blitter)) = (swapchain.config.as_ref(), swapchain.blitter.as_ref())
        else {
            return Err(GpuError::NotCurrent);
        };

        let frame = match swapchain.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("swapchain lost, reconfiguring");
                swapchain.surface.configure(&self.device, config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(GpuError::OutOfMemory),
            Err(err) => {
                log::warn!("dropping frame: {err}");
                return Ok(());
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.diagnose("present", |device| {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("present encoder"),
            });
            blitter.blit(device, &mut encoder, &surface.backbuffer_view, &view);
            self.queue.submit(std::iter::once(encoder.finish()));
        });

        swapchain.window.pre_present_notify();
        frame.present();
        Ok(())
    }

    /// Follows a window resize. Only the swapchain changes; the back buffer
    /// keeps the output resolution.
    pub fn notify_window_resized(&mut self, size: Size) {
        if size.is_empty() {
            return;
        }
        let Some(swapchain) = self.surface.as_mut().and_then(|s| s.swapchain.as_mut()) else {
            return;
        };
        if let Some(config) = swapchain.config.as_mut() {
            config.width = size.width;
            config.height = size.height;
            let device = &self.device;
            let config = &*config;
            if let Err(err) = scoped_on(device, "resize swapchain", |device| {
                swapchain.surface.configure(device, config)
            }) {
                log::error!("{err}");
            }
        }
    }

    /// Reads the back buffer as tightly packed RGBA8 rows.
    pub fn read_backbuffer(&self) -> Result<Vec<u8>, GpuError> {
        let surface = self.surface.as_ref().ok_or(GpuError::NotCurrent)?;
        let Size { width, height } = surface.size;

        let unpadded = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("back buffer readback"),
            size: u64::from(padded) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &surface.backbuffer,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| GpuError::Readback(e.to_string()))?;
        receiver
            .recv()
            .map_err(|_| GpuError::Readback("map callback dropped".to_string()))?
            .map_err(|e| GpuError::Readback(e.to_string()))?;

        let data = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        for row in data.chunks(padded as usize) {
            pixels.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(data);
        buffer.unmap();
        Ok(pixels)
    }

    /// Runs `f` inside a validation error scope and returns the captured error.
    pub fn scoped<R>(&self, label: &str, f: impl FnOnce(&wgpu::Device) -> R) -> Result<R, GpuError> {
        scoped_on(&self.device, label, f)
    }

    /// Like [`scoped`](Self::scoped), but logs a captured error instead of returning it.
    pub fn diagnose<R>(&self, label: &str, f: impl FnOnce(&wgpu::Device) -> R) -> Option<R> {
        match self.scoped(label, f) {
            Ok(value) => Some(value),
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }

    fn current_surface(&self) -> Option<&PresentSurface> {
        if self.current {
            self.surface.as_ref()
        } else {
            None
        }
    }
}

fn scoped_on<R>(
    device: &wgpu::Device,
    label: &str,
    f: impl FnOnce(&wgpu::Device) -> R,
) -> Result<R, GpuError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f(device);
    match pollster::block_on(device.pop_error_scope()) {
        None => Ok(value),
        Some(err) => Err(GpuError::Validation {
            label: label.to_string(),
            message: err.to_string(),
        }),
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        self.destroy_surface();
    }
}
