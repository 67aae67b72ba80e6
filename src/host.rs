//! Process-wide GPU setup.
//!
//! A [`Host`] owns the `wgpu::Instance` every pipeline in the process draws
//! from. Create it once at startup with [`Host::initialize`] and hand it back
//! with [`Host::deinitialize`] once every pipeline is gone.

use std::sync::Arc;

/// Instance-level options.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Backends the instance may use. Defaults to `WGPU_BACKEND` when set.
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,
    /// Prefer a software adapter.
    pub force_fallback_adapter: bool,
    /// Expose wgpu's no-op backend, which accepts every call and draws
    /// nothing. Only useful with the `wgpu/noop` feature compiled in.
    pub noop: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::from_env().unwrap_or(wgpu::Backends::PRIMARY),
            power_preference: wgpu::PowerPreference::default(),
            force_fallback_adapter: false,
            noop: false,
        }
    }
}

impl HostConfig {
    /// A host backed only by the no-op backend.
    ///
    /// Pipelines on it validate shaders and track resources like a real
    /// device but never produce pixels. Tests use it to run without an adapter.
    pub fn noop() -> Self {
        Self {
            backends: wgpu::Backends::NOOP,
            noop: true,
            ..Self::default()
        }
    }
}

/// Handle to the process-wide GPU instance.
pub struct Host {
    instance: Arc<wgpu::Instance>,
    config: HostConfig,
}

impl Host {
    pub fn initialize(config: HostConfig) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: config.backends,
            backend_options: wgpu::BackendOptions {
                noop: wgpu::NoopBackendOptions {
                    enable: config.noop,
                },
                ..Default::default()
            },
            ..Default::default()
        });
        log::info!("host initialized (backends: {:?})", config.backends);
        Self {
            instance: Arc::new(instance),
            config,
        }
    }

    pub fn instance(&self) -> &Arc<wgpu::Instance> {
        &self.instance
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Releases the host's reference to the instance.
    ///
    /// Contexts created from this host keep the instance alive until they drop.
    pub fn deinitialize(self) {
        let outstanding = Arc::strong_count(&self.instance) - 1;
        if outstanding > 0 {
            log::warn!("host deinitialized with {outstanding} context(s) still alive");
        }
        log::info!("host deinitialized");
    }
}
