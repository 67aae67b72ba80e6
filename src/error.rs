//! Error types for every fallible pipeline operation.

use thiserror::Error;

use crate::layout::Size;

/// A scaling ratio that cannot be applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScalingError {
    #[error("scaling denominator must be non-zero")]
    ZeroDenominator,
    #[error("scaling {numerator}/{denominator} would upscale")]
    Upscale { numerator: u32, denominator: u32 },
    #[error("invalid scaling ratio '{0}', expected n/d")]
    Parse(String),
}

/// Failures of the display collaborator.
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("no output device {0}")]
    NoSuchDevice(usize),
    #[error("window rect {width}x{height} is empty")]
    EmptyRect { width: u32, height: u32 },
    #[error("window creation failed: {0}")]
    Os(#[from] winit::error::OsError),
    #[error("display rejected the change: {0}")]
    Rejected(String),
}

/// Failures of the GPU context.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),
    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface creation failed: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("surface supports no texture formats on this adapter")]
    UnsupportedSurface,
    #[error("surface size {0} is empty")]
    EmptySurface(Size),
    #[error("no surface is current")]
    NotCurrent,
    #[error("out of memory while presenting")]
    OutOfMemory,
    #[error("{label}: {message}")]
    Validation { label: String, message: String },
    #[error("buffer readback failed: {0}")]
    Readback(String),
}

/// Pipeline creation failed. Everything constructed before the failing step
/// has already been released.
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("display: {0}")]
    Display(#[from] DisplayError),
    #[error("gpu: {0}")]
    Gpu(#[from] GpuError),
    #[error("output resolution {0} is empty")]
    EmptyOutput(Size),
}

/// Shader text that a layer refused to stage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("shader source is {len} bytes, the limit is {max}")]
    TooLarge { len: usize, max: usize },
}

/// Appending a layer failed; the layer sequence is unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppendError {
    #[error("layer capacity of {capacity} reached")]
    CapacityExceeded { capacity: usize },
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// A layer build was rejected. The previously linked program stays active.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("compile failed:\n{0}")]
    Compile(String),
    #[error("link failed:\n{0}")]
    Link(String),
    #[error("no layer at index {0}")]
    NoSuchLayer(usize),
}

/// A layout or scaling transition could not complete. The pipeline is left
/// in a failed state until a later transition succeeds.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("display: {0}")]
    Display(#[from] DisplayError),
    #[error("gpu: {0}")]
    Gpu(#[from] GpuError),
    #[error("output resolution {0} is empty")]
    EmptyOutput(Size),
}

/// A frame could not be rendered.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("pipeline is in a failed state after an incomplete transition")]
    PipelineFailed,
    #[error("present failed: {0}")]
    Present(#[from] GpuError),
}

/// Failures of the host application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("pipeline creation failed: {0}")]
    Construction(#[from] ConstructionError),
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
    #[error("no layer could be loaded")]
    NoLayers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_errors_carry_diagnostics() {
        let err = BuildError::Compile("error: expected ';'".to_string());
        assert_eq!(err.to_string(), "compile failed:\nerror: expected ';'");
    }

    #[test]
    fn source_error_passes_through_append() {
        let err: AppendError = SourceError::TooLarge { len: 70000, max: 65536 }.into();
        assert_eq!(err.to_string(), "shader source is 70000 bytes, the limit is 65536");
    }

    #[test]
    fn construction_fails_only_in_creation_steps() {
        fn step(err: &ConstructionError) -> &'static str {
            match err {
                ConstructionError::Display(_) => "display",
                ConstructionError::Gpu(_) => "gpu",
                ConstructionError::EmptyOutput(_) => "scaling",
            }
        }
        let err = ConstructionError::EmptyOutput(Size::new(0, 0));
        assert_eq!(step(&err), "scaling");
        let err: ConstructionError = DisplayError::NoSuchDevice(2).into();
        assert_eq!(step(&err), "display");
    }

    #[test]
    fn empty_output_names_size() {
        let err = TransitionError::EmptyOutput(Size::new(0, 540));
        assert_eq!(err.to_string(), "output resolution 0x540 is empty");
    }
}
