//! The fixed resource table every layer shader is compiled against.
//!
//! Layer sources are plain WGSL fragment shaders. The compositor appends a
//! prelude declaring every input it can feed a pass, all in bind group 0:
//!
//! | binding | name | type |
//! |---|---|---|
//! | 0 | `time` | `f32`, seconds since start |
//! | 1 | `mouse` | `vec2f`, normalized, y up |
//! | 2 | `resolution` | `vec2f`, output size in pixels |
//! | 3 | `rand` | `f32` in `[0, 1)`, new every frame |
//! | 4 | `prev_layer_resolution` | `vec2f`, size of `prev_layer` |
//! | 5 | `backbuffer` | `texture_2d<f32>`, last frame's composite |
//! | 6 | `backbuffer_sampler` | `sampler` |
//! | 7 | `prev_layer` | `texture_2d<f32>`, previous layer's output |
//! | 8 | `prev_layer_sampler` | `sampler` |
//!
//! Only globals the fragment entry point actually uses get a slot in the
//! layer's bind group, so an input the shader ignores simply has no location.

use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::error::BuildError;

/// One input of the prelude table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    Time,
    Mouse,
    Resolution,
    Rand,
    PrevLayerResolution,
    Backbuffer,
    BackbufferSampler,
    PrevLayer,
    PrevLayerSampler,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Uniform,
    Texture,
    Sampler,
}

impl Binding {
    pub const ALL: [Binding; 9] = [
        Binding::Time,
        Binding::Mouse,
        Binding::Resolution,
        Binding::Rand,
        Binding::PrevLayerResolution,
        Binding::Backbuffer,
        Binding::BackbufferSampler,
        Binding::PrevLayer,
        Binding::PrevLayerSampler,
    ];

    pub const fn index(self) -> u32 {
        self as u32
    }

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Binding::Time => "time",
            Binding::Mouse => "mouse",
            Binding::Resolution => "resolution",
            Binding::Rand => "rand",
            Binding::PrevLayerResolution => "prev_layer_resolution",
            Binding::Backbuffer => "backbuffer",
            Binding::BackbufferSampler => "backbuffer_sampler",
            Binding::PrevLayer => "prev_layer",
            Binding::PrevLayerSampler => "prev_layer_sampler",
        }
    }

    pub const fn kind(self) -> BindingKind {
        match self {
            Binding::Time
            | Binding::Mouse
            | Binding::Resolution
            | Binding::Rand
            | Binding::PrevLayerResolution => BindingKind::Uniform,
            Binding::Backbuffer | Binding::PrevLayer => BindingKind::Texture,
            Binding::BackbufferSampler | Binding::PrevLayerSampler => BindingKind::Sampler,
        }
    }

    pub fn layout_entry(self) -> wgpu::BindGroupLayoutEntry {
        let ty = match self.kind() {
            BindingKind::Uniform => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            BindingKind::Texture => wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            BindingKind::Sampler => {
                wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
            }
        };
        wgpu::BindGroupLayoutEntry {
            binding: self.index(),
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty,
            count: None,
        }
    }
}

/// Declarations appended to every layer source.
pub const PRELUDE: &str = r#"
@group(0) @binding(0) var<uniform> time: f32;
@group(0) @binding(1) var<uniform> mouse: vec2f;
@group(0) @binding(2) var<uniform> resolution: vec2f;
@group(0) @binding(3) var<uniform> rand: f32;
@group(0) @binding(4) var<uniform> prev_layer_resolution: vec2f;
@group(0) @binding(5) var backbuffer: texture_2d<f32>;
@group(0) @binding(6) var backbuffer_sampler: sampler;
@group(0) @binding(7) var prev_layer: texture_2d<f32>;
@group(0) @binding(8) var prev_layer_sampler: sampler;
"#;

/// The set of prelude inputs a compiled shader reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UniformLocations {
    used: u16,
}

impl UniformLocations {
    pub fn contains(&self, binding: Binding) -> bool {
        self.used & (1 << binding.index()) != 0
    }

    pub fn insert(&mut self, binding: Binding) {
        self.used |= 1 << binding.index();
    }

    pub fn iter(&self) -> impl Iterator<Item = Binding> + '_ {
        Binding::ALL.into_iter().filter(|b| self.contains(*b))
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }
}

/// A layer source that passed front-end validation.
#[derive(Debug)]
pub struct CompiledShader {
    /// User source followed by the prelude.
    pub full_source: String,
    pub entry_point: String,
    pub locations: UniformLocations,
}

/// Parses and validates a fragment source against the prelude.
///
/// Syntax and type errors are compile failures. A missing `@fragment` entry
/// point or a resource outside the prelude table is a link failure, since
/// only linking against the compositor's vertex stage and bindings can reject
/// it.
pub fn compile(source: &str) -> Result<CompiledShader, BuildError> {
    // WGSL is order independent at module scope; appending keeps the
    // user's line numbers in diagnostics.
    let full_source = format!("{source}\n{PRELUDE}");

    let module = naga::front::wgsl::parse_str(&full_source)
        .map_err(|err| BuildError::Compile(err.emit_to_string(&full_source)))?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|err| BuildError::Compile(err.emit_to_string(&full_source)))?;

    let (index, entry) = module
        .entry_points
        .iter()
        .enumerate()
        .find(|(_, ep)| ep.stage == naga::ShaderStage::Fragment)
        .ok_or_else(|| BuildError::Link("no @fragment entry point".to_string()))?;

    let function = info.get_entry_point(index);
    let mut locations = UniformLocations::default();
    for (handle, global) in module.global_variables.iter() {
        if function[handle].is_empty() {
            continue;
        }
        let Some(resource) = &global.binding else {
            continue;
        };
        let name = global.name.as_deref().unwrap_or("<unnamed>");
        let binding = Binding::from_index(resource.binding)
            .filter(|b| resource.group == 0 && b.name() == name)
            .ok_or_else(|| {
                BuildError::Link(format!(
                    "'{name}' at @group({}) @binding({}) is not provided by the compositor",
                    resource.group, resource.binding
                ))
            })?;
        locations.insert(binding);
    }

    Ok(CompiledShader {
        full_source,
        entry_point: entry.name.clone(),
        locations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIN: &str = r#"
@fragment
fn main(@builtin(position) frag_coord: vec4f) -> @location(0) vec4f {
    let uv = frag_coord.xy / resolution;
    return textureSample(prev_layer, prev_layer_sampler, uv) * 0.5;
}
"#;

    #[test]
    fn indices_follow_the_table() {
        for (i, binding) in Binding::ALL.iter().enumerate() {
            assert_eq!(binding.index() as usize, i);
            assert_eq!(Binding::from_index(i as u32), Some(*binding));
            let declaration = format!("@binding({i}) var");
            let line = PRELUDE
                .lines()
                .find(|l| l.contains(&declaration))
                .unwrap();
            assert!(line.contains(&format!(" {}:", binding.name())), "{line}");
        }
        assert_eq!(Binding::from_index(9), None);
    }

    #[test]
    fn reflects_only_used_inputs() {
        let shader = compile(CHAIN).unwrap();
        assert_eq!(shader.entry_point, "main");
        let used: Vec<_> = shader.locations.iter().collect();
        assert_eq!(
            used,
            [Binding::Resolution, Binding::PrevLayer, Binding::PrevLayerSampler]
        );
        assert!(!shader.locations.contains(Binding::Backbuffer));
        assert!(!shader.locations.contains(Binding::Time));
    }

    #[test]
    fn constant_shader_uses_nothing() {
        let shader = compile(
            "@fragment fn fs() -> @location(0) vec4f { return vec4f(1.0, 0.0, 0.0, 1.0); }",
        )
        .unwrap();
        assert!(shader.locations.is_empty());
    }

    #[test]
    fn syntax_errors_fail_compile() {
        let err = compile("@fragment fn fs() -> @location(0) vec4f { return vec4f(1.0) }")
            .unwrap_err();
        assert!(matches!(err, BuildError::Compile(_)), "{err}");
    }

    #[test]
    fn type_errors_fail_compile() {
        let err = compile("@fragment fn fs() -> @location(0) vec4f { return time; }")
            .unwrap_err();
        assert!(matches!(err, BuildError::Compile(_)), "{err}");
    }

    #[test]
    fn missing_fragment_stage_fails_link() {
        let err = compile("fn helper() -> f32 { return 1.0; }").unwrap_err();
        assert_eq!(err, BuildError::Link("no @fragment entry point".to_string()));
    }

    #[test]
    fn foreign_bindings_fail_link() {
        let source = r#"
@group(1) @binding(0) var<uniform> gain: f32;
@fragment fn fs() -> @location(0) vec4f { return vec4f(gain); }
"#;
        let err = compile(source).unwrap_err();
        assert!(matches!(&err, BuildError::Link(msg) if msg.contains("'gain'")), "{err}");
    }
}
