//! WGSL sources for the built-in passes, and user shader assembly.

use std::fmt::Write;

use crate::image::MAX_PLANES;

/// Fullscreen vertex stage and helpers shared by every pass.
pub const COMMON: &str = include_str!("shaders/common.wgsl");

const DEBAND: &str = include_str!("shaders/deband.wgsl");
const RESAMPLE: &str = include_str!("shaders/resample.wgsl");
const TONEMAP: &str = include_str!("shaders/tonemap.wgsl");

/// Entry point user shaders must define.
pub const USER_ENTRY: &str = "fs_main";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinShader {
    Deband,
    Resample,
    Tonemap,
}

impl BuiltinShader {
    pub const ALL: [BuiltinShader; 3] = [
        BuiltinShader::Deband,
        BuiltinShader::Resample,
        BuiltinShader::Tonemap,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            BuiltinShader::Deband => "deband_shader",
            BuiltinShader::Resample => "resample_shader",
            BuiltinShader::Tonemap => "tonemap_shader",
        }
    }

    /// Complete module source, prelude included.
    pub fn source(&self) -> String {
        let body = match self {
            BuiltinShader::Deband => DEBAND,
            BuiltinShader::Resample => RESAMPLE,
            BuiltinShader::Tonemap => TONEMAP,
        };
        format!("{COMMON}\n{body}")
    }
}

/// Declarations visible to user shaders: `frame_info` and `plane0..plane3`.
/// Planes missing from the input are bound to plane 0.
pub fn user_prelude() -> String {
    let mut prelude = String::from(
        "struct FrameInfo {\n\
         \x20   src_size: vec2<f32>,\n\
         \x20   dst_size: vec2<f32>,\n\
         \x20   plane: u32,\n\
         \x20   num_planes: u32,\n\
         \x20   sample_scale: f32,\n\
         \x20   frame: u32,\n\
         };\n\n\
         @group(0) @binding(0) var<uniform> frame_info: FrameInfo;\n",
    );
    for plane in 0..MAX_PLANES {
        let _ = writeln!(
            prelude,
            "@group(0) @binding({}) var plane{plane}: texture_2d<f32>;",
            plane + 1
        );
    }
    prelude
}

pub fn user_shader_source(user: &str) -> String {
    format!("{COMMON}\n{}\n{user}", user_prelude())
}

/// Parse and validate a complete WGSL module.
pub fn validate(source: &str) -> Result<naga::Module, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .map_err(|e| e.emit_to_string(source))?;
    Ok(module)
}

/// Check a user shader against the generated prelude and the user pipeline
/// interface: one float color at `@location(0)`, `VsOut` or builtin inputs,
/// and no resources beyond the prelude's.
pub fn validate_user_shader(user: &str) -> Result<(), String> {
    let module = validate(&user_shader_source(user))?;
    let Some(entry) = module
        .entry_points
        .iter()
        .find(|ep| ep.name == USER_ENTRY && ep.stage == naga::ShaderStage::Fragment)
    else {
        return Err(format!("shader must define a @fragment fn {USER_ENTRY}"));
    };

    let output_ok = entry.function.result.as_ref().is_some_and(|result| {
        matches!(
            result.binding,
            Some(naga::Binding::Location {
                location: 0,
                blend_src: None,
                ..
            })
        ) && is_float_value(&module.types[result.ty].inner)
    });
    if !output_ok {
        return Err(format!(
            "{USER_ENTRY} must return a f32 scalar or vector at @location(0)"
        ));
    }

    for arg in &entry.function.arguments {
        let is_vs_out = module.types[arg.ty].name.as_deref() == Some("VsOut");
        let is_builtin = matches!(arg.binding, Some(naga::Binding::BuiltIn(_)));
        if !is_vs_out && !is_builtin {
            return Err(format!(
                "{USER_ENTRY} inputs must be VsOut or builtins, found `{}`",
                arg.name.as_deref().unwrap_or("_")
            ));
        }
    }

    for (_, global) in module.global_variables.iter() {
        let Some(binding) = global.binding else {
            continue;
        };
        if binding.group != 0 || binding.binding > MAX_PLANES as u32 {
            return Err(format!(
                "resource `{}` at @group({}) @binding({}) is not provided to user shaders",
                global.name.as_deref().unwrap_or("_"),
                binding.group,
                binding.binding
            ));
        }
    }
    Ok(())
}

fn is_float_value(inner: &naga::TypeInner) -> bool {
    let scalar = match inner {
        naga::TypeInner::Scalar(scalar) => scalar,
        naga::TypeInner::Vector { scalar, .. } => scalar,
        _ => return false,
    };
    scalar.kind == naga::ScalarKind::Float && scalar.width == 4
}
