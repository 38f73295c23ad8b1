//! User-supplied WGSL fragment shaders.
//!
//! The user source is appended to a generated prelude that declares the
//! fullscreen vertex stage, a `FrameInfo` uniform and `plane0..plane3`
//! textures. It must define a `@fragment fn fs_main(in: VsOut)`, which runs
//! once per output plane.

use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use super::signature::{FilterSignature, ParamSpec, ParamType};
use super::FilterError;
use crate::gpu::shaders;

pub const SIGNATURE: FilterSignature = FilterSignature {
    name: "Shader",
    params: &[
        ParamSpec::required("clip", ParamType::Clip),
        ParamSpec::optional("shader", ParamType::Data),
        ParamSpec::optional("width", ParamType::Int),
        ParamSpec::optional("height", ParamType::Int),
        ParamSpec::optional("shader_s", ParamType::Data),
    ],
};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShaderParams {
    /// Path to a WGSL file.
    pub shader: Option<PathBuf>,
    /// Inline WGSL source, used when no path is given.
    pub shader_s: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A validated user shader and its output dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderProgram {
    pub source: String,
    /// Hash of `source`, keys the backend's pipeline cache.
    pub id: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ShaderProgram {
    /// Compile-check `source` and wrap it.
    pub fn new(source: impl Into<String>) -> Result<Self, FilterError> {
        let source = source.into();
        shaders::validate_user_shader(&source).map_err(FilterError::ShaderCompile)?;

        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        Ok(Self {
            id: hasher.finish(),
            source,
            width: None,
            height: None,
        })
    }

    pub fn from_params(params: &ShaderParams) -> Result<Self, FilterError> {
        let source = match (&params.shader, &params.shader_s) {
            (Some(path), _) => {
                std::fs::read_to_string(path).map_err(|source| FilterError::ShaderFile {
                    path: path.clone(),
                    source,
                })?
            }
            (None, Some(inline)) => inline.clone(),
            (None, None) => {
                return Err(FilterError::invalid(
                    SIGNATURE.name,
                    "either shader or shader_s must be given",
                ))
            }
        };

        for (name, value) in [("width", params.width), ("height", params.height)] {
            if value == Some(0) {
                return Err(FilterError::invalid(
                    SIGNATURE.name,
                    format!("{name} must be non-zero"),
                ));
            }
        }

        let mut program = Self::new(source)?;
        program.width = params.width;
        program.height = params.height;
        Ok(program)
    }
}
