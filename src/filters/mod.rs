//! Filter parameter sets and the operations the backend executes.
//!
//! Each filter deserializes its host arguments into a parameter struct,
//! validates it, and collapses into a [`FilterOp`]. The op decides the
//! output layout for a given input; the backend decides how to render it.

pub mod deband;
pub mod resample;
pub mod shader;
pub mod signature;
pub mod tonemap;

pub use deband::{DebandParams, DitherAlgo};
pub use resample::{FilterKernel, ResampleParams};
pub use shader::{ShaderParams, ShaderProgram};
pub use signature::{FilterSignature, ParamSpec, ParamType};
pub use tonemap::{TonemapParams, ToneMapping};

use std::path::PathBuf;

use crate::image::{ImageError, ImageLayout};

/// Errors raised while building a filter from host arguments.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("{filter}: unknown argument '{name}'")]
    UnknownArgument { filter: &'static str, name: String },
    #[error("{filter}: argument '{name}' is required")]
    MissingArgument {
        filter: &'static str,
        name: &'static str,
    },
    #[error("{filter}: argument '{name}' must be of type {expected}")]
    ArgumentType {
        filter: &'static str,
        name: &'static str,
        expected: ParamType,
    },
    #[error("{filter}: invalid arguments: {source}")]
    Arguments {
        filter: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{filter}: {message}")]
    Invalid {
        filter: &'static str,
        message: String,
    },
    #[error("{filter}: unsupported: {message}")]
    Unsupported {
        filter: &'static str,
        message: String,
    },
    #[error("Failed reading shader {path}: {source}")]
    ShaderFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Shader failed to compile:\n{0}")]
    ShaderCompile(String),
    #[error("Invalid output layout: {0}")]
    Layout(#[from] ImageError),
}

impl FilterError {
    pub(crate) fn invalid(filter: &'static str, message: impl Into<String>) -> Self {
        FilterError::Invalid {
            filter,
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(filter: &'static str, message: impl Into<String>) -> Self {
        FilterError::Unsupported {
            filter,
            message: message.into(),
        }
    }
}

/// One filter operation, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Copy every plane unchanged.
    Passthrough,
    Deband(DebandParams),
    Resample(ResampleParams),
    Tonemap(TonemapParams),
    Shader(ShaderProgram),
}

impl FilterOp {
    pub fn name(&self) -> &'static str {
        match self {
            FilterOp::Passthrough => "Passthrough",
            FilterOp::Deband(_) => deband::SIGNATURE.name,
            FilterOp::Resample(_) => resample::SIGNATURE.name,
            FilterOp::Tonemap(_) => tonemap::SIGNATURE.name,
            FilterOp::Shader(_) => shader::SIGNATURE.name,
        }
    }

    /// Layout of the frame this op produces from `input`.
    pub fn output_layout(&self, input: &ImageLayout) -> Result<ImageLayout, FilterError> {
        match self {
            FilterOp::Passthrough | FilterOp::Deband(_) => Ok(input.clone()),
            FilterOp::Resample(params) => Ok(input.resized(params.width, params.height)?),
            FilterOp::Tonemap(_) => {
                if let Some(index) = input
                    .planes
                    .iter()
                    .position(|p| p.subx != 0 || p.suby != 0)
                {
                    return Err(FilterError::unsupported(
                        tonemap::SIGNATURE.name,
                        format!("plane {index} is subsampled"),
                    ));
                }
                Ok(input.clone())
            }
            FilterOp::Shader(program) => {
                let width = program.width.unwrap_or(input.width);
                let height = program.height.unwrap_or(input.height);
                Ok(input.resized(width, height)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{PlaneFormat, PlaneLayout};

    fn yuv420() -> ImageLayout {
        ImageLayout::yuv420(64, 32, PlaneFormat::GRAY8).unwrap()
    }

    #[test]
    fn test_passthrough_keeps_layout() {
        let input = yuv420();
        assert_eq!(FilterOp::Passthrough.output_layout(&input).unwrap(), input);
    }

    #[test]
    fn test_resample_changes_dimensions_only() {
        let op = FilterOp::Resample(ResampleParams::new(128, 16));
        let out = op.output_layout(&yuv420()).unwrap();
        assert_eq!((out.width, out.height), (128, 16));
        assert_eq!(out.planes, yuv420().planes);
        assert_eq!(out.plane_size(1), (64, 8));
    }

    #[test]
    fn test_tonemap_rejects_subsampled_input() {
        let op = FilterOp::Tonemap(TonemapParams::default());
        assert!(matches!(
            op.output_layout(&yuv420()),
            Err(FilterError::Unsupported { .. })
        ));

        let rgb = ImageLayout::new(8, 8, vec![PlaneLayout::new(0, 0, PlaneFormat::GRAY16); 3])
            .unwrap();
        assert_eq!(op.output_layout(&rgb).unwrap(), rgb);
    }

    #[test]
    fn test_op_names() {
        assert_eq!(FilterOp::Deband(DebandParams::default()).name(), "Deband");
        assert_eq!(FilterOp::Passthrough.name(), "Passthrough");
    }
}
