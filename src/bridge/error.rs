//! Error taxonomy of the bridge.

use super::api::{ApiError, BackendKind};
use super::context::ContextState;
use crate::image::{ImageError, PlaneFormat};

/// Failure while bringing a context up. The context is torn down before
/// this is returned.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("No backends configured")]
    NoBackends,
    #[error("Failed creating {backend} GPU device: {source}")]
    Device {
        backend: BackendKind,
        #[source]
        source: ApiError,
    },
    #[error("Failed acquiring legacy context for {backend}: {reason}")]
    LegacyContext { backend: BackendKind, reason: String },
    #[error("Failed creating shader dispatch object: {0}")]
    Dispatch(#[source] ApiError),
    #[error("Failed creating renderer: {0}")]
    Renderer(#[source] ApiError),
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Failed creating input texture for plane {plane}: {source}")]
    Texture {
        plane: usize,
        #[source]
        source: ApiError,
    },
    #[error("Failed uploading plane {plane}: {source}")]
    Transfer {
        plane: usize,
        #[source]
        source: ApiError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("No input uploaded for this frame")]
    NoInput,
    #[error("Invalid output layout: {0}")]
    Layout(#[from] ImageError),
    #[error("Failed creating output texture for plane {plane}: {source}")]
    Texture {
        plane: usize,
        #[source]
        source: ApiError,
    },
    #[error("Render call failed: {0}")]
    Failed(#[source] ApiError),
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Nothing rendered for this frame")]
    NotRendered,
    #[error("Output image has {got} planes, rendered {expected}")]
    PlaneCount { expected: usize, got: usize },
    #[error(
        "Output plane {plane} is {got_width}x{got_height} {got_format}, \
         rendered {width}x{height} {format}"
    )]
    PlaneMismatch {
        plane: usize,
        width: u32,
        height: u32,
        format: PlaneFormat,
        got_width: u32,
        got_height: u32,
        got_format: PlaneFormat,
    },
    #[error("Failed downloading plane {plane}: {source}")]
    Transfer {
        plane: usize,
        #[source]
        source: ApiError,
    },
}

/// Any failure surfaced by a [`Context`](super::Context).
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Initialization failed: {0}")]
    Init(#[from] InitError),
    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),
    #[error("Render failed: {0}")]
    Render(#[from] RenderError),
    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),
    #[error("{operation} called on a context in state {state}")]
    InvalidState {
        operation: &'static str,
        state: ContextState,
    },
}

impl BridgeError {
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, BridgeError::InvalidState { .. })
    }
}
