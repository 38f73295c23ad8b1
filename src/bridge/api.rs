//! Boundary to the rendering library that does the actual GPU work.
//!
//! Every handle the library hands out has a single owner and an explicit
//! destroy call. The bridge never relies on drop order of these handles;
//! [`Context`](super::Context) destroys them in a fixed sequence.

use std::fmt;

use crate::filters::FilterOp;
use crate::image::{Plane, PlaneFormat, PlaneMut};

/// Errors reported by a [`GpuApi`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Unsupported: {0}")]
    Unsupported(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("GPU operation failed: {0}")]
    Failed(String),
}

/// Families of GPU backends, in the order the bridge tries them by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Vulkan, Metal or DX12.
    Native,
    /// OpenGL (ES), including software rasterizers.
    OpenGl,
}

impl BackendKind {
    /// Whether creating this backend needs a thread-bound legacy context
    /// current on the calling thread.
    ///
    /// wgpu's own GL backend creates its context internally, so the wgpu
    /// backend boots with [`NoLegacyContext`](super::NoLegacyContext). Hosts
    /// that must share their GL context pass it to
    /// [`Context::init`](super::Context::init) or
    /// `BridgeFilter::with_legacy_context`.
    pub fn requires_legacy_context(&self) -> bool {
        matches!(self, BackendKind::OpenGl) && cfg!(target_os = "macos")
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Native => f.write_str("native"),
            BackendKind::OpenGl => f.write_str("opengl"),
        }
    }
}

/// What a texture is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRole {
    /// Written by upload, sampled by render passes.
    Input,
    /// Rendered into, read back by download.
    Output,
}

/// Dimensions and format of a plane texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: PlaneFormat,
}

/// A texture bound for one render call, with the plane geometry it holds.
pub struct BoundTexture<'a, T> {
    pub texture: &'a T,
    pub desc: TextureDesc,
    pub subx: u8,
    pub suby: u8,
}

/// Everything one render call may touch.
pub struct RenderJob<'a, A: GpuApi + ?Sized> {
    pub device: &'a A::Device,
    pub dispatch: &'a mut A::Dispatch,
    pub renderer: &'a mut A::Renderer,
    /// Persistent dither state; the implementation creates it on first use.
    pub dither: &'a mut Option<A::DitherState>,
    pub inputs: Vec<BoundTexture<'a, A::Texture>>,
    pub outputs: Vec<BoundTexture<'a, A::Texture>>,
    /// Index of the frame being rendered.
    pub frame: u64,
}

/// The external rendering library, seen from the bridge.
pub trait GpuApi: Send {
    type Device: Send;
    type Dispatch: Send;
    type Renderer: Send;
    type Texture: Send;
    type DitherState: Send;

    fn create_device(&mut self, kind: BackendKind) -> Result<Self::Device, ApiError>;
    fn destroy_device(&mut self, device: Self::Device);

    fn create_dispatch(&mut self, device: &Self::Device) -> Result<Self::Dispatch, ApiError>;
    fn destroy_dispatch(&mut self, device: &Self::Device, dispatch: Self::Dispatch);

    fn create_renderer(&mut self, device: &Self::Device) -> Result<Self::Renderer, ApiError>;
    fn destroy_renderer(&mut self, device: &Self::Device, renderer: Self::Renderer);

    fn destroy_dither_state(&mut self, device: &Self::Device, state: Self::DitherState);

    fn create_texture(
        &mut self,
        device: &Self::Device,
        desc: &TextureDesc,
        role: TextureRole,
    ) -> Result<Self::Texture, ApiError>;
    fn destroy_texture(&mut self, device: &Self::Device, texture: Self::Texture);

    /// Copy a host plane into `texture`, honouring the plane's stride.
    fn upload(
        &mut self,
        device: &Self::Device,
        texture: &mut Self::Texture,
        plane: &Plane<'_>,
    ) -> Result<(), ApiError>;

    /// Run `op`, reading `job.inputs` and writing every texture in `job.outputs`.
    fn render(&mut self, job: RenderJob<'_, Self>, op: &FilterOp) -> Result<(), ApiError>;

    /// Copy `texture` into a host plane, honouring the destination stride.
    fn download(
        &mut self,
        device: &Self::Device,
        texture: &mut Self::Texture,
        plane: &mut PlaneMut<'_>,
    ) -> Result<(), ApiError>;
}
