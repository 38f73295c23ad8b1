//! The GPU bridge: context lifecycle plus image upload and download.
//!
//! A [`Context`] owns the device, dispatch object, dither state and renderer
//! of one filter instance, all obtained through a [`GpuApi`]. Frames go
//! through [`Context::upload`], [`Context::invoke`] and
//! [`Context::download`] (or [`Context::process`] for all three).

pub mod api;
pub mod context;
pub mod error;
pub mod legacy;
pub mod slots;

pub use api::{ApiError, BackendKind, BoundTexture, GpuApi, RenderJob, TextureDesc, TextureRole};
pub use context::{BridgeConfig, Context, ContextState};
pub use error::{BridgeError, DownloadError, InitError, RenderError, UploadError};
pub use legacy::{LegacyContext, NoLegacyContext, ScopedLegacyContext};
pub use slots::{Slot, SlotStatus, TextureSlots};
