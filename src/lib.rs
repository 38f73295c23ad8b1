//! Placebo Bridge
//!
//! GPU video filters for frame-serving hosts, rendered through wgpu.
//!
//! # Features
//!
//! - Context lifecycle with backend fallback and leak-free teardown
//! - Plane upload and download honouring host strides, with texture reuse
//! - Deband, resample, tone mapping and custom WGSL shader filters
//! - Host plugin surface: filter schemas, argument checking, per-frame processing
//! - Pluggable rendering library behind the [`bridge::GpuApi`] trait

pub mod bridge;
pub mod filters;
pub mod gpu;
pub mod image;
pub mod logging;
pub mod plugin;

// Re-export commonly used types
pub use bridge::{
    ApiError, BackendKind, BridgeConfig, BridgeError, Context, ContextState, GpuApi,
    LegacyContext, NoLegacyContext,
};
pub use filters::{
    DebandParams, DitherAlgo, FilterError, FilterKernel, FilterOp, ResampleParams, ShaderProgram,
    TonemapParams,
};
pub use gpu::{WgpuApi, WgpuDevice};
pub use image::{Image, ImageLayout, ImageMut, OwnedFrame, Plane, PlaneFormat, PlaneLayout};
pub use logging::{LogLevel, Logger};
pub use plugin::{create_filter, plugin_init, BridgeFilter, FrameFilter, PluginRegistry};
