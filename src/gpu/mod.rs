//! wgpu implementation of the bridge's rendering library.
//!
//! Opens a headless device per context and renders every filter as a
//! fullscreen fragment pass per output plane. Shaders are WGSL, checked
//! with naga before they reach the device.

pub mod backend;
pub mod context;
pub mod dispatch;
pub mod dither;
pub mod layouts;
pub mod params;
pub mod pipelines;
pub mod renderer;
pub mod shaders;
pub mod textures;

pub use backend::WgpuApi;
pub use context::{DeviceOptions, GpuError, WgpuDevice};
pub use dispatch::ShaderDispatch;
pub use dither::DitherMap;
pub use renderer::PlaneRenderer;
pub use textures::PlaneTexture;
