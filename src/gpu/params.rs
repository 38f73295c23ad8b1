//! Uniform parameter structs for the plane shaders.
//!
//! These structs must match the WGSL shader definitions exactly,
//! including alignment requirements.

/// Deband pass parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DebandUniforms {
    pub iterations: u32,
    pub threshold: f32,
    pub radius: f32,
    pub grain: f32,
    pub sample_scale: f32,
    /// 0 none, 1 threshold map, 2 white noise.
    pub dither_mode: u32,
    /// Code values of the output format; zero for float planes.
    pub quant_levels: f32,
    pub seed: u32,
}

/// Resample pass parameters.
/// WGSL: three vec2<f32> first (8-byte aligned), then scalars, then a
/// trailing vec2 pad; 64 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ResampleUniforms {
    pub src_size: [f32; 2],
    pub dst_size: [f32; 2],
    /// Source offset in source pixels.
    pub offset: [f32; 2],
    /// 0 nearest, 1 bilinear, 2 cubic, 3 lanczos.
    pub kernel: u32,
    pub radius: f32,
    pub param1: f32,
    pub param2: f32,
    pub blur: f32,
    /// Negative lobe attenuation, 0 keeps them, 1 removes them.
    pub clamp: f32,
    /// Flat region of the kernel centre, in kernel units.
    pub taper: f32,
    /// Blend towards the local 2x2 min/max.
    pub antiring: f32,
    pub _padding: [f32; 2],
}

/// Tonemap pass parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TonemapUniforms {
    pub gain: f32,
    pub sample_scale: f32,
    /// Component count; the fourth component is alpha and left alone.
    pub num_comps: u32,
    pub _padding: u32,
}

/// `FrameInfo` as seen by user shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameInfo {
    pub src_size: [f32; 2],
    pub dst_size: [f32; 2],
    pub plane: u32,
    pub num_planes: u32,
    pub sample_scale: f32,
    pub frame: u32,
}
