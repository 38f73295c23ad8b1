//! Bind group layout builders for the plane passes.
//!
//! Every pass reads its inputs with `textureLoad`, so textures are bound as
//! non-filterable floats. That accepts every plane format, including
//! 32-bit float planes on devices without float filtering.

use wgpu::{BindGroupLayout, BindGroupLayoutEntry, Device, ShaderStages};

use crate::image::MAX_PLANES;

/// Builder for creating bind group layouts with common patterns.
pub struct BindGroupLayoutBuilder {
    label: Option<&'static str>,
    entries: Vec<BindGroupLayoutEntry>,
}

impl BindGroupLayoutBuilder {
    /// Create a new bind group layout builder.
    pub fn new(label: &'static str) -> Self {
        Self {
            label: Some(label),
            entries: Vec::new(),
        }
    }

    /// Add a uniform buffer entry.
    pub fn uniform(mut self, binding: u32, visibility: ShaderStages) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
        self
    }

    /// Add a 2D texture entry read with `textureLoad`.
    pub fn texture_2d(mut self, binding: u32, visibility: ShaderStages) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        self
    }

    /// Build the bind group layout.
    pub fn build(self, device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: self.label,
            entries: &self.entries,
        })
    }
}

/// Uniforms plus one source plane.
pub fn create_plane_layout(device: &Device) -> BindGroupLayout {
    BindGroupLayoutBuilder::new("plane_bind_group_layout")
        .uniform(0, ShaderStages::FRAGMENT)
        .texture_2d(1, ShaderStages::FRAGMENT)
        .build(device)
}

/// Uniforms, one source plane and the dither threshold map.
pub fn create_deband_layout(device: &Device) -> BindGroupLayout {
    BindGroupLayoutBuilder::new("deband_bind_group_layout")
        .uniform(0, ShaderStages::FRAGMENT)
        .texture_2d(1, ShaderStages::FRAGMENT)
        .texture_2d(2, ShaderStages::FRAGMENT)
        .build(device)
}

/// Frame info plus `plane0..plane3` for user shaders.
pub fn create_user_layout(device: &Device) -> BindGroupLayout {
    (0..MAX_PLANES as u32)
        .fold(
            BindGroupLayoutBuilder::new("user_bind_group_layout").uniform(0, ShaderStages::FRAGMENT),
            |builder, plane| builder.texture_2d(plane + 1, ShaderStages::FRAGMENT),
        )
        .build(device)
}
