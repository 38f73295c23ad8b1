//! Fullscreen render pipelines and their cache.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use wgpu::util::DeviceExt;
use wgpu::{
    BindGroup, BindGroupLayout, Buffer, ColorTargetState, Device, PipelineLayout,
    RenderPipeline, ShaderModule, TextureFormat, TextureView,
};

/// Builder for fullscreen-triangle pipelines (no vertex buffers, three vertices).
pub struct RenderPipelineBuilder<'a> {
    label: Option<&'a str>,
    layout: Option<&'a PipelineLayout>,
    vertex_entry: &'static str,
    fragment_entry: &'static str,
    format: TextureFormat,
}

impl<'a> RenderPipelineBuilder<'a> {
    pub fn new(label: &'a str) -> Self {
        Self {
            label: Some(label),
            layout: None,
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
            format: TextureFormat::R8Unorm,
        }
    }

    /// Set the pipeline layout.
    pub fn layout(mut self, layout: &'a PipelineLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Set the target texture format.
    pub fn format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    /// Build the pipeline from `shader`. Output replaces the target.
    pub fn build(self, device: &Device, shader: &ShaderModule) -> RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: self.label,
            layout: self.layout,
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some(self.vertex_entry),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some(self.fragment_entry),
                targets: &[Some(ColorTargetState {
                    format: self.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }
}

/// Create a pipeline layout from bind group layouts.
pub fn create_pipeline_layout(
    device: &Device,
    label: &'static str,
    layouts: &[&BindGroupLayout],
) -> PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: layouts,
        immediate_size: 0,
    })
}

/// Uniform buffer holding `contents`, owned by a single pass.
pub fn uniform_buffer(device: &Device, label: &str, contents: &[u8]) -> Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents,
        usage: wgpu::BufferUsages::UNIFORM,
    })
}

/// Record one fullscreen pass writing `target`.
pub fn encode_fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    pipeline: &RenderPipeline,
    bind_group: &BindGroup,
    target: &TextureView,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            depth_slice: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });

    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}

/// Pipelines built on demand, one per key.
pub struct PipelineCache<K> {
    pipelines: HashMap<K, RenderPipeline>,
}

impl<K: Eq + Hash> PipelineCache<K> {
    pub fn new() -> Self {
        Self {
            pipelines: HashMap::new(),
        }
    }

    pub fn get_or_build(
        &mut self,
        key: K,
        build: impl FnOnce() -> RenderPipeline,
    ) -> &RenderPipeline {
        self.pipelines.entry(key).or_insert_with(build)
    }

    /// Like [`get_or_build`](Self::get_or_build), but a failed build caches nothing.
    pub fn try_get_or_build<E>(
        &mut self,
        key: K,
        build: impl FnOnce() -> Result<RenderPipeline, E>,
    ) -> Result<&RenderPipeline, E> {
        match self.pipelines.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(build()?)),
        }
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub fn clear(&mut self) {
        self.pipelines.clear();
    }
}

impl<K: Eq + Hash> Default for PipelineCache<K> {
    fn default() -> Self {
        Self::new()
    }
}
