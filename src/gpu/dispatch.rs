//! Shader dispatch: plane copies, debanding and user shaders.

use std::collections::HashMap;

use wgpu::{BindGroupLayout, PipelineLayout, ShaderModule, TextureFormat};

use super::context::WgpuDevice;
use super::dither::DitherMap;
use super::layouts::{create_deband_layout, create_user_layout};
use super::params::{DebandUniforms, FrameInfo};
use super::pipelines::{
    create_pipeline_layout, encode_fullscreen_pass, uniform_buffer, PipelineCache,
    RenderPipelineBuilder,
};
use super::shaders::{user_shader_source, BuiltinShader};
use super::textures::PlaneTexture;
use crate::bridge::ApiError;
use crate::filters::ShaderProgram;
use crate::image::MAX_PLANES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PassKey {
    Deband,
    User(u64),
}

/// Issues the per-plane passes that are not image-level rendering.
pub struct ShaderDispatch {
    deband_layout: BindGroupLayout,
    deband_pipeline_layout: PipelineLayout,
    deband_shader: ShaderModule,
    user_layout: BindGroupLayout,
    user_pipeline_layout: PipelineLayout,
    user_shaders: HashMap<u64, ShaderModule>,
    pipelines: PipelineCache<(PassKey, TextureFormat)>,
}

impl ShaderDispatch {
    pub fn new(device: &WgpuDevice) -> Self {
        let deband_layout = create_deband_layout(&device.device);
        let deband_pipeline_layout =
            create_pipeline_layout(&device.device, "deband_pipeline_layout", &[&deband_layout]);
        let deband_shader = device
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(BuiltinShader::Deband.label()),
                source: wgpu::ShaderSource::Wgsl(BuiltinShader::Deband.source().into()),
            });

        let user_layout = create_user_layout(&device.device);
        let user_pipeline_layout =
            create_pipeline_layout(&device.device, "user_pipeline_layout", &[&user_layout]);

        Self {
            deband_layout,
            deband_pipeline_layout,
            deband_shader,
            user_layout,
            user_pipeline_layout,
            user_shaders: HashMap::new(),
            pipelines: PipelineCache::new(),
        }
    }

    /// Copy `src` into `dst` unchanged.
    pub fn copy(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        src: &PlaneTexture,
        dst: &PlaneTexture,
    ) -> Result<(), ApiError> {
        if src.desc() != dst.desc() {
            return Err(ApiError::InvalidInput(format!(
                "cannot copy a {}x{} plane into a {}x{} plane of another shape",
                src.desc().width,
                src.desc().height,
                dst.desc().width,
                dst.desc().height
            )));
        }
        src.encode_copy_to(encoder, dst);
        Ok(())
    }

    pub fn deband(
        &mut self,
        device: &WgpuDevice,
        encoder: &mut wgpu::CommandEncoder,
        src: &PlaneTexture,
        dst: &PlaneTexture,
        dither: &DitherMap,
        uniforms: &DebandUniforms,
    ) {
        let format = dst.format();
        let layout = &self.deband_pipeline_layout;
        let shader = &self.deband_shader;
        let pipeline = self.pipelines.get_or_build((PassKey::Deband, format), || {
            RenderPipelineBuilder::new("deband_pipeline")
                .layout(layout)
                .format(format)
                .build(&device.device, shader)
        });

        let buffer = uniform_buffer(
            &device.device,
            "deband_uniforms",
            bytemuck::bytes_of(uniforms),
        );
        let bind_group = device.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("deband_bind_group"),
            layout: &self.deband_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(src.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(dither.view()),
                },
            ],
        });

        encode_fullscreen_pass(encoder, "deband_pass", pipeline, &bind_group, dst.view());
    }

    /// Run `program` once, writing `dst`. `planes` are all input planes.
    pub fn user_shader(
        &mut self,
        device: &WgpuDevice,
        encoder: &mut wgpu::CommandEncoder,
        program: &ShaderProgram,
        planes: &[&PlaneTexture],
        dst: &PlaneTexture,
        info: &FrameInfo,
    ) -> Result<(), ApiError> {
        let Some(first) = planes.first() else {
            return Err(ApiError::InvalidInput(
                "user shader needs at least one input plane".to_string(),
            ));
        };

        let format = dst.format();
        let layout = &self.user_pipeline_layout;
        let modules = &mut self.user_shaders;
        let pipeline = self
            .pipelines
            .try_get_or_build((PassKey::User(program.id), format), || {
                // Pipeline validation errors land here, not in the
                // uncaptured-error handler.
                let scope = device.device.push_error_scope(wgpu::ErrorFilter::Validation);
                let module = modules.get(&program.id).cloned().unwrap_or_else(|| {
                    device
                        .device
                        .create_shader_module(wgpu::ShaderModuleDescriptor {
                            label: Some("user_shader"),
                            source: wgpu::ShaderSource::Wgsl(
                                user_shader_source(&program.source).into(),
                            ),
                        })
                });
                let pipeline = RenderPipelineBuilder::new("user_pipeline")
                    .layout(layout)
                    .format(format)
                    .build(&device.device, &module);
                match pollster::block_on(scope.pop()) {
                    Some(err) => Err(ApiError::Failed(format!(
                        "user shader rejected for {format:?} output: {err}"
                    ))),
                    None => {
                        modules.entry(program.id).or_insert(module);
                        Ok(pipeline)
                    }
                }
            })?;

        let buffer = uniform_buffer(&device.device, "frame_info", bytemuck::bytes_of(info));
        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }];
        for index in 0..MAX_PLANES {
            let plane = planes.get(index).unwrap_or(first);
            entries.push(wgpu::BindGroupEntry {
                binding: index as u32 + 1,
                resource: wgpu::BindingResource::TextureView(plane.view()),
            });
        }
        let bind_group = device.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("user_bind_group"),
            layout: &self.user_layout,
            entries: &entries,
        });

        encode_fullscreen_pass(encoder, "user_pass", pipeline, &bind_group, dst.view());
        Ok(())
    }

    pub fn destroy(mut self) {
        self.pipelines.clear();
        self.user_shaders.clear();
    }
}
