//! Image-level passes: resampling and tone mapping.

use wgpu::{BindGroupLayout, PipelineLayout, ShaderModule, TextureFormat};

use super::context::WgpuDevice;
use super::layouts::create_plane_layout;
use super::params::{ResampleUniforms, TonemapUniforms};
use super::pipelines::{
    create_pipeline_layout, encode_fullscreen_pass, uniform_buffer, PipelineCache,
    RenderPipelineBuilder,
};
use super::shaders::BuiltinShader;
use super::textures::PlaneTexture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PlanePass {
    Resample,
    Tonemap,
}

impl PlanePass {
    fn label(&self) -> &'static str {
        match self {
            PlanePass::Resample => "resample_pass",
            PlanePass::Tonemap => "tonemap_pass",
        }
    }
}

/// Renders one source plane into one target plane.
pub struct PlaneRenderer {
    layout: BindGroupLayout,
    pipeline_layout: PipelineLayout,
    resample_shader: ShaderModule,
    tonemap_shader: ShaderModule,
    pipelines: PipelineCache<(PlanePass, TextureFormat)>,
}

impl PlaneRenderer {
    pub fn new(device: &WgpuDevice) -> Self {
        let layout = create_plane_layout(&device.device);
        let pipeline_layout =
            create_pipeline_layout(&device.device, "plane_pipeline_layout", &[&layout]);
        let module = |shader: BuiltinShader| {
            device
                .device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(shader.label()),
                    source: wgpu::ShaderSource::Wgsl(shader.source().into()),
                })
        };

        Self {
            resample_shader: module(BuiltinShader::Resample),
            tonemap_shader: module(BuiltinShader::Tonemap),
            layout,
            pipeline_layout,
            pipelines: PipelineCache::new(),
        }
    }

    pub fn resample(
        &mut self,
        device: &WgpuDevice,
        encoder: &mut wgpu::CommandEncoder,
        src: &PlaneTexture,
        dst: &PlaneTexture,
        uniforms: &ResampleUniforms,
    ) {
        self.draw(
            device,
            encoder,
            PlanePass::Resample,
            src,
            dst,
            bytemuck::bytes_of(uniforms),
        );
    }

    pub fn tonemap(
        &mut self,
        device: &WgpuDevice,
        encoder: &mut wgpu::CommandEncoder,
        src: &PlaneTexture,
        dst: &PlaneTexture,
        uniforms: &TonemapUniforms,
    ) {
        self.draw(
            device,
            encoder,
            PlanePass::Tonemap,
            src,
            dst,
            bytemuck::bytes_of(uniforms),
        );
    }

    fn draw(
        &mut self,
        device: &WgpuDevice,
        encoder: &mut wgpu::CommandEncoder,
        pass: PlanePass,
        src: &PlaneTexture,
        dst: &PlaneTexture,
        uniforms: &[u8],
    ) {
        let format = dst.format();
        let layout = &self.pipeline_layout;
        let module = match pass {
            PlanePass::Resample => &self.resample_shader,
            PlanePass::Tonemap => &self.tonemap_shader,
        };
        let pipeline = self.pipelines.get_or_build((pass, format), || {
            RenderPipelineBuilder::new(pass.label())
                .layout(layout)
                .format(format)
                .build(&device.device, module)
        });

        let buffer = uniform_buffer(&device.device, pass.label(), uniforms);
        let bind_group = device.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("plane_bind_group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(src.view()),
                },
            ],
        });

        encode_fullscreen_pass(encoder, pass.label(), pipeline, &bind_group, dst.view());
    }

    pub fn destroy(mut self) {
        self.pipelines.clear();
    }
}
