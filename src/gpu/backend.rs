//! [`GpuApi`] on top of wgpu.

use super::context::{DeviceOptions, GpuError, WgpuDevice};
use super::dispatch::ShaderDispatch;
use super::dither::DitherMap;
use super::params::{DebandUniforms, FrameInfo, ResampleUniforms, TonemapUniforms};
use super::renderer::PlaneRenderer;
use super::textures::PlaneTexture;
use crate::bridge::{
    ApiError, BackendKind, BoundTexture, BridgeConfig, GpuApi, RenderJob, TextureDesc,
    TextureRole,
};
use crate::filters::{
    DebandParams, FilterKernel, FilterOp, ResampleParams, ShaderProgram, TonemapParams,
};
use crate::image::{Plane, PlaneMut};

impl From<GpuError> for ApiError {
    fn from(err: GpuError) -> Self {
        match err {
            GpuError::NoAdapter(_) | GpuError::SoftwareAdapter(_) => {
                ApiError::Unavailable(err.to_string())
            }
            GpuError::DeviceRequest(_) => ApiError::Failed(err.to_string()),
        }
    }
}

fn api_error(err: crate::filters::FilterError) -> ApiError {
    ApiError::Unsupported(err.to_string())
}

/// The wgpu backend.
#[derive(Debug, Clone, Default)]
pub struct WgpuApi {
    options: DeviceOptions,
}

impl WgpuApi {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            options: DeviceOptions {
                allow_software: config.allow_software,
                debug: config.debug,
                label: config.label.clone(),
            },
        }
    }

    pub fn options(&self) -> &DeviceOptions {
        &self.options
    }
}

type Bound<'a> = BoundTexture<'a, PlaneTexture>;

fn input_for<'a>(inputs: &'a [Bound<'a>], plane: usize) -> Result<&'a Bound<'a>, ApiError> {
    inputs
        .get(plane)
        .ok_or_else(|| ApiError::InvalidInput(format!("no input for output plane {plane}")))
}

fn frame_seed(frame: u64) -> u32 {
    (frame as u32).wrapping_mul(0x9e37_79b9)
}

fn deband_uniforms(params: &DebandParams, desc: &TextureDesc, frame: u64) -> DebandUniforms {
    let format = desc.format;
    let dither = params.dither && !format.is_float();
    let dither_mode = match (dither, params.dither_algo.uses_threshold_map()) {
        (false, _) => 0,
        (true, true) => 1,
        (true, false) => 2,
    };
    DebandUniforms {
        iterations: params.iterations,
        threshold: params.threshold,
        radius: params.radius,
        grain: params.grain,
        sample_scale: format.sample_scale(),
        dither_mode,
        quant_levels: if dither { format.max_code() } else { 0.0 },
        seed: frame_seed(frame),
    }
}

fn kernel_index(kernel: FilterKernel) -> u32 {
    match kernel {
        FilterKernel::Nearest => 0,
        FilterKernel::Bilinear => 1,
        FilterKernel::Bicubic | FilterKernel::CatmullRom | FilterKernel::Mitchell => 2,
        FilterKernel::Lanczos => 3,
    }
}

/// Chroma is sited left horizontally and centered vertically.
fn resample_uniforms(params: &ResampleParams, src: &Bound<'_>, dst: &Bound<'_>) -> ResampleUniforms {
    let src_size = [src.desc.width as f32, src.desc.height as f32];
    let dst_size = [dst.desc.width as f32, dst.desc.height as f32];
    let scale_x = src_size[0] / dst_size[0];
    let shift_x = (1u32 << src.subx) as f32;
    let shift_y = (1u32 << src.suby) as f32;
    let siting = 0.5 * (1.0 - 1.0 / shift_x);
    let (param1, param2) = params.effective_params();

    ResampleUniforms {
        src_size,
        dst_size,
        offset: [
            siting * (1.0 - scale_x) + params.sx / shift_x,
            params.sy / shift_y,
        ],
        kernel: kernel_index(params.filter),
        radius: params.effective_radius(),
        param1,
        param2,
        blur: params.blur,
        clamp: params.clamp,
        taper: params.taper,
        antiring: params.antiring,
        _padding: [0.0; 2],
    }
}

impl WgpuApi {
    fn encode(
        &self,
        job: &mut RenderJob<'_, Self>,
        encoder: &mut wgpu::CommandEncoder,
        op: &FilterOp,
    ) -> Result<(), ApiError> {
        let device = job.device;
        match op {
            FilterOp::Passthrough => {
                for (plane, out) in job.outputs.iter().enumerate() {
                    let src = input_for(&job.inputs, plane)?;
                    job.dispatch.copy(encoder, src.texture, out.texture)?;
                }
            }
            FilterOp::Deband(params) => {
                let dither = job.dither.get_or_insert_with(|| DitherMap::new(device));
                for (plane, out) in job.outputs.iter().enumerate() {
                    let src = input_for(&job.inputs, plane)?;
                    if params.processes_plane(plane) {
                        let uniforms = deband_uniforms(params, &out.desc, job.frame);
                        job.dispatch
                            .deband(device, encoder, src.texture, out.texture, dither, &uniforms);
                    } else {
                        job.dispatch.copy(encoder, src.texture, out.texture)?;
                    }
                }
            }
            FilterOp::Resample(params) => {
                for (plane, out) in job.outputs.iter().enumerate() {
                    let src = input_for(&job.inputs, plane)?;
                    let uniforms = resample_uniforms(params, src, out);
                    job.renderer
                        .resample(device, encoder, src.texture, out.texture, &uniforms);
                }
            }
            FilterOp::Tonemap(params) => {
                let gain = params.gain().map_err(api_error)?;
                for (plane, out) in job.outputs.iter().enumerate() {
                    let src = input_for(&job.inputs, plane)?;
                    let uniforms = TonemapUniforms {
                        gain,
                        sample_scale: src.desc.format.sample_scale(),
                        num_comps: out.desc.format.num_comps as u32,
                        _padding: 0,
                    };
                    job.renderer
                        .tonemap(device, encoder, src.texture, out.texture, &uniforms);
                }
            }
            FilterOp::Shader(program) => self.encode_shader(job, encoder, program)?,
        }
        Ok(())
    }

    fn encode_shader(
        &self,
        job: &mut RenderJob<'_, Self>,
        encoder: &mut wgpu::CommandEncoder,
        program: &ShaderProgram,
    ) -> Result<(), ApiError> {
        let planes: Vec<&PlaneTexture> = job.inputs.iter().map(|b| b.texture).collect();
        for (plane, out) in job.outputs.iter().enumerate() {
            let src = input_for(&job.inputs, plane)?;
            let info = FrameInfo {
                src_size: [src.desc.width as f32, src.desc.height as f32],
                dst_size: [out.desc.width as f32, out.desc.height as f32],
                plane: plane as u32,
                num_planes: job.inputs.len() as u32,
                sample_scale: src.desc.format.sample_scale(),
                frame: job.frame as u32,
            };
            job.dispatch
                .user_shader(job.device, encoder, program, &planes, out.texture, &info)?;
        }
        Ok(())
    }
}

impl GpuApi for WgpuApi {
    type Device = WgpuDevice;
    type Dispatch = ShaderDispatch;
    type Renderer = PlaneRenderer;
    type Texture = PlaneTexture;
    type DitherState = DitherMap;

    fn create_device(&mut self, kind: BackendKind) -> Result<WgpuDevice, ApiError> {
        let device = WgpuDevice::create(kind, &self.options)?;
        let info = device.adapter_info();
        log::debug!(
            "Opened {} device on {:?} ({:?})",
            info.name,
            info.backend,
            info.device_type
        );
        Ok(device)
    }

    fn destroy_device(&mut self, device: WgpuDevice) {
        device.destroy();
    }

    fn create_dispatch(&mut self, device: &WgpuDevice) -> Result<ShaderDispatch, ApiError> {
        Ok(ShaderDispatch::new(device))
    }

    fn destroy_dispatch(&mut self, _device: &WgpuDevice, dispatch: ShaderDispatch) {
        dispatch.destroy();
    }

    fn create_renderer(&mut self, device: &WgpuDevice) -> Result<PlaneRenderer, ApiError> {
        Ok(PlaneRenderer::new(device))
    }

    fn destroy_renderer(&mut self, _device: &WgpuDevice, renderer: PlaneRenderer) {
        renderer.destroy();
    }

    fn destroy_dither_state(&mut self, _device: &WgpuDevice, state: DitherMap) {
        state.destroy();
    }

    fn create_texture(
        &mut self,
        device: &WgpuDevice,
        desc: &TextureDesc,
        role: TextureRole,
    ) -> Result<PlaneTexture, ApiError> {
        PlaneTexture::new(device, desc, role)
    }

    fn destroy_texture(&mut self, _device: &WgpuDevice, texture: PlaneTexture) {
        texture.destroy();
    }

    fn upload(
        &mut self,
        device: &WgpuDevice,
        texture: &mut PlaneTexture,
        plane: &Plane<'_>,
    ) -> Result<(), ApiError> {
        texture.upload(device, plane)
    }

    fn render(&mut self, mut job: RenderJob<'_, Self>, op: &FilterOp) -> Result<(), ApiError> {
        if job.inputs.is_empty() || job.outputs.is_empty() {
            return Err(ApiError::InvalidInput(
                "render needs at least one input and one output plane".to_string(),
            ));
        }
        if let FilterOp::Tonemap(TonemapParams { .. }) = op {
            if job.inputs.iter().any(|b| b.subx != 0 || b.suby != 0) {
                return Err(ApiError::Unsupported(
                    "tone mapping needs unsubsampled planes".to_string(),
                ));
            }
        }

        let device = job.device;
        let mut encoder = device
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render_encoder"),
            });
        self.encode(&mut job, &mut encoder, op)?;
        device.queue.submit(std::iter::once(encoder.finish()));
        device
            .wait_idle()
            .map_err(|e| ApiError::Failed(format!("device poll failed: {e}")))
    }

    fn download(
        &mut self,
        device: &WgpuDevice,
        texture: &mut PlaneTexture,
        plane: &mut PlaneMut<'_>,
    ) -> Result<(), ApiError> {
        texture.download(device, plane)
    }
}
