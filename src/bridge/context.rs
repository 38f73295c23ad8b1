//! Context lifecycle and the per-frame upload / invoke / download path.

use serde::Deserialize;
use std::fmt;

use super::api::{BackendKind, BoundTexture, GpuApi, RenderJob, TextureDesc, TextureRole};
use super::error::{BridgeError, DownloadError, InitError, RenderError, UploadError};
use super::legacy::{LegacyContext, NoLegacyContext, ScopedLegacyContext};
use super::slots::{SlotStatus, TextureSlots};
use crate::filters::FilterOp;
use crate::image::{Image, ImageLayout, ImageMut};
use crate::logging::{LogLevel, Logger};

/// Configuration for creating a context.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Backends to try, in order.
    pub backends: Vec<BackendKind>,
    /// Accept CPU (software) adapters.
    pub allow_software: bool,
    /// Enable backend validation.
    pub debug: bool,
    /// Messages below this severity are dropped.
    pub log_level: LogLevel,
    /// Label attached to GPU objects.
    pub label: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            backends: vec![BackendKind::Native, BackendKind::OpenGl],
            allow_software: true,
            debug: false,
            log_level: LogLevel::Error,
            label: "placebo-bridge".to_string(),
        }
    }
}

/// Lifecycle state of a [`Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Uninitialized,
    Ready,
    Destroyed,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextState::Uninitialized => f.write_str("uninitialized"),
            ContextState::Ready => f.write_str("ready"),
            ContextState::Destroyed => f.write_str("destroyed"),
        }
    }
}

/// Progress of the frame currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameStage {
    Idle,
    Uploaded,
    Rendered,
}

/// GPU state owned by one filter instance.
///
/// Not shared between threads; independent contexts may live on
/// different threads.
pub struct Context<A: GpuApi> {
    api: A,
    config: BridgeConfig,
    logger: Logger,
    state: ContextState,
    stage: FrameStage,
    frames: u64,
    backend: Option<BackendKind>,
    device: Option<A::Device>,
    dispatch: Option<A::Dispatch>,
    dither: Option<A::DitherState>,
    renderer: Option<A::Renderer>,
    input_layout: Option<ImageLayout>,
    tex_in: TextureSlots<A>,
    tex_out: TextureSlots<A>,
}

impl<A: GpuApi> Context<A> {
    /// Wrap `api` in an uninitialized context.
    pub fn new(api: A, config: BridgeConfig) -> Self {
        let logger = Logger::with_log_crate(config.log_level);
        Self {
            api,
            config,
            logger,
            state: ContextState::Uninitialized,
            stage: FrameStage::Idle,
            frames: 0,
            backend: None,
            device: None,
            dispatch: None,
            dither: None,
            renderer: None,
            input_layout: None,
            tex_in: TextureSlots::new(TextureRole::Input),
            tex_out: TextureSlots::new(TextureRole::Output),
        }
    }

    /// Replace the default `log`-crate logger.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Create and initialize a context in one step, without a legacy context.
    pub fn create(api: A, config: BridgeConfig) -> Result<Self, BridgeError> {
        let mut ctx = Self::new(api, config);
        ctx.init(&mut NoLegacyContext)?;
        Ok(ctx)
    }

    /// Bring up device, dispatch object and renderer.
    ///
    /// On failure everything acquired is released and the context ends up
    /// [`ContextState::Destroyed`].
    pub fn init(&mut self, legacy: &mut dyn LegacyContext) -> Result<(), BridgeError> {
        if self.state != ContextState::Uninitialized {
            return Err(BridgeError::InvalidState {
                operation: "init",
                state: self.state,
            });
        }

        match self.try_init(legacy) {
            Ok(()) => {
                self.state = ContextState::Ready;
                if let Some(backend) = self.backend {
                    self.logger
                        .info(&format!("GPU context ready on {backend} backend"));
                }
                Ok(())
            }
            Err(err) => {
                self.logger.error(&err.to_string());
                self.destroy();
                Err(err.into())
            }
        }
    }

    fn try_init(&mut self, legacy: &mut dyn LegacyContext) -> Result<(), InitError> {
        let (backend, device) = self.open_device(legacy)?;
        self.backend = Some(backend);
        let device = self.device.insert(device);

        self.dispatch = Some(
            self.api
                .create_dispatch(device)
                .map_err(InitError::Dispatch)?,
        );
        self.renderer = Some(
            self.api
                .create_renderer(device)
                .map_err(InitError::Renderer)?,
        );
        Ok(())
    }

    fn open_device(
        &mut self,
        legacy: &mut dyn LegacyContext,
    ) -> Result<(BackendKind, A::Device), InitError> {
        let mut last_error = None;

        for &backend in &self.config.backends {
            let result = if backend.requires_legacy_context() {
                match ScopedLegacyContext::acquire(&mut *legacy) {
                    Ok(_guard) => self.api.create_device(backend).map_err(|source| {
                        InitError::Device { backend, source }
                    }),
                    Err(reason) => Err(InitError::LegacyContext { backend, reason }),
                }
            } else {
                self.api
                    .create_device(backend)
                    .map_err(|source| InitError::Device { backend, source })
            };

            match result {
                Ok(device) => return Ok((backend, device)),
                Err(err) => {
                    self.logger.warn(&err.to_string());
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or(InitError::NoBackends))
    }

    /// Release every GPU resource in dependency order.
    ///
    /// Safe to call repeatedly and on partially initialized contexts.
    pub fn destroy(&mut self) {
        if self.state == ContextState::Destroyed {
            return;
        }

        if let Some(device) = self.device.as_ref() {
            self.tex_in.clear(&mut self.api, device);
            self.tex_out.clear(&mut self.api, device);
            if let Some(renderer) = self.renderer.take() {
                self.api.destroy_renderer(device, renderer);
            }
            if let Some(dither) = self.dither.take() {
                self.api.destroy_dither_state(device, dither);
            }
            if let Some(dispatch) = self.dispatch.take() {
                self.api.destroy_dispatch(device, dispatch);
            }
        }
        if let Some(device) = self.device.take() {
            self.api.destroy_device(device);
        }

        self.backend = None;
        self.input_layout = None;
        self.stage = FrameStage::Idle;
        self.state = ContextState::Destroyed;
    }

    /// The device, if the context is ready.
    fn ready_device<'d>(
        state: ContextState,
        device: &'d Option<A::Device>,
        operation: &'static str,
    ) -> Result<&'d A::Device, BridgeError> {
        match device {
            Some(device) if state == ContextState::Ready => Ok(device),
            _ => Err(BridgeError::InvalidState { operation, state }),
        }
    }

    /// Copy every plane of `image` into the input texture slots.
    pub fn upload(&mut self, image: &Image<'_>) -> Result<(), BridgeError> {
        let device = Self::ready_device(self.state, &self.device, "upload")?;
        self.stage = FrameStage::Idle;

        for (index, plane) in image.planes().iter().enumerate() {
            let (width, height) = image.plane_size(index);
            let desc = TextureDesc {
                width,
                height,
                format: plane.layout.format,
            };
            let (status, texture) = self
                .tex_in
                .ensure(&mut self.api, device, index, desc)
                .map_err(|source| UploadError::Texture {
                    plane: index,
                    source,
                })?;
            if status != SlotStatus::Reused {
                self.logger.debug(&format!(
                    "input plane {index}: {status:?} {width}x{height} texture"
                ));
            }
            self.api
                .upload(device, texture, plane)
                .map_err(|source| UploadError::Transfer {
                    plane: index,
                    source,
                })?;
        }

        self.tex_in.truncate(&mut self.api, device, image.num_planes());
        self.input_layout = Some(image.layout());
        self.stage = FrameStage::Uploaded;
        Ok(())
    }

    /// Render `op` from the uploaded planes into output slots shaped like `output`.
    pub fn invoke(&mut self, op: &FilterOp, output: &ImageLayout) -> Result<(), BridgeError> {
        let device = Self::ready_device(self.state, &self.device, "invoke")?;
        let (Some(dispatch), Some(renderer)) = (self.dispatch.as_mut(), self.renderer.as_mut())
        else {
            return Err(BridgeError::InvalidState {
                operation: "invoke",
                state: self.state,
            });
        };
        let Some(input_layout) = self.input_layout.as_ref() else {
            return Err(RenderError::NoInput.into());
        };
        if self.stage != FrameStage::Uploaded {
            self.stage = FrameStage::Idle;
            return Err(RenderError::NoInput.into());
        }
        self.stage = FrameStage::Idle;
        output.validate().map_err(RenderError::Layout)?;

        for index in 0..output.num_planes() {
            let (width, height) = output.plane_size(index);
            let desc = TextureDesc {
                width,
                height,
                format: output.planes[index].format,
            };
            let (status, _) = self
                .tex_out
                .ensure(&mut self.api, device, index, desc)
                .map_err(|source| RenderError::Texture {
                    plane: index,
                    source,
                })?;
            if status != SlotStatus::Reused {
                self.logger.debug(&format!(
                    "output plane {index}: {status:?} {width}x{height} texture"
                ));
            }
        }
        self.tex_out.truncate(&mut self.api, device, output.num_planes());

        let tex_in = &self.tex_in;
        let tex_out = &self.tex_out;
        let inputs = input_layout
            .planes
            .iter()
            .enumerate()
            .filter_map(|(index, plane)| {
                tex_in.get(index).map(|slot| BoundTexture {
                    texture: &slot.texture,
                    desc: slot.desc,
                    subx: plane.subx,
                    suby: plane.suby,
                })
            })
            .collect();
        let outputs = output
            .planes
            .iter()
            .enumerate()
            .filter_map(|(index, plane)| {
                tex_out.get(index).map(|slot| BoundTexture {
                    texture: &slot.texture,
                    desc: slot.desc,
                    subx: plane.subx,
                    suby: plane.suby,
                })
            })
            .collect();

        let job = RenderJob {
            device,
            dispatch,
            renderer,
            dither: &mut self.dither,
            inputs,
            outputs,
            frame: self.frames,
        };
        if let Err(err) = self.api.render(job, op) {
            self.logger
                .error(&format!("{} failed on frame {}: {err}", op.name(), self.frames));
            return Err(RenderError::Failed(err).into());
        }

        self.frames += 1;
        self.stage = FrameStage::Rendered;
        Ok(())
    }

    /// Copy the rendered output planes into `out`.
    pub fn download(&mut self, out: &mut ImageMut<'_>) -> Result<(), BridgeError> {
        let device = Self::ready_device(self.state, &self.device, "download")?;
        if self.stage != FrameStage::Rendered {
            return Err(DownloadError::NotRendered.into());
        }
        self.stage = FrameStage::Idle;

        let expected = self.tex_out.len();
        if out.num_planes() != expected {
            return Err(DownloadError::PlaneCount {
                expected,
                got: out.num_planes(),
            }
            .into());
        }

        // Every plane is checked before any host memory is written.
        let layout = out.layout();
        for (index, plane) in layout.planes.iter().enumerate() {
            let (got_width, got_height) = layout.plane_size(index);
            let Some(slot) = self.tex_out.get(index) else {
                return Err(DownloadError::NotRendered.into());
            };
            let got = TextureDesc {
                width: got_width,
                height: got_height,
                format: plane.format,
            };
            if slot.desc != got {
                return Err(DownloadError::PlaneMismatch {
                    plane: index,
                    width: slot.desc.width,
                    height: slot.desc.height,
                    format: slot.desc.format,
                    got_width,
                    got_height,
                    got_format: plane.format,
                }
                .into());
            }
        }

        for index in 0..expected {
            let Some(slot) = self.tex_out.get_mut(index) else {
                return Err(DownloadError::NotRendered.into());
            };
            self.api
                .download(device, &mut slot.texture, out.plane_mut(index))
                .map_err(|source| DownloadError::Transfer {
                    plane: index,
                    source,
                })?;
        }
        Ok(())
    }

    /// Upload `src`, render `op` into `dst`'s layout and download into `dst`.
    pub fn process(
        &mut self,
        op: &FilterOp,
        src: &Image<'_>,
        dst: &mut ImageMut<'_>,
    ) -> Result<(), BridgeError> {
        self.upload(src)?;
        self.invoke(op, &dst.layout())?;
        self.download(dst)
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Backend the device was created on, while ready.
    pub fn backend(&self) -> Option<BackendKind> {
        self.backend
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Frames rendered so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn input_slots(&self) -> usize {
        self.tex_in.len()
    }

    pub fn output_slots(&self) -> usize {
        self.tex_out.len()
    }
}

impl<A: GpuApi> Drop for Context<A> {
    fn drop(&mut self) {
        self.destroy();
    }
}
