//! Headless wgpu device bootstrap.

use wgpu::{Adapter, Device, Instance, Queue};

use crate::bridge::BackendKind;

/// Errors that can occur while opening a device.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No suitable {0} GPU adapter found")]
    NoAdapter(BackendKind),
    #[error("Adapter '{0}' is a software rasterizer and software rendering is disabled")]
    SoftwareAdapter(String),
    #[error("Failed to request device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
}

/// Knobs for device creation.
#[derive(Debug, Clone)]
pub struct DeviceOptions {
    pub allow_software: bool,
    /// Turn on backend validation layers.
    pub debug: bool,
    pub label: String,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            allow_software: true,
            debug: false,
            label: "placebo-bridge".to_string(),
        }
    }
}

/// wgpu API families for a backend kind.
pub fn backends_for(kind: BackendKind) -> wgpu::Backends {
    match kind {
        BackendKind::Native => wgpu::Backends::VULKAN | wgpu::Backends::METAL | wgpu::Backends::DX12,
        BackendKind::OpenGl => wgpu::Backends::GL,
    }
}

/// Device and queue for one context, opened on a single backend family.
pub struct WgpuDevice {
    pub instance: Instance,
    pub adapter: Adapter,
    pub device: Device,
    pub queue: Queue,
    kind: BackendKind,
    label: String,
}

impl WgpuDevice {
    /// Open a headless device on `kind`.
    pub async fn new(kind: BackendKind, options: &DeviceOptions) -> Result<Self, GpuError> {
        let flags = if options.debug {
            wgpu::InstanceFlags::debugging()
        } else {
            wgpu::InstanceFlags::default()
        };
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: backends_for(kind),
            flags,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .map_err(|_| GpuError::NoAdapter(kind))?;

        let info = adapter.get_info();
        if info.device_type == wgpu::DeviceType::Cpu && !options.allow_software {
            return Err(GpuError::SoftwareAdapter(info.name));
        }

        // 16-bit normalized formats are needed for 9-16 bit planes.
        let required_features =
            adapter.features() & wgpu::Features::TEXTURE_FORMAT_16BIT_NORM;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(options.label.as_str()),
                required_features,
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            kind,
            label: options.label.clone(),
        })
    }

    /// Blocking variant of [`WgpuDevice::new`].
    pub fn create(kind: BackendKind, options: &DeviceOptions) -> Result<Self, GpuError> {
        pollster::block_on(Self::new(kind, options))
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Get info about the GPU adapter.
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn supports_16bit_norm(&self) -> bool {
        self.device
            .features()
            .contains(wgpu::Features::TEXTURE_FORMAT_16BIT_NORM)
    }

    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    /// Block until all submitted work has finished.
    pub fn wait_idle(&self) -> Result<(), wgpu::PollError> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
    }

    /// Release the device. Resources created from it must already be gone.
    pub fn destroy(self) {
        self.device.destroy();
    }
}
