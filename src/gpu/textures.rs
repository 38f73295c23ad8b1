//! Plane textures and their host transfers.

use wgpu::{Device, Texture, TextureFormat, TextureUsages, TextureView};

use super::context::WgpuDevice;
use crate::bridge::{ApiError, TextureDesc, TextureRole};
use crate::image::{Plane, PlaneFormat, PlaneMut};

/// wgpu format holding one plane of `format`.
pub fn texture_format(format: PlaneFormat, norm16: bool) -> Result<TextureFormat, ApiError> {
    let texture_format = match (format.bytes_per_component(), format.num_comps) {
        (1, 1) => TextureFormat::R8Unorm,
        (1, 2) => TextureFormat::Rg8Unorm,
        (1, 4) => TextureFormat::Rgba8Unorm,
        (2, 1) => TextureFormat::R16Unorm,
        (2, 2) => TextureFormat::Rg16Unorm,
        (2, 4) => TextureFormat::Rgba16Unorm,
        (4, 1) if format.is_float() => TextureFormat::R32Float,
        (4, 2) if format.is_float() => TextureFormat::Rg32Float,
        (4, 4) if format.is_float() => TextureFormat::Rgba32Float,
        _ => {
            return Err(ApiError::Unsupported(format!(
                "{} components at {} bits",
                format.num_comps, format.bit_depth
            )))
        }
    };
    if format.bytes_per_component() == 2 && !norm16 {
        return Err(ApiError::Unsupported(format!(
            "{}-bit planes need 16-bit normalized textures, which this device lacks",
            format.bit_depth
        )));
    }
    Ok(texture_format)
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

fn copy_info(texture: &Texture) -> wgpu::TexelCopyTextureInfo<'_> {
    wgpu::TexelCopyTextureInfo {
        texture,
        mip_level: 0,
        origin: wgpu::Origin3d::ZERO,
        aspect: wgpu::TextureAspect::All,
    }
}

/// Bytes a strided plane must span.
fn span(stride: usize, height: u32, row_bytes: usize) -> usize {
    stride * (height as usize - 1) + row_bytes
}

/// One plane on the GPU. Output planes carry their own readback buffer.
pub struct PlaneTexture {
    texture: Texture,
    view: TextureView,
    desc: TextureDesc,
    format: TextureFormat,
    readback: Option<ReadbackBuffer>,
}

impl PlaneTexture {
    pub fn new(device: &WgpuDevice, desc: &TextureDesc, role: TextureRole) -> Result<Self, ApiError> {
        let format = texture_format(desc.format, device.supports_16bit_norm())?;
        let max = device.max_texture_dimension();
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(ApiError::Unsupported(format!(
                "{}x{} texture exceeds device limit of {max}",
                desc.width, desc.height
            )));
        }

        let (label, usage) = match role {
            TextureRole::Input => (
                "plane_input",
                TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST | TextureUsages::COPY_SRC,
            ),
            TextureRole::Output => (
                "plane_output",
                TextureUsages::RENDER_ATTACHMENT
                    | TextureUsages::TEXTURE_BINDING
                    | TextureUsages::COPY_SRC
                    | TextureUsages::COPY_DST,
            ),
        };

        let texture = device.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(desc.width, desc.height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let readback = match role {
            TextureRole::Input => None,
            TextureRole::Output => Some(ReadbackBuffer::new(
                &device.device,
                desc.width,
                desc.height,
                desc.format.bytes_per_pixel() as u32,
            )),
        };

        Ok(Self {
            texture,
            view,
            desc: *desc,
            format,
            readback,
        })
    }

    /// Get the texture view for rendering or sampling.
    pub fn view(&self) -> &TextureView {
        &self.view
    }

    /// Get the underlying texture (for copy operations).
    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    fn check_plane(&self, format: PlaneFormat, stride: usize, len: usize) -> Result<usize, ApiError> {
        if format != self.desc.format {
            return Err(ApiError::InvalidInput(format!(
                "plane format {}x{}bit does not match texture format {}x{}bit",
                format.num_comps,
                format.bit_depth,
                self.desc.format.num_comps,
                self.desc.format.bit_depth
            )));
        }
        let row_bytes = self.desc.width as usize * format.bytes_per_pixel();
        if stride < row_bytes {
            return Err(ApiError::InvalidInput(format!(
                "stride {stride} is shorter than a row of {row_bytes} bytes"
            )));
        }
        let needed = span(stride, self.desc.height, row_bytes);
        if len < needed {
            return Err(ApiError::InvalidInput(format!(
                "plane holds {len} bytes, need {needed}"
            )));
        }
        Ok(needed)
    }

    /// Write a host plane into the texture.
    pub fn upload(&self, device: &WgpuDevice, plane: &Plane<'_>) -> Result<(), ApiError> {
        let needed = self.check_plane(plane.layout.format, plane.stride, plane.data.len())?;
        let bytes_per_row = u32::try_from(plane.stride)
            .map_err(|_| ApiError::InvalidInput(format!("stride {} is too large", plane.stride)))?;

        device.queue.write_texture(
            copy_info(&self.texture),
            &plane.data[..needed],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(self.desc.height),
            },
            extent(self.desc.width, self.desc.height),
        );
        Ok(())
    }

    /// Read the texture back into a host plane. Blocks until the copy is done.
    pub fn download(&mut self, device: &WgpuDevice, plane: &mut PlaneMut<'_>) -> Result<(), ApiError> {
        self.check_plane(plane.layout.format, plane.stride, plane.data.len())?;
        let Some(readback) = self.readback.as_ref() else {
            return Err(ApiError::InvalidInput(
                "input textures cannot be downloaded".to_string(),
            ));
        };

        let mut encoder = device
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("download_encoder"),
            });
        readback.encode_copy(&mut encoder, &self.texture);
        device.queue.submit(std::iter::once(encoder.finish()));

        readback.read_into(&device.device, plane.data, plane.stride)
    }

    /// Record a full copy of this texture into `dst`, which must match in size and format.
    pub fn encode_copy_to(&self, encoder: &mut wgpu::CommandEncoder, dst: &PlaneTexture) {
        encoder.copy_texture_to_texture(
            copy_info(&self.texture),
            copy_info(&dst.texture),
            extent(self.desc.width, self.desc.height),
        );
    }

    pub fn destroy(self) {
        if let Some(readback) = self.readback {
            readback.destroy();
        }
        drop(self.view);
        self.texture.destroy();
    }
}

/// Readback buffer for copying GPU texture data to CPU.
pub struct ReadbackBuffer {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_row_bytes: u32,
    unpadded_row_bytes: u32,
}

impl ReadbackBuffer {
    /// Create a new readback buffer sized for the given dimensions.
    pub fn new(device: &Device, width: u32, height: u32, bytes_per_pixel: u32) -> Self {
        let unpadded_row_bytes = width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row_bytes = unpadded_row_bytes.div_ceil(align) * align;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_buffer"),
            size: padded_row_bytes as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            width,
            height,
            padded_row_bytes,
            unpadded_row_bytes,
        }
    }

    /// Get the padded bytes per row (for texture copy).
    pub fn padded_row_bytes(&self) -> u32 {
        self.padded_row_bytes
    }

    pub fn encode_copy(&self, encoder: &mut wgpu::CommandEncoder, texture: &Texture) {
        encoder.copy_texture_to_buffer(
            copy_info(texture),
            wgpu::TexelCopyBufferInfo {
                buffer: &self.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_row_bytes),
                    rows_per_image: Some(self.height),
                },
            },
            extent(self.width, self.height),
        );
    }

    /// Map the buffer and copy its rows into `dst`, removing row padding.
    pub fn read_into(&self, device: &Device, dst: &mut [u8], dst_stride: usize) -> Result<(), ApiError> {
        let row_bytes = self.unpadded_row_bytes as usize;
        if dst_stride < row_bytes || dst.len() < span(dst_stride, self.height, row_bytes) {
            return Err(ApiError::InvalidInput(
                "destination plane is too small".to_string(),
            ));
        }

        let buffer_slice = self.buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| ApiError::Failed(format!("device poll failed: {e}")))?;
        receiver
            .recv()
            .map_err(|e| ApiError::Failed(format!("buffer mapping was dropped: {e}")))?
            .map_err(|e| ApiError::Failed(format!("buffer mapping failed: {e}")))?;

        {
            let data = buffer_slice.get_mapped_range();
            for row in 0..self.height as usize {
                let src = row * self.padded_row_bytes as usize;
                let out = row * dst_stride;
                dst[out..out + row_bytes].copy_from_slice(&data[src..src + row_bytes]);
            }
        }
        self.buffer.unmap();
        Ok(())
    }

    pub fn destroy(self) {
        self.buffer.destroy();
    }
}
