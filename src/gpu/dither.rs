//! Persistent ordered-dither threshold map.

use wgpu::{Texture, TextureView};

use super::context::WgpuDevice;

/// Side length of the threshold map.
pub const DITHER_SIZE: u32 = 16;

/// Bayer matrix of side `size` (a power of two), as thresholds in (0, 1).
pub fn bayer_matrix(size: u32) -> Vec<f32> {
    let bits = size.trailing_zeros();
    let count = (size * size) as f32;
    (0..size * size)
        .map(|i| {
            let (x, y) = (i % size, i / size);
            let xy = x ^ y;
            // Interleave bits of (x ^ y) and y, most significant first.
            let mut rank = 0;
            for bit in (0..bits).rev() {
                rank = (rank << 2) | (((xy >> bit) & 1) << 1) | ((y >> bit) & 1);
            }
            (rank as f32 + 0.5) / count
        })
        .collect()
}

/// The dither texture, created on first use and kept for the context's life.
pub struct DitherMap {
    texture: Texture,
    view: TextureView,
}

impl DitherMap {
    pub fn new(device: &WgpuDevice) -> Self {
        let size = wgpu::Extent3d {
            width: DITHER_SIZE,
            height: DITHER_SIZE,
            depth_or_array_layers: 1,
        };
        let texture = device.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("dither_map"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let values = bayer_matrix(DITHER_SIZE);
        device.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&values),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(DITHER_SIZE * 4),
                rows_per_image: Some(DITHER_SIZE),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    pub fn view(&self) -> &TextureView {
        &self.view
    }

    pub fn destroy(self) {
        drop(self.view);
        self.texture.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bayer_2x2() {
        let m = bayer_matrix(2);
        let ranks: Vec<u32> = m.iter().map(|v| (v * 4.0 - 0.5).round() as u32).collect();
        assert_eq!(ranks, vec![0, 2, 3, 1]);
    }

    #[test]
    fn test_bayer_is_a_permutation() {
        let m = bayer_matrix(DITHER_SIZE);
        let count = (DITHER_SIZE * DITHER_SIZE) as usize;
        let mut ranks: Vec<usize> = m
            .iter()
            .map(|v| (v * count as f32 - 0.5).round() as usize)
            .collect();
        ranks.sort_unstable();
        assert_eq!(ranks, (0..count).collect::<Vec<_>>());
        assert!(m.iter().all(|&v| v > 0.0 && v < 1.0));
    }
}
