//! Planar image descriptions borrowed from the host.
//!
//! An [`Image`] is a read-only view over host frame memory, an [`ImageMut`]
//! the writable counterpart used for filter output. Neither owns its
//! buffers; the bridge only borrows them for the duration of one call.

/// Maximum number of planes in one image.
pub const MAX_PLANES: usize = 4;

/// Errors describing malformed image descriptions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    #[error("Image must have between 1 and {MAX_PLANES} planes, got {0}")]
    PlaneCount(usize),
    #[error("Image dimensions must be non-zero, got {width}x{height}")]
    ZeroSize { width: u32, height: u32 },
    #[error("Plane {plane} has unsupported format: {num_comps} components at {bit_depth} bits")]
    UnsupportedFormat {
        plane: usize,
        num_comps: u8,
        bit_depth: u8,
    },
    #[error("Plane {plane} subsampling ({subx}, {suby}) leaves an empty plane")]
    Subsampling { plane: usize, subx: u8, suby: u8 },
    #[error("Plane {plane} stride {stride} is shorter than a row ({row_bytes} bytes)")]
    StrideTooSmall {
        plane: usize,
        stride: usize,
        row_bytes: usize,
    },
    #[error("Plane {plane} buffer holds {got} bytes, need {needed}")]
    BufferTooSmall {
        plane: usize,
        needed: usize,
        got: usize,
    },
}

/// Pixel format of one plane: component count and bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaneFormat {
    pub num_comps: u8,
    pub bit_depth: u8,
}

impl PlaneFormat {
    pub const fn new(num_comps: u8, bit_depth: u8) -> Self {
        Self {
            num_comps,
            bit_depth,
        }
    }

    /// 8-bit single component.
    pub const GRAY8: Self = Self::new(1, 8);
    /// 16-bit single component.
    pub const GRAY16: Self = Self::new(1, 16);
    /// 32-bit float single component.
    pub const GRAYF: Self = Self::new(1, 32);

    /// Bytes used to store one component.
    pub fn bytes_per_component(&self) -> usize {
        match self.bit_depth {
            0..=8 => 1,
            9..=16 => 2,
            _ => 4,
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.bytes_per_component() * self.num_comps as usize
    }

    /// Samples are 32-bit floats rather than normalized integers.
    pub fn is_float(&self) -> bool {
        self.bit_depth == 32
    }

    pub fn is_supported(&self) -> bool {
        let depth_ok = matches!(self.bit_depth, 8..=16 | 32);
        let comps_ok = matches!(self.num_comps, 1 | 2 | 4);
        depth_ok && comps_ok
    }

    /// Factor that maps a stored normalized sample onto `0.0..=1.0` of the
    /// format's real range (10-bit data lives in 16-bit words).
    pub fn sample_scale(&self) -> f32 {
        match self.bytes_per_component() {
            2 => 65535.0 / ((1u32 << self.bit_depth) - 1) as f32,
            _ => 1.0,
        }
    }

    /// Highest code value for integer formats, zero for float.
    pub fn max_code(&self) -> f32 {
        if self.is_float() {
            0.0
        } else {
            ((1u32 << self.bit_depth) - 1) as f32
        }
    }
}

impl std::fmt::Display for PlaneFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_float() {
            write!(f, "{}x float", self.num_comps)
        } else {
            write!(f, "{}x {}-bit", self.num_comps, self.bit_depth)
        }
    }
}

/// Geometry and format of one plane, without data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaneLayout {
    pub subx: u8,
    pub suby: u8,
    pub format: PlaneFormat,
}

impl PlaneLayout {
    pub const fn new(subx: u8, suby: u8, format: PlaneFormat) -> Self {
        Self { subx, suby, format }
    }
}

/// Geometry and formats of a whole image, without data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageLayout {
    pub width: u32,
    pub height: u32,
    pub planes: Vec<PlaneLayout>,
}

impl ImageLayout {
    /// Create a layout, checking plane count, formats and subsampling.
    pub fn new(width: u32, height: u32, planes: Vec<PlaneLayout>) -> Result<Self, ImageError> {
        let layout = Self {
            width,
            height,
            planes,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Three-plane 4:2:0 YUV layout.
    pub fn yuv420(width: u32, height: u32, format: PlaneFormat) -> Result<Self, ImageError> {
        Self::new(
            width,
            height,
            vec![
                PlaneLayout::new(0, 0, format),
                PlaneLayout::new(1, 1, format),
                PlaneLayout::new(1, 1, format),
            ],
        )
    }

    /// Three unsubsampled planes (RGB or 4:4:4 YUV).
    pub fn planar444(width: u32, height: u32, format: PlaneFormat) -> Result<Self, ImageError> {
        Self::new(width, height, vec![PlaneLayout::new(0, 0, format); 3])
    }

    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }

    /// Dimensions of plane `index`.
    pub fn plane_size(&self, index: usize) -> (u32, u32) {
        let plane = &self.planes[index];
        (self.width >> plane.subx, self.height >> plane.suby)
    }

    /// Same planes at different frame dimensions.
    pub fn resized(&self, width: u32, height: u32) -> Result<Self, ImageError> {
        Self::new(width, height, self.planes.clone())
    }

    pub fn validate(&self) -> Result<(), ImageError> {
        if self.planes.is_empty() || self.planes.len() > MAX_PLANES {
            return Err(ImageError::PlaneCount(self.planes.len()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ImageError::ZeroSize {
                width: self.width,
                height: self.height,
            });
        }
        for (index, plane) in self.planes.iter().enumerate() {
            if !plane.format.is_supported() {
                return Err(ImageError::UnsupportedFormat {
                    plane: index,
                    num_comps: plane.format.num_comps,
                    bit_depth: plane.format.bit_depth,
                });
            }
            let empty = plane.subx >= 32
                || plane.suby >= 32
                || self.width >> plane.subx == 0
                || self.height >> plane.suby == 0;
            if empty {
                return Err(ImageError::Subsampling {
                    plane: index,
                    subx: plane.subx,
                    suby: plane.suby,
                });
            }
        }
        Ok(())
    }
}

/// One borrowed input plane.
#[derive(Debug, Clone, Copy)]
pub struct Plane<'a> {
    pub layout: PlaneLayout,
    pub stride: usize,
    pub data: &'a [u8],
}

/// One borrowed output plane.
#[derive(Debug)]
pub struct PlaneMut<'a> {
    pub layout: PlaneLayout,
    pub stride: usize,
    pub data: &'a mut [u8],
}

fn check_buffer(
    plane: usize,
    width: u32,
    height: u32,
    format: PlaneFormat,
    stride: usize,
    len: usize,
) -> Result<(), ImageError> {
    let row_bytes = width as usize * format.bytes_per_pixel();
    if stride < row_bytes {
        return Err(ImageError::StrideTooSmall {
            plane,
            stride,
            row_bytes,
        });
    }
    let needed = stride * (height as usize - 1) + row_bytes;
    if len < needed {
        return Err(ImageError::BufferTooSmall {
            plane,
            needed,
            got: len,
        });
    }
    Ok(())
}

/// A host frame borrowed for reading.
#[derive(Debug, Clone)]
pub struct Image<'a> {
    width: u32,
    height: u32,
    planes: Vec<Plane<'a>>,
}

impl<'a> Image<'a> {
    pub fn new(width: u32, height: u32, planes: Vec<Plane<'a>>) -> Result<Self, ImageError> {
        let image = Self {
            width,
            height,
            planes,
        };
        let layout = image.layout();
        layout.validate()?;
        for (index, plane) in image.planes.iter().enumerate() {
            let (w, h) = layout.plane_size(index);
            check_buffer(index, w, h, plane.layout.format, plane.stride, plane.data.len())?;
        }
        Ok(image)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }

    pub fn plane(&self, index: usize) -> &Plane<'a> {
        &self.planes[index]
    }

    pub fn planes(&self) -> &[Plane<'a>] {
        &self.planes
    }

    pub fn plane_size(&self, index: usize) -> (u32, u32) {
        let plane = &self.planes[index].layout;
        (self.width >> plane.subx, self.height >> plane.suby)
    }

    pub fn layout(&self) -> ImageLayout {
        ImageLayout {
            width: self.width,
            height: self.height,
            planes: self.planes.iter().map(|p| p.layout).collect(),
        }
    }
}

/// A host frame borrowed for writing.
#[derive(Debug)]
pub struct ImageMut<'a> {
    width: u32,
    height: u32,
    planes: Vec<PlaneMut<'a>>,
}

impl<'a> ImageMut<'a> {
    pub fn new(width: u32, height: u32, planes: Vec<PlaneMut<'a>>) -> Result<Self, ImageError> {
        let image = Self {
            width,
            height,
            planes,
        };
        let layout = image.layout();
        layout.validate()?;
        for (index, plane) in image.planes.iter().enumerate() {
            let (w, h) = layout.plane_size(index);
            check_buffer(index, w, h, plane.layout.format, plane.stride, plane.data.len())?;
        }
        Ok(image)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }

    pub fn plane_mut(&mut self, index: usize) -> &mut PlaneMut<'a> {
        &mut self.planes[index]
    }

    pub fn plane_size(&self, index: usize) -> (u32, u32) {
        let plane = &self.planes[index].layout;
        (self.width >> plane.subx, self.height >> plane.suby)
    }

    pub fn layout(&self) -> ImageLayout {
        ImageLayout {
            width: self.width,
            height: self.height,
            planes: self.planes.iter().map(|p| p.layout).collect(),
        }
    }
}

/// Heap-allocated frame for hosts without their own allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedFrame {
    layout: ImageLayout,
    strides: Vec<usize>,
    buffers: Vec<Vec<u8>>,
}

impl OwnedFrame {
    /// Allocate a zeroed frame with tightly packed rows.
    pub fn new(layout: ImageLayout) -> Result<Self, ImageError> {
        Self::with_alignment(layout, 1)
    }

    /// Allocate a zeroed frame whose row strides are rounded up to `align` bytes.
    pub fn with_alignment(layout: ImageLayout, align: usize) -> Result<Self, ImageError> {
        layout.validate()?;
        let align = align.max(1);
        let mut strides = Vec::with_capacity(layout.num_planes());
        let mut buffers = Vec::with_capacity(layout.num_planes());
        for (index, plane) in layout.planes.iter().enumerate() {
            let (w, h) = layout.plane_size(index);
            let stride = (w as usize * plane.format.bytes_per_pixel()).div_ceil(align) * align;
            strides.push(stride);
            buffers.push(vec![0u8; stride * h as usize]);
        }
        Ok(Self {
            layout,
            strides,
            buffers,
        })
    }

    pub fn layout(&self) -> &ImageLayout {
        &self.layout
    }

    pub fn stride(&self, plane: usize) -> usize {
        self.strides[plane]
    }

    pub fn plane_data(&self, plane: usize) -> &[u8] {
        &self.buffers[plane]
    }

    pub fn plane_data_mut(&mut self, plane: usize) -> &mut [u8] {
        &mut self.buffers[plane]
    }

    /// Visible bytes of one row, without stride padding.
    pub fn row(&self, plane: usize, y: u32) -> &[u8] {
        let (w, _) = self.layout.plane_size(plane);
        let row_bytes = w as usize * self.layout.planes[plane].format.bytes_per_pixel();
        let start = y as usize * self.strides[plane];
        &self.buffers[plane][start..start + row_bytes]
    }

    pub fn as_image(&self) -> Image<'_> {
        let planes = self
            .layout
            .planes
            .iter()
            .zip(&self.strides)
            .zip(&self.buffers)
            .map(|((layout, &stride), data)| Plane {
                layout: *layout,
                stride,
                data,
            })
            .collect();
        Image {
            width: self.layout.width,
            height: self.layout.height,
            planes,
        }
    }

    pub fn as_image_mut(&mut self) -> ImageMut<'_> {
        let planes = self
            .layout
            .planes
            .iter()
            .zip(&self.strides)
            .zip(self.buffers.iter_mut())
            .map(|((layout, &stride), data)| PlaneMut {
                layout: *layout,
                stride,
                data,
            })
            .collect();
        ImageMut {
            width: self.layout.width,
            height: self.layout.height,
            planes,
        }
    }

    /// True when the visible pixels of both frames are identical, ignoring padding.
    pub fn pixels_eq(&self, other: &OwnedFrame) -> bool {
        if self.layout != other.layout {
            return false;
        }
        (0..self.layout.num_planes()).all(|plane| {
            let (_, h) = self.layout.plane_size(plane);
            (0..h).all(|y| self.row(plane, y) == other.row(plane, y))
        })
    }
}
