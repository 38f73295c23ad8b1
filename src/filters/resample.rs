//! Separable kernel resampling to new frame dimensions.

use serde::Deserialize;

use super::signature::{FilterSignature, ParamSpec, ParamType};
use super::FilterError;

pub const SIGNATURE: FilterSignature = FilterSignature {
    name: "Resample",
    params: &[
        ParamSpec::required("clip", ParamType::Clip),
        ParamSpec::required("width", ParamType::Int),
        ParamSpec::required("height", ParamType::Int),
        ParamSpec::optional("filter", ParamType::Data),
        ParamSpec::optional("radius", ParamType::Float),
        ParamSpec::optional("param1", ParamType::Float),
        ParamSpec::optional("param2", ParamType::Float),
        ParamSpec::optional("clamp", ParamType::Float),
        ParamSpec::optional("blur", ParamType::Float),
        ParamSpec::optional("taper", ParamType::Float),
        ParamSpec::optional("sx", ParamType::Float),
        ParamSpec::optional("sy", ParamType::Float),
        ParamSpec::optional("antiring", ParamType::Float),
    ],
};

/// Widest kernel support, in source pixels on each side.
pub const MAX_RADIUS: f32 = 16.0;

/// Named resampling kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKernel {
    Nearest,
    #[default]
    #[serde(alias = "triangle")]
    Bilinear,
    Bicubic,
    CatmullRom,
    Mitchell,
    Lanczos,
}

impl FilterKernel {
    /// Default support radius.
    pub fn radius(&self) -> f32 {
        match self {
            FilterKernel::Nearest => 0.5,
            FilterKernel::Bilinear => 1.0,
            FilterKernel::Bicubic | FilterKernel::CatmullRom | FilterKernel::Mitchell => 2.0,
            FilterKernel::Lanczos => 3.0,
        }
    }

    /// Default (B, C) for the cubic family; unused by the others.
    pub fn params(&self) -> (f32, f32) {
        match self {
            FilterKernel::Bicubic => (1.0, 0.0),
            FilterKernel::CatmullRom => (0.0, 0.5),
            FilterKernel::Mitchell => (1.0 / 3.0, 1.0 / 3.0),
            _ => (0.0, 0.0),
        }
    }

    /// Whether the radius is a free parameter rather than fixed by the kernel.
    pub fn is_resizable(&self) -> bool {
        matches!(self, FilterKernel::Lanczos)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResampleParams {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub filter: FilterKernel,
    #[serde(default)]
    pub radius: Option<f32>,
    #[serde(default)]
    pub param1: Option<f32>,
    #[serde(default)]
    pub param2: Option<f32>,
    /// Kernel stretch factor; above 1 blurs, below 1 sharpens.
    #[serde(default = "default_blur")]
    pub blur: f32,
    /// Scales negative kernel lobes by `1 - clamp`.
    #[serde(default)]
    pub clamp: f32,
    /// Width of the flat kernel centre.
    #[serde(default)]
    pub taper: f32,
    /// Strength of clamping to the nearest source pixels' range.
    #[serde(default)]
    pub antiring: f32,
    /// Horizontal source shift in luma pixels.
    #[serde(default)]
    pub sx: f32,
    #[serde(default)]
    pub sy: f32,
}

fn default_blur() -> f32 {
    1.0
}

impl ResampleParams {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filter: FilterKernel::default(),
            radius: None,
            param1: None,
            param2: None,
            blur: default_blur(),
            clamp: 0.0,
            taper: 0.0,
            antiring: 0.0,
            sx: 0.0,
            sy: 0.0,
        }
    }

    pub fn with_filter(mut self, filter: FilterKernel) -> Self {
        self.filter = filter;
        self
    }

    /// Support radius actually used by the kernel.
    pub fn effective_radius(&self) -> f32 {
        match self.radius {
            Some(radius) if self.filter.is_resizable() => radius,
            _ => self.filter.radius(),
        }
    }

    /// Kernel parameters with overrides applied.
    pub fn effective_params(&self) -> (f32, f32) {
        let (b, c) = self.filter.params();
        (self.param1.unwrap_or(b), self.param2.unwrap_or(c))
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if self.width == 0 || self.height == 0 {
            return Err(FilterError::invalid(
                SIGNATURE.name,
                format!(
                    "output dimensions must be non-zero, got {}x{}",
                    self.width, self.height
                ),
            ));
        }
        if !self.blur.is_finite() || self.blur <= 0.0 {
            return Err(FilterError::invalid(
                SIGNATURE.name,
                format!("blur must be positive, got {}", self.blur),
            ));
        }
        let radius = self.effective_radius();
        if !(radius > 0.0 && radius <= MAX_RADIUS) {
            return Err(FilterError::invalid(
                SIGNATURE.name,
                format!("radius must be in (0, {MAX_RADIUS}], got {radius}"),
            ));
        }
        for (name, value) in [
            ("clamp", self.clamp),
            ("taper", self.taper),
            ("antiring", self.antiring),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(FilterError::invalid(
                    SIGNATURE.name,
                    format!("{name} must be in [0, 1], got {value}"),
                ));
            }
        }
        if !self.sx.is_finite() || !self.sy.is_finite() {
            return Err(FilterError::invalid(SIGNATURE.name, "sx and sy must be finite"));
        }
        Ok(())
    }
}
