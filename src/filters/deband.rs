//! Debanding: randomized neighbourhood averaging with grain and dithering.

use serde::Deserialize;

use super::signature::{int_bool, FilterSignature, ParamSpec, ParamType};
use super::FilterError;

pub const SIGNATURE: FilterSignature = FilterSignature {
    name: "Deband",
    params: &[
        ParamSpec::required("clip", ParamType::Clip),
        ParamSpec::optional("planes", ParamType::Int),
        ParamSpec::optional("iterations", ParamType::Int),
        ParamSpec::optional("threshold", ParamType::Float),
        ParamSpec::optional("radius", ParamType::Float),
        ParamSpec::optional("grain", ParamType::Float),
        ParamSpec::optional("dither", ParamType::Int),
        ParamSpec::optional("dither_algo", ParamType::Int),
    ],
};

const MAX_ITERATIONS: u32 = 16;

/// Dithering method applied when quantizing the debanded result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "i64")]
pub enum DitherAlgo {
    #[default]
    BlueNoise,
    OrderedLut,
    OrderedFixed,
    WhiteNoise,
}

impl DitherAlgo {
    /// Whether this method reads the persistent threshold map.
    pub fn uses_threshold_map(&self) -> bool {
        !matches!(self, DitherAlgo::WhiteNoise)
    }
}

impl TryFrom<i64> for DitherAlgo {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DitherAlgo::BlueNoise),
            1 => Ok(DitherAlgo::OrderedLut),
            2 => Ok(DitherAlgo::OrderedFixed),
            3 => Ok(DitherAlgo::WhiteNoise),
            other => Err(format!("dither_algo must be between 0 and 3, got {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebandParams {
    /// Bitmask of planes to process; the rest are copied.
    pub planes: u32,
    pub iterations: u32,
    /// Cut-off for the averaging step, in 1/1000 of the full range.
    pub threshold: f32,
    /// Initial sampling radius in pixels; grows with each iteration.
    pub radius: f32,
    /// Amount of noise added after debanding.
    pub grain: f32,
    #[serde(deserialize_with = "int_bool")]
    pub dither: bool,
    pub dither_algo: DitherAlgo,
}

impl Default for DebandParams {
    fn default() -> Self {
        Self {
            planes: 1,
            iterations: 1,
            threshold: 4.0,
            radius: 16.0,
            grain: 6.0,
            dither: true,
            dither_algo: DitherAlgo::BlueNoise,
        }
    }
}

impl DebandParams {
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.iterations > MAX_ITERATIONS {
            return Err(FilterError::invalid(
                SIGNATURE.name,
                format!(
                    "iterations must be at most {MAX_ITERATIONS}, got {}",
                    self.iterations
                ),
            ));
        }
        for (name, value) in [
            ("threshold", self.threshold),
            ("radius", self.radius),
            ("grain", self.grain),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(FilterError::invalid(
                    SIGNATURE.name,
                    format!("{name} must be a non-negative number, got {value}"),
                ));
            }
        }
        Ok(())
    }

    pub fn processes_plane(&self, plane: usize) -> bool {
        plane < 32 && self.planes & (1 << plane) != 0
    }
}
