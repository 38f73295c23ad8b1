//! Peak-brightness mapping between a source and a target display.

use serde::Deserialize;

use super::signature::{FilterSignature, ParamSpec, ParamType};
use super::FilterError;

pub const SIGNATURE: FilterSignature = FilterSignature {
    name: "Tonemap",
    params: &[
        ParamSpec::required("clip", ParamType::Clip),
        ParamSpec::optional("src_peak", ParamType::Float),
        ParamSpec::optional("dst_peak", ParamType::Float),
        ParamSpec::optional("tone_mapping_algo", ParamType::Int),
        ParamSpec::optional("tone_mapping_param", ParamType::Float),
    ],
};

/// Supported tone-mapping curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneMapping {
    /// Hard clip at the target peak.
    Clip,
    /// Scale by `tone_mapping_param`.
    Linear,
}

impl ToneMapping {
    pub fn id(&self) -> i64 {
        match self {
            ToneMapping::Clip => 0,
            ToneMapping::Linear => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TonemapParams {
    /// Source peak brightness in nits.
    pub src_peak: f32,
    /// Target peak brightness in nits.
    pub dst_peak: f32,
    pub tone_mapping_algo: i64,
    pub tone_mapping_param: f32,
}

impl Default for TonemapParams {
    fn default() -> Self {
        Self {
            src_peak: 1000.0,
            dst_peak: 100.0,
            tone_mapping_algo: ToneMapping::Clip.id(),
            tone_mapping_param: 1.0,
        }
    }
}

impl TonemapParams {
    pub fn algorithm(&self) -> Result<ToneMapping, FilterError> {
        match self.tone_mapping_algo {
            0 => Ok(ToneMapping::Clip),
            5 => Ok(ToneMapping::Linear),
            id @ 1..=6 => Err(FilterError::unsupported(
                SIGNATURE.name,
                format!("tone_mapping_algo {id}"),
            )),
            id => Err(FilterError::invalid(
                SIGNATURE.name,
                format!("unknown tone_mapping_algo {id}"),
            )),
        }
    }

    /// Factor applied to each normalized sample before clamping.
    pub fn gain(&self) -> Result<f32, FilterError> {
        Ok(match self.algorithm()? {
            ToneMapping::Clip => self.src_peak / self.dst_peak,
            ToneMapping::Linear => self.tone_mapping_param,
        })
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        self.algorithm()?;
        for (name, value) in [("src_peak", self.src_peak), ("dst_peak", self.dst_peak)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(FilterError::invalid(
                    SIGNATURE.name,
                    format!("{name} must be positive, got {value}"),
                ));
            }
        }
        if !self.tone_mapping_param.is_finite() || self.tone_mapping_param < 0.0 {
            return Err(FilterError::invalid(
                SIGNATURE.name,
                format!(
                    "tone_mapping_param must be non-negative, got {}",
                    self.tone_mapping_param
                ),
            ));
        }
        Ok(())
    }
}
