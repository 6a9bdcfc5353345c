use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GlowError, GlowResult};

pub const DEFAULT_DOWNSAMPLE_FACTOR: u32 = 8;
pub const DEFAULT_GRID_EXTENT: u32 = 32;
pub const DEFAULT_UPSAMPLE_FACTOR: u32 = 2;
/// Largest coarse cube the glow computer accepts per axis.
pub const MAX_GRID_EXTENT: u32 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    Linear,
    #[default]
    Gaussian,
}

impl Interpolation {
    pub fn name(self) -> &'static str {
        match self {
            Interpolation::Nearest => "nearest",
            Interpolation::Linear => "linear",
            Interpolation::Gaussian => "gaussian",
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Interpolation {
    type Err = GlowError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(Interpolation::Nearest),
            "linear" => Ok(Interpolation::Linear),
            "gaussian" => Ok(Interpolation::Gaussian),
            other => Err(GlowError::invalid_config(format!(
                "unknown interpolation '{other}' (expected nearest, linear or gaussian)"
            ))),
        }
    }
}

/// What to do when the coarse grid ends up with no foreground voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyForegroundPolicy {
    #[default]
    Error,
    /// Return an all-zero field on the input grid.
    ZeroField,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlowConfig {
    /// Reserved. Documents the intended output spacing; the output always
    /// uses the input grid.
    pub target_spacing: f64,
    pub interpolation: Interpolation,
    pub mesa: bool,
    pub downsample_factor: u32,
    pub grid_extent: u32,
    pub upsample_factor: u32,
    pub empty_foreground: EmptyForegroundPolicy,
    /// Reject labels other than 0 and 1. When off, any non-zero value is
    /// foreground.
    pub strict_binary: bool,
}

impl Default for GlowConfig {
    fn default() -> Self {
        Self {
            target_spacing: 1.0,
            interpolation: Interpolation::default(),
            mesa: false,
            downsample_factor: DEFAULT_DOWNSAMPLE_FACTOR,
            grid_extent: DEFAULT_GRID_EXTENT,
            upsample_factor: DEFAULT_UPSAMPLE_FACTOR,
            empty_foreground: EmptyForegroundPolicy::default(),
            strict_binary: true,
        }
    }
}

impl GlowConfig {
    pub fn validate(&self) -> GlowResult<()> {
        if self.downsample_factor == 0 {
            return Err(GlowError::invalid_config("downsample_factor must be at least 1"));
        }
        if self.upsample_factor == 0 {
            return Err(GlowError::invalid_config("upsample_factor must be at least 1"));
        }
        if self.grid_extent == 0 {
            return Err(GlowError::invalid_config("grid_extent must be at least 1"));
        }
        if !self.target_spacing.is_finite() || self.target_spacing <= 0.0 {
            return Err(GlowError::invalid_config("target_spacing must be positive"));
        }
        if self.grid_extent > MAX_GRID_EXTENT
            || max_l1_distance(self.grid_extent).is_none()
            || lattice_len(self.grid_extent).is_none()
            || self.grid_extent.checked_mul(self.upsample_factor).is_none()
        {
            return Err(GlowError::GridExtentOverflow {
                extent: self.grid_extent,
            });
        }
        Ok(())
    }
}

/// Largest L1 distance between two lattice points, if it fits in i32.
pub fn max_l1_distance(extent: u32) -> Option<i32> {
    if extent == 0 {
        return None;
    }
    let extent = i32::try_from(extent).ok()?;
    (extent - 1).checked_mul(3)
}

pub fn lattice_len(extent: u32) -> Option<usize> {
    let extent = extent as usize;
    extent.checked_mul(extent)?.checked_mul(extent)
}
