//! Error types for glow field computation.

use thiserror::Error;

pub type GlowResult<T> = Result<T, GlowError>;

#[derive(Debug, Error)]
pub enum GlowError {
    /// The input is not a usable 3D labeled volume.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The downsampled grid holds no foreground voxel.
    #[error("coarse grid has no foreground voxels ({coarse_extent}^3 grid at downsample factor {factor})")]
    EmptyForeground { coarse_extent: u32, factor: u32 },

    /// Normalization would divide by a zero or non-finite maximum.
    #[error("glow field maximum is {max}, cannot normalize")]
    DegenerateField { max: f32 },

    /// Lattice arithmetic for this extent does not fit the coordinate type.
    #[error("grid extent {extent} overflows coordinate arithmetic")]
    GridExtentOverflow { extent: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("resampling failed: {0}")]
    Resampling(String),

    #[error("volume io: {0}")]
    Io(#[from] std::io::Error),

    #[error("volume format: {0}")]
    Format(String),
}

impl GlowError {
    pub fn invalid_input(details: impl Into<String>) -> Self {
        Self::InvalidInput(details.into())
    }

    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig(details.into())
    }

    pub fn resampling(details: impl Into<String>) -> Self {
        Self::Resampling(details.into())
    }

    pub fn format(details: impl Into<String>) -> Self {
        Self::Format(details.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_carries_details() {
        let err = GlowError::invalid_input("label 3 at voxel 7");
        assert!(format!("{err}").contains("label 3 at voxel 7"));

        let err = GlowError::EmptyForeground {
            coarse_extent: 32,
            factor: 8,
        };
        assert!(format!("{err}").contains("no foreground"));

        let err = GlowError::GridExtentOverflow { extent: 9000 };
        assert!(format!("{err}").contains("9000"));
    }
}
