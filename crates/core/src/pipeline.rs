use std::path::{Path, PathBuf};

use tracing::{debug, debug_span, warn};

use crate::config::{EmptyForegroundPolicy, GlowConfig, Interpolation};
use crate::downsample::{downsample_labels, foreground_mask, nonzero_coords};
use crate::error::{GlowError, GlowResult};
use crate::glow_field::glow_volume;
use crate::normalize::{composite_mesa, normalize_by_max, pin_foreground};
use crate::progress::{report, report_stage, GlowStage, ProgressEvent, ProgressSink};
use crate::resample::{resample_onto, upsample};
use crate::volume::Volume;
use crate::volume_io::read_volume;


/// A labeled contour, either in memory or in a `GVOL` file.
#[derive(Debug, Clone)]
pub enum GlowInput {
    Volume(Volume),
    Path(PathBuf),
}

impl GlowInput {
    fn load(self) -> GlowResult<Volume> {
        match self {
            GlowInput::Volume(volume) => Ok(volume),
            GlowInput::Path(path) => read_volume(&path),
        }
    }
}

impl From<Volume> for GlowInput {
    fn from(volume: Volume) -> Self {
        GlowInput::Volume(volume)
    }
}

impl From<PathBuf> for GlowInput {
    fn from(path: PathBuf) -> Self {
        GlowInput::Path(path)
    }
}

impl From<&Path> for GlowInput {
    fn from(path: &Path) -> Self {
        GlowInput::Path(path.to_path_buf())
    }
}

/// Intermediate results of one run.
#[derive(Debug, Clone)]
pub struct GlowStages {
    /// Downsampled labels on the coarse cube.
    pub coarse: Volume,
    /// Raw glow sums on the coarse cube.
    pub coarse_glow: Volume,
    /// Coarse glow after smooth upsampling.
    pub upsampled: Volume,
    /// Normalized field on the input grid.
    pub output: Volume,
}

#[derive(Clone)]
pub struct GlowPipeline {
    config: GlowConfig,
    progress: Option<ProgressSink>,
}

impl std::fmt::Debug for GlowPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlowPipeline")
            .field("config", &self.config)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl GlowPipeline {
    pub fn new(config: GlowConfig) -> GlowResult<Self> {
        config.validate()?;
        if config.target_spacing != 1.0 {
            warn!(
                "target_spacing {} is reserved; output uses the input grid",
                config.target_spacing
            );
        }
        Ok(Self {
            config,
            progress: None,
        })
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn config(&self) -> &GlowConfig {
        &self.config
    }

    pub fn run(&self, input: impl Into<GlowInput>) -> GlowResult<Volume> {
        Ok(self.run_with_stages(input)?.output)
    }

    pub fn run_with_stages(&self, input: impl Into<GlowInput>) -> GlowResult<GlowStages> {
        let labels = input.into().load()?;
        labels.validate()?;
        let _span = debug_span!("glow", dims = ?labels.dims, mesa = self.config.mesa).entered();
        let sink = self.progress.as_ref();
        report(sink, ProgressEvent::Start);

        let foreground = foreground_mask(&labels, self.config.strict_binary)?;
        let coarse = downsample_labels(
            &labels,
            self.config.downsample_factor,
            self.config.grid_extent,
        )?;
        report_stage(sink, GlowStage::Downsample);

        let coords = nonzero_coords(&coarse);
        debug!(
            "coarse grid {:?} spacing {:?}: {} foreground voxels",
            coarse.dims,
            coarse.spacing,
            coords.len()
        );
        if coords.is_empty() {
            match self.config.empty_foreground {
                EmptyForegroundPolicy::Error => {
                    return Err(GlowError::EmptyForeground {
                        coarse_extent: self.config.grid_extent,
                        factor: self.config.downsample_factor,
                    });
                }
                EmptyForegroundPolicy::ZeroField => {
                    warn!("coarse grid has no foreground; producing an all-zero field");
                }
            }
        }

        let coarse_glow = glow_volume(&coarse, &coords)?;
        report_stage(sink, GlowStage::GlowField);

        let upsampled = upsample(
            &coarse_glow,
            self.config.upsample_factor,
            self.config.interpolation,
        )?;
        let field = resample_onto(&upsampled, &labels.grid(), Interpolation::Linear)?;
        debug!(
            "upsampled to {:?}, mapped onto input grid {:?}",
            upsampled.dims, field.dims
        );
        report_stage(sink, GlowStage::Upsample);

        let mut values = field.values;
        if coords.is_empty() {
            values.fill(0.0);
            if self.config.mesa {
                pin_foreground(&mut values, &foreground);
            }
        } else if self.config.mesa {
            composite_mesa(&mut values, &foreground)?;
        } else {
            normalize_by_max(&mut values)?;
        }
        let output = labels.with_values(values);
        report_stage(sink, GlowStage::Normalize);
        report(sink, ProgressEvent::Finish);

        Ok(GlowStages {
            coarse,
            coarse_glow,
            upsampled,
            output,
        })
    }
}

/// Computes the normalized glow field for one labeled contour.
pub fn compute_glow_field(input: impl Into<GlowInput>, config: &GlowConfig) -> GlowResult<Volume> {
    GlowPipeline::new(config.clone())?.run(input)
}
