mod config;
mod downsample;
mod error;
mod glow_field;
mod normalize;
mod parallel;
mod pipeline;
mod progress;
mod resample;
mod volume;
mod volume_io;

pub use config::{
    max_l1_distance, EmptyForegroundPolicy, GlowConfig, Interpolation,
    DEFAULT_DOWNSAMPLE_FACTOR, DEFAULT_GRID_EXTENT, DEFAULT_UPSAMPLE_FACTOR, MAX_GRID_EXTENT,
};
pub use downsample::{downsample_labels, foreground_mask, nonzero_coords};
pub use error::{GlowError, GlowResult};
pub use glow_field::{glow_volume, l1_distance, lattice_glow, WeightTable};
pub use normalize::{composite_mesa, normalize_by_max, pin_foreground};
pub use pipeline::{compute_glow_field, GlowInput, GlowPipeline, GlowStages};
pub use progress::{GlowStage, ProgressEvent, ProgressSink};
pub use resample::{resample_onto, upsample};
pub use volume::{Grid, Volume, IDENTITY_DIRECTION};
pub use volume_io::{
    decode_volume, encode_volume, read_volume, write_volume, GVOL_EXTENSION, GVOL_VERSION,
};
