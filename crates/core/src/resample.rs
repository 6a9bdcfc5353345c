use glam::{DMat3, DVec3};

use crate::config::Interpolation;
use crate::downsample::check_resample_source;
use crate::error::{GlowError, GlowResult};
use crate::parallel::fill_indexed;
use crate::volume::{direction_matrix, try_alloc_f32, Grid, Volume};

/// Gaussian kernel width in source voxels.
const GAUSSIAN_SIGMA: f64 = 0.8;
/// Taps further than this many sigmas from the sample are dropped.
const GAUSSIAN_CUTOFF_SIGMAS: f64 = 4.0;
const DIRECTION_TOLERANCE: f64 = 1.0e-6;

/// Resamples `volume` onto a grid `factor` times finer along every axis,
/// covering the same physical extent.
pub fn upsample(volume: &Volume, factor: u32, interpolation: Interpolation) -> GlowResult<Volume> {
    check_resample_source(volume)?;
    if factor == 0 {
        return Err(GlowError::resampling("upsample factor must be positive"));
    }
    let mut dims = [0u32; 3];
    for (out, &len) in dims.iter_mut().zip(volume.dims.iter()) {
        *out = len.checked_mul(factor).ok_or_else(|| {
            GlowError::resampling(format!("upsampled extent {len} x {factor} overflows"))
        })?;
    }
    let scale = 1.0 / factor as f64;
    // First fine voxel centre sits half a fine voxel inside the coarse edge.
    let shift = DVec3::splat((scale - 1.0) * 0.5);
    let target = Grid {
        dims,
        spacing: volume.spacing.map(|s| s * scale),
        origin: volume.index_to_physical(shift).to_array(),
        direction: volume.direction,
    };
    resample_onto(volume, &target, interpolation)
}

/// Samples `volume` at every voxel centre of `target`.
///
/// Both grids must share a direction matrix, which makes the mapping between
/// them separable per axis. Positions outside the source are clamped to its
/// edge.
pub fn resample_onto(
    volume: &Volume,
    target: &Grid,
    interpolation: Interpolation,
) -> GlowResult<Volume> {
    check_resample_source(volume)?;
    if target.dims.contains(&0) {
        return Err(GlowError::resampling(format!(
            "zero-sized target grid {:?}",
            target.dims
        )));
    }
    if target.spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
        return Err(GlowError::resampling(format!(
            "malformed target spacing {:?}",
            target.spacing
        )));
    }
    if volume
        .direction
        .iter()
        .zip(target.direction.iter())
        .any(|(a, b)| (a - b).abs() > DIRECTION_TOLERANCE)
    {
        return Err(GlowError::resampling(
            "source and target grids have different directions",
        ));
    }

    let to_index = inverse_direction(&volume.direction)?;
    let delta = DVec3::from(target.origin) - DVec3::from(volume.origin);
    let offset = (to_index * delta).to_array();

    let mut values = volume.values.clone();
    let mut dims = volume.dims.map(|d| d as usize);
    for axis in 0..3 {
        let start = offset[axis] / volume.spacing[axis];
        let step = target.spacing[axis] / volume.spacing[axis];
        let taps = axis_taps(
            dims[axis],
            target.dims[axis] as usize,
            start,
            step,
            interpolation,
        );
        let (next, next_dims) = resample_axis(&values, dims, axis, &taps)?;
        values = next;
        dims = next_dims;
    }

    Ok(Volume::from_grid(*target, values))
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Tap {
    index: usize,
    weight: f64,
}

/// Source taps for every output position along one axis. Output position `m`
/// samples the continuous source index `start + m * step`.
fn axis_taps(
    src_len: usize,
    out_len: usize,
    start: f64,
    step: f64,
    interpolation: Interpolation,
) -> Vec<Vec<Tap>> {
    let last = (src_len - 1) as f64;
    (0..out_len)
        .map(|m| {
            let t = (start + m as f64 * step).clamp(0.0, last);
            match interpolation {
                Interpolation::Nearest => vec![Tap {
                    index: ((t + 0.5).floor() as usize).min(src_len - 1),
                    weight: 1.0,
                }],
                Interpolation::Linear => linear_taps(t, src_len),
                Interpolation::Gaussian => gaussian_taps(t, src_len),
            }
        })
        .collect()
}

fn linear_taps(t: f64, src_len: usize) -> Vec<Tap> {
    let i0 = t.floor() as usize;
    let frac = t - i0 as f64;
    let i1 = (i0 + 1).min(src_len - 1);
    if i0 == i1 || frac == 0.0 {
        return vec![Tap {
            index: i0,
            weight: 1.0,
        }];
    }
    vec![
        Tap {
            index: i0,
            weight: 1.0 - frac,
        },
        Tap {
            index: i1,
            weight: frac,
        },
    ]
}

fn gaussian_taps(t: f64, src_len: usize) -> Vec<Tap> {
    let cutoff = GAUSSIAN_SIGMA * GAUSSIAN_CUTOFF_SIGMAS;
    let lo = (t - cutoff).ceil().max(0.0) as usize;
    let hi = ((t + cutoff).floor() as usize).min(src_len - 1);
    let inv_two_sigma_sq = 1.0 / (2.0 * GAUSSIAN_SIGMA * GAUSSIAN_SIGMA);
    let mut taps: Vec<Tap> = (lo..=hi)
        .map(|index| {
            let d = index as f64 - t;
            Tap {
                index,
                weight: (-d * d * inv_two_sigma_sq).exp(),
            }
        })
        .collect();
    let total: f64 = taps.iter().map(|tap| tap.weight).sum();
    for tap in &mut taps {
        tap.weight /= total;
    }
    taps
}

fn resample_axis(
    src: &[f32],
    dims: [usize; 3],
    axis: usize,
    taps: &[Vec<Tap>],
) -> GlowResult<(Vec<f32>, [usize; 3])> {
    let mut out_dims = dims;
    out_dims[axis] = taps.len();
    let len = out_dims[0]
        .checked_mul(out_dims[1])
        .and_then(|len| len.checked_mul(out_dims[2]))
        .ok_or_else(|| GlowError::resampling(format!("resampled dims {out_dims:?} overflow")))?;
    let mut out = try_alloc_f32(len, "Resample")?;
    let [nx, ny, _] = dims;
    let [ox, oy, _] = out_dims;
    fill_indexed(&mut out, |idx| {
        let mut coord = [idx % ox, (idx / ox) % oy, idx / (ox * oy)];
        let lane = &taps[coord[axis]];
        let mut sum = 0.0f64;
        for tap in lane {
            coord[axis] = tap.index;
            let src_idx = (coord[2] * ny + coord[1]) * nx + coord[0];
            sum += src[src_idx] as f64 * tap.weight;
        }
        sum as f32
    });
    Ok((out, out_dims))
}

fn inverse_direction(direction: &[f64; 9]) -> GlowResult<DMat3> {
    let matrix = direction_matrix(direction);
    let det = matrix.determinant();
    if !det.is_finite() || det.abs() < 1.0e-12 {
        return Err(GlowError::resampling("direction matrix is singular"));
    }
    let inv = matrix.inverse();
    if inv.x_axis.is_finite() && inv.y_axis.is_finite() && inv.z_axis.is_finite() {
        Ok(inv)
    } else {
        Err(GlowError::resampling("direction matrix is not invertible"))
    }
}
