use glam::DVec3;

use crate::error::{GlowError, GlowResult};
use crate::parallel::fill_indexed;
use crate::volume::{try_alloc_f32, voxel_count, Volume};

/// Nearest-neighbour downsampling of a labeled volume onto a coarse cube of
/// `extent` voxels per axis.
///
/// Coarse voxel `c` is centred on the block of input voxels
/// `[c * factor, (c + 1) * factor)` and takes the label of the voxel at
/// `c * factor + (factor - 1) / 2`. Coarse voxels past the input edge are
/// background.
pub fn downsample_labels(volume: &Volume, factor: u32, extent: u32) -> GlowResult<Volume> {
    check_resample_source(volume)?;
    if factor == 0 || extent == 0 {
        return Err(GlowError::resampling(format!(
            "downsample factor {factor} and extent {extent} must be positive"
        )));
    }
    for (axis, &len) in volume.dims.iter().enumerate() {
        let needed = len.div_ceil(factor);
        if needed > extent {
            return Err(GlowError::resampling(format!(
                "axis {axis} spans {len} voxels, which needs {needed} coarse voxels at factor {factor} but the grid holds {extent}"
            )));
        }
    }

    let half = (factor - 1) / 2;
    let dims = [extent; 3];
    let spacing = volume.spacing.map(|s| s * factor as f64);
    let centre_offset = (factor as f64 - 1.0) * 0.5;
    let origin = volume.index_to_physical(DVec3::splat(centre_offset));

    let len = voxel_count(dims).ok_or(GlowError::GridExtentOverflow { extent })?;
    let mut values = try_alloc_f32(len, "Downsample")?;
    let extent_us = extent as usize;
    fill_indexed(&mut values, |idx| {
        let x = idx % extent_us;
        let y = (idx / extent_us) % extent_us;
        let z = idx / (extent_us * extent_us);
        let src = [x, y, z].map(|c| c as u64 * factor as u64 + half as u64);
        if src
            .iter()
            .zip(volume.dims.iter())
            .any(|(&s, &len)| s >= len as u64)
        {
            return 0.0;
        }
        volume.get(src[0] as u32, src[1] as u32, src[2] as u32)
    });

    Ok(Volume {
        dims,
        spacing,
        origin: origin.to_array(),
        direction: volume.direction,
        values,
    })
}

/// Positions of the non-zero voxels of `coarse`, in storage order.
pub fn nonzero_coords(coarse: &Volume) -> Vec<[i32; 3]> {
    coarse
        .values
        .iter()
        .enumerate()
        .filter(|(_, value)| **value != 0.0)
        .map(|(idx, _)| coarse.index_coords(idx).map(|c| c as i32))
        .collect()
}

/// Per-voxel foreground flags of a labeled volume.
///
/// With `strict_binary` every value must be exactly 0 or 1; otherwise any
/// non-zero value counts as foreground.
pub fn foreground_mask(labels: &Volume, strict_binary: bool) -> GlowResult<Vec<bool>> {
    labels
        .values
        .iter()
        .enumerate()
        .map(|(idx, &value)| {
            if strict_binary && value != 0.0 && value != 1.0 {
                let [x, y, z] = labels.index_coords(idx);
                return Err(GlowError::invalid_input(format!(
                    "label {value} at voxel ({x}, {y}, {z}) is not binary"
                )));
            }
            Ok(value != 0.0)
        })
        .collect()
}

pub(crate) fn check_resample_source(volume: &Volume) -> GlowResult<()> {
    if volume.dims.contains(&0) {
        return Err(GlowError::resampling(format!(
            "zero-sized volume {:?}",
            volume.dims
        )));
    }
    if volume
        .spacing
        .iter()
        .any(|s| !s.is_finite() || *s <= 0.0)
    {
        return Err(GlowError::resampling(format!(
            "malformed spacing {:?}",
            volume.spacing
        )));
    }
    if voxel_count(volume.dims) != Some(volume.values.len()) {
        return Err(GlowError::resampling(format!(
            "volume has {} values for dims {:?}",
            volume.values.len(),
            volume.dims
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_voxel(dims: [u32; 3], at: [u32; 3]) -> Volume {
        let mut volume = Volume::zeros(dims, [1.0; 3], [0.0; 3]);
        let idx = volume.value_index(at[0], at[1], at[2]);
        volume.values[idx] = 1.0;
        volume
    }

    #[test]
    fn coarse_grid_has_fixed_extent_and_scaled_spacing() {
        let volume = Volume::zeros([16, 12, 8], [0.5, 1.0, 2.0], [1.0, 2.0, 3.0]);
        let coarse = downsample_labels(&volume, 4, 8).expect("downsample");
        assert_eq!(coarse.dims, [8, 8, 8]);
        assert_eq!(coarse.spacing, [2.0, 4.0, 8.0]);
        // Centred on the first 4-voxel block.
        assert!((coarse.origin[0] - 1.75).abs() < 1.0e-12);
        assert!((coarse.origin[1] - 3.5).abs() < 1.0e-12);
        assert!((coarse.origin[2] - 6.0).abs() < 1.0e-12);
        assert_eq!(coarse.direction, volume.direction);
    }

    #[test]
    fn sampled_voxel_lands_in_its_block() {
        let volume = single_voxel([64, 64, 64], [32, 32, 32]);
        let coarse = downsample_labels(&volume, 2, 32).expect("downsample");
        assert_eq!(nonzero_coords(&coarse), vec![[16, 16, 16]]);
    }

    #[test]
    fn unsampled_voxel_is_dropped() {
        // Factor 2 samples even indices only.
        let volume = single_voxel([8, 8, 8], [3, 2, 2]);
        let coarse = downsample_labels(&volume, 2, 4).expect("downsample");
        assert!(nonzero_coords(&coarse).is_empty());
    }

    #[test]
    fn small_input_is_padded_with_background() {
        let mut volume = Volume::zeros([4, 4, 4], [1.0; 3], [0.0; 3]);
        volume.values.fill(1.0);
        let coarse = downsample_labels(&volume, 2, 8).expect("downsample");
        let coords = nonzero_coords(&coarse);
        assert_eq!(coords.len(), 8);
        assert!(coords.iter().all(|c| c.iter().all(|&v| v < 2)));
    }

    #[test]
    fn rejects_input_larger_than_grid() {
        let volume = Volume::zeros([65, 8, 8], [1.0; 3], [0.0; 3]);
        let err = downsample_labels(&volume, 2, 32).unwrap_err();
        assert!(matches!(err, GlowError::Resampling(_)));
    }

    #[test]
    fn rejects_zero_sized_and_bad_spacing() {
        let empty = Volume::zeros([0, 4, 4], [1.0; 3], [0.0; 3]);
        assert!(matches!(
            downsample_labels(&empty, 2, 4),
            Err(GlowError::Resampling(_))
        ));
        let bad_spacing = Volume::zeros([4, 4, 4], [1.0, 0.0, 1.0], [0.0; 3]);
        assert!(matches!(
            downsample_labels(&bad_spacing, 2, 4),
            Err(GlowError::Resampling(_))
        ));
    }

    #[test]
    fn coordinates_follow_storage_order() {
        let mut volume = Volume::zeros([3, 3, 3], [1.0; 3], [0.0; 3]);
        for [x, y, z] in [[2, 0, 0], [0, 1, 0], [0, 0, 2]] {
            let idx = volume.value_index(x, y, z);
            volume.values[idx] = 1.0;
        }
        assert_eq!(
            nonzero_coords(&volume),
            vec![[2, 0, 0], [0, 1, 0], [0, 0, 2]]
        );
    }

    #[test]
    fn strict_mask_rejects_other_labels() {
        let mut volume = Volume::zeros([2, 2, 2], [1.0; 3], [0.0; 3]);
        volume.values[3] = 2.0;
        assert!(matches!(
            foreground_mask(&volume, true),
            Err(GlowError::InvalidInput(_))
        ));
        let mask = foreground_mask(&volume, false).expect("mask");
        assert_eq!(mask.iter().filter(|flag| **flag).count(), 1);
        assert!(mask[3]);
    }
}
