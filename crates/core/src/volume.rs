use glam::{DMat3, DVec3};

use crate::error::{GlowError, GlowResult};

pub const IDENTITY_DIRECTION: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Voxel grid placement without values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub dims: [u32; 3],
    pub spacing: [f64; 3],
    pub origin: [f64; 3],
    pub direction: [f64; 9],
}

/// A 3D scalar image with the spatial metadata needed to place it in
/// physical space.
///
/// Values are stored x-fastest: `(z * ny + y) * nx + x`. `direction` is a
/// row-major 3x3 matrix whose columns are the index axes in physical space.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub dims: [u32; 3],
    pub spacing: [f64; 3],
    pub origin: [f64; 3],
    pub direction: [f64; 9],
    pub values: Vec<f32>,
}

impl Volume {
    pub fn new(dims: [u32; 3], spacing: [f64; 3], origin: [f64; 3], values: Vec<f32>) -> Self {
        Self {
            dims,
            spacing,
            origin,
            direction: IDENTITY_DIRECTION,
            values,
        }
    }

    /// Panics like `vec!` when `dims` describe more voxels than fit in memory.
    pub fn zeros(dims: [u32; 3], spacing: [f64; 3], origin: [f64; 3]) -> Self {
        let len = voxel_count(dims).unwrap_or(usize::MAX);
        Self::new(dims, spacing, origin, vec![0.0; len])
    }

    pub fn from_grid(grid: Grid, values: Vec<f32>) -> Self {
        Self {
            dims: grid.dims,
            spacing: grid.spacing,
            origin: grid.origin,
            direction: grid.direction,
            values,
        }
    }

    pub fn grid(&self) -> Grid {
        Grid {
            dims: self.dims,
            spacing: self.spacing,
            origin: self.origin,
            direction: self.direction,
        }
    }

    pub fn with_direction(mut self, direction: [f64; 9]) -> Self {
        self.direction = direction;
        self
    }

    /// A new volume on the same grid as `self`, carrying `values`.
    pub fn with_values(&self, values: Vec<f32>) -> Self {
        Self::from_grid(self.grid(), values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value_index(&self, x: u32, y: u32, z: u32) -> usize {
        let nx = self.dims[0].max(1) as usize;
        let ny = self.dims[1].max(1) as usize;
        (z as usize * ny + y as usize) * nx + x as usize
    }

    pub fn index_coords(&self, index: usize) -> [u32; 3] {
        let nx = self.dims[0].max(1) as usize;
        let ny = self.dims[1].max(1) as usize;
        let x = index % nx;
        let y = (index / nx) % ny;
        let z = index / (nx * ny);
        [x as u32, y as u32, z as u32]
    }

    pub fn get(&self, x: u32, y: u32, z: u32) -> f32 {
        self.values[self.value_index(x, y, z)]
    }

    pub fn direction_matrix(&self) -> DMat3 {
        direction_matrix(&self.direction)
    }

    /// Physical position of a (possibly fractional) voxel index.
    pub fn index_to_physical(&self, index: DVec3) -> DVec3 {
        let scaled = index * DVec3::from(self.spacing);
        DVec3::from(self.origin) + self.direction_matrix() * scaled
    }

    pub fn same_geometry(&self, other: &Volume, tolerance: f64) -> bool {
        self.dims == other.dims
            && close_all(&self.spacing, &other.spacing, tolerance)
            && close_all(&self.origin, &other.origin, tolerance)
            && close_all(&self.direction, &other.direction, tolerance)
    }

    pub fn max_value(&self) -> f32 {
        self.values
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Checks that the value buffer matches the dims and that the metadata is
    /// finite.
    pub fn validate(&self) -> GlowResult<()> {
        let expected = voxel_count(self.dims).ok_or_else(|| {
            GlowError::invalid_input(format!(
                "volume dims {:?} overflow the addressable voxel count",
                self.dims
            ))
        })?;
        if self.values.len() != expected {
            return Err(GlowError::invalid_input(format!(
                "volume has {} values but dims {:?} need {}",
                self.values.len(),
                self.dims,
                expected
            )));
        }
        let metadata_finite = self
            .spacing
            .iter()
            .chain(self.origin.iter())
            .chain(self.direction.iter())
            .all(|value| value.is_finite());
        if !metadata_finite {
            return Err(GlowError::invalid_input(
                "volume metadata contains non-finite values",
            ));
        }
        if let Some(idx) = self.values.iter().position(|value| !value.is_finite()) {
            return Err(GlowError::invalid_input(format!(
                "volume value at index {idx} is not finite"
            )));
        }
        Ok(())
    }
}

/// Number of voxels in a grid, or `None` if it does not fit in `usize`.
pub fn voxel_count(dims: [u32; 3]) -> Option<usize> {
    (dims[0] as usize)
        .checked_mul(dims[1] as usize)?
        .checked_mul(dims[2] as usize)
}

pub fn direction_matrix(direction: &[f64; 9]) -> DMat3 {
    // Stored row-major, glam is column-major.
    DMat3::from_cols_array(direction).transpose()
}

pub fn try_alloc_f32(len: usize, label: &str) -> GlowResult<Vec<f32>> {
    let mut values = Vec::new();
    values.try_reserve_exact(len).map_err(|_| {
        GlowError::resampling(format!("{label}: cannot allocate {len} voxels"))
    })?;
    values.resize(len, 0.0);
    Ok(values)
}

fn close_all(a: &[f64], b: &[f64], tolerance: f64) -> bool {
    a.iter().zip(b).all(|(a, b)| (a - b).abs() <= tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trips_through_coords() {
        let volume = Volume::zeros([4, 3, 2], [1.0; 3], [0.0; 3]);
        assert_eq!(volume.value_index(1, 2, 1), 4 * 3 + 2 * 4 + 1);
        for idx in 0..volume.len() {
            let [x, y, z] = volume.index_coords(idx);
            assert_eq!(volume.value_index(x, y, z), idx);
        }
    }

    #[test]
    fn physical_position_uses_spacing_and_direction() {
        // Swap the x and y axes.
        let direction = [0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let volume =
            Volume::zeros([2, 2, 2], [2.0, 3.0, 4.0], [10.0, 20.0, 30.0]).with_direction(direction);
        let pos = volume.index_to_physical(DVec3::new(1.0, 0.0, 1.0));
        assert!((pos.x - 10.0).abs() < 1.0e-12);
        assert!((pos.y - 22.0).abs() < 1.0e-12);
        assert!((pos.z - 34.0).abs() < 1.0e-12);
    }

    #[test]
    fn validate_rejects_mismatched_buffer() {
        let volume = Volume::new([2, 2, 2], [1.0; 3], [0.0; 3], vec![0.0; 7]);
        let err = volume.validate().unwrap_err();
        assert!(matches!(err, GlowError::InvalidInput(_)));
    }

    #[test]
    fn validate_rejects_overflowing_dims() {
        let volume = Volume::new([1 << 22, 1 << 21, 1 << 21], [1.0; 3], [0.0; 3], Vec::new());
        assert!(matches!(volume.validate(), Err(GlowError::InvalidInput(_))));
        assert_eq!(voxel_count([1 << 22, 1 << 21, 1 << 21]), None);
        assert_eq!(voxel_count([4, 3, 2]), Some(24));
    }

    #[test]
    fn validate_rejects_non_finite_spacing() {
        let volume = Volume::zeros([1, 1, 1], [f64::NAN, 1.0, 1.0], [0.0; 3]);
        assert!(volume.validate().is_err());
    }

    #[test]
    fn same_geometry_ignores_values() {
        let a = Volume::zeros([2, 2, 2], [1.0; 3], [0.5; 3]);
        let b = a.with_values(vec![1.0; 8]);
        assert!(a.same_geometry(&b, 1.0e-9));
        let c = Volume::zeros([2, 2, 2], [1.0; 3], [0.6; 3]);
        assert!(!a.same_geometry(&c, 1.0e-9));
    }
}
