use crate::config::{lattice_len, max_l1_distance};
use crate::error::{GlowError, GlowResult};
use crate::parallel::fill_indexed;
use crate::volume::{try_alloc_f32, Volume};

/// Inverse-square weights indexed by L1 distance: `1 / (d + 1)^2`.
#[derive(Debug, Clone)]
pub struct WeightTable {
    weights: Vec<f64>,
}

impl WeightTable {
    pub fn for_extent(extent: u32) -> GlowResult<Self> {
        let max_distance =
            max_l1_distance(extent).ok_or(GlowError::GridExtentOverflow { extent })?;
        let weights = (0..=max_distance)
            .map(|d| {
                let denom = d as f64 + 1.0;
                1.0 / (denom * denom)
            })
            .collect();
        Ok(Self { weights })
    }

    /// Weight at L1 `distance`, or `None` outside `0..=max_distance`.
    pub fn weight(&self, distance: i32) -> Option<f64> {
        let idx = usize::try_from(distance).ok()?;
        self.weights.get(idx).copied()
    }

    pub fn max_distance(&self) -> i32 {
        self.weights.len() as i32 - 1
    }
}

pub fn l1_distance(a: [i32; 3], b: [i32; 3]) -> i32 {
    (a[0] - b[0]).abs() + (a[1] - b[1]).abs() + (a[2] - b[2]).abs()
}

/// Glow value at every point of the `extent`^3 lattice.
///
/// The lattice is enumerated z outer, x inner, which is the storage order of
/// [`Volume`]. Each lattice value sums the weights of all `coords` in the
/// order given, so repeated runs produce identical bits.
pub fn lattice_glow(coords: &[[i32; 3]], extent: u32) -> GlowResult<Vec<f32>> {
    let table = WeightTable::for_extent(extent)?;
    let len = lattice_len(extent).ok_or(GlowError::GridExtentOverflow { extent })?;
    if let Some(outside) = coords
        .iter()
        .find(|c| c.iter().any(|&v| v < 0 || v >= extent as i32))
    {
        return Err(GlowError::invalid_input(format!(
            "coordinate {outside:?} lies outside the {extent}^3 lattice"
        )));
    }

    let mut field = try_alloc_f32(len, "Glow Field")?;
    let extent = extent as usize;
    fill_indexed(&mut field, |idx| {
        let query = [
            (idx % extent) as i32,
            ((idx / extent) % extent) as i32,
            (idx / (extent * extent)) as i32,
        ];
        let sum: f64 = coords
            .iter()
            .filter_map(|&coord| table.weight(l1_distance(coord, query)))
            .sum();
        sum as f32
    });
    Ok(field)
}

/// Glow field over the coarse grid, carrying the coarse grid's metadata.
pub fn glow_volume(coarse: &Volume, coords: &[[i32; 3]]) -> GlowResult<Volume> {
    let [nx, ny, nz] = coarse.dims;
    if nx != ny || ny != nz {
        return Err(GlowError::invalid_input(format!(
            "coarse grid {:?} is not a cube",
            coarse.dims
        )));
    }
    let values = lattice_glow(coords, nx)?;
    Ok(coarse.with_values(values))
}
