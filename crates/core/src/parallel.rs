#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

/// Below this many output voxels the work stays on the calling thread.
#[cfg(not(target_arch = "wasm32"))]
const PARALLEL_THRESHOLD: usize = 4096;

/// Fills every output voxel from its linear index.
///
/// Each voxel is written by exactly one call of `f`, so the result does not
/// depend on how the work is split across threads.
pub fn fill_indexed<T, F>(out: &mut [T], f: F)
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    #[cfg(not(target_arch = "wasm32"))]
    {
        if out.len() >= PARALLEL_THRESHOLD {
            out.par_iter_mut()
                .enumerate()
                .for_each(|(idx, value)| *value = f(idx));
            return;
        }
    }

    for (idx, value) in out.iter_mut().enumerate() {
        *value = f(idx);
    }
}
