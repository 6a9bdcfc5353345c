use std::path::{Path, PathBuf};
use std::sync::Arc;

use glowmask_core::{
    read_volume, write_volume, GlowPipeline, ProgressEvent, ProgressSink, GVOL_EXTENSION,
};
use tracing::{debug, error, info};

#[derive(Debug, Default)]
pub(crate) struct BatchSummary {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.written.len() + self.failed.len()
    }
}

/// A single volume file, or every `.gvol` file in a directory in name order.
pub(crate) fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>, String> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(format!("input {} does not exist", input.display()));
    }
    let entries = std::fs::read_dir(input).map_err(|err| format!("{}: {err}", input.display()))?;
    let mut inputs = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| err.to_string())?.path();
        let is_volume = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(GVOL_EXTENSION));
        if path.is_file() && is_volume {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

pub(crate) fn output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("volume");
    output_dir.join(format!("{stem}_glow.{GVOL_EXTENSION}"))
}

pub(crate) fn stage_logger() -> ProgressSink {
    Arc::new(|event: ProgressEvent| {
        if let ProgressEvent::Stage { stage, fraction } = event {
            debug!("  {stage} done ({:.0}%)", fraction * 100.0);
        }
    })
}

/// Runs every input through `pipeline`. Failures are logged and collected;
/// the remaining inputs still run.
pub(crate) fn run_batch(
    pipeline: &GlowPipeline,
    inputs: &[PathBuf],
    output_dir: &Path,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    let total = inputs.len();
    for (idx, input) in inputs.iter().enumerate() {
        info!("[{}/{}] {}", idx + 1, total, input.display());
        match process_one(pipeline, input, output_dir) {
            Ok(path) => {
                info!("[{}/{}] wrote {}", idx + 1, total, path.display());
                summary.written.push(path);
            }
            Err(err) => {
                error!("[{}/{}] {}: {err}", idx + 1, total, input.display());
                summary.failed.push((input.clone(), err));
            }
        }
    }
    summary
}

fn process_one(pipeline: &GlowPipeline, input: &Path, output_dir: &Path) -> Result<PathBuf, String> {
    let labels = read_volume(input).map_err(|err| err.to_string())?;
    let glow = pipeline.run(labels).map_err(|err| err.to_string())?;
    let path = output_path(output_dir, input);
    write_volume(&path, &glow).map_err(|err| err.to_string())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use glowmask_core::{GlowConfig, Volume};

    use super::*;

    fn contour(dims: [u32; 3], filled: bool) -> Volume {
        let mut volume = Volume::zeros(dims, [1.0; 3], [0.0; 3]);
        if filled {
            // Even coordinates survive downsampling at factor 2.
            let [x, y, z] = dims.map(|d| (d / 2) & !1);
            let centre = volume.value_index(x, y, z);
            volume.values[centre] = 1.0;
        }
        volume
    }

    fn small_pipeline() -> GlowPipeline {
        GlowPipeline::new(GlowConfig {
            downsample_factor: 2,
            grid_extent: 8,
            ..GlowConfig::default()
        })
        .expect("pipeline")
    }

    #[test]
    fn collects_volume_files_in_name_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.gvol", "a.GVOL", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").expect("write");
        }
        std::fs::create_dir(dir.path().join("nested.gvol")).expect("mkdir");

        let inputs = collect_inputs(dir.path()).expect("collect");
        let names: Vec<_> = inputs
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.GVOL", "b.gvol"]);

        let single = dir.path().join("b.gvol");
        assert_eq!(collect_inputs(&single).expect("collect"), vec![single]);
        assert!(collect_inputs(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn output_names_follow_input_stem() {
        let path = output_path(Path::new("out"), Path::new("data/case_01.gvol"));
        assert_eq!(path, Path::new("out").join("case_01_glow.gvol"));
    }

    #[test]
    fn failing_items_do_not_stop_the_batch() {
        let input_dir = tempfile::tempdir().expect("tempdir");
        let output_dir = tempfile::tempdir().expect("tempdir");
        write_volume(input_dir.path().join("a.gvol"), &contour([16, 16, 16], true)).expect("write");
        write_volume(input_dir.path().join("b.gvol"), &contour([16, 16, 16], false))
            .expect("write");
        std::fs::write(input_dir.path().join("c.gvol"), b"not a volume").expect("write");
        write_volume(input_dir.path().join("d.gvol"), &contour([12, 10, 8], true)).expect("write");

        let inputs = collect_inputs(input_dir.path()).expect("collect");
        let summary = run_batch(&small_pipeline(), &inputs, output_dir.path());

        assert_eq!(summary.total(), 4);
        assert_eq!(summary.written.len(), 2);
        assert_eq!(summary.failed.len(), 2);
        assert!(summary.failed[0].1.contains("no foreground"));
        assert!(summary.failed[1].1.contains("GVOL"));

        let glow = read_volume(output_dir.path().join("d_glow.gvol")).expect("read output");
        assert_eq!(glow.dims, [12, 10, 8]);
        assert_eq!(glow.max_value(), 1.0);
    }
}
