use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlowStage {
    Downsample,
    GlowField,
    Upsample,
    Normalize,
}

impl GlowStage {
    pub const ALL: [GlowStage; 4] = [
        GlowStage::Downsample,
        GlowStage::GlowField,
        GlowStage::Upsample,
        GlowStage::Normalize,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GlowStage::Downsample => "downsample",
            GlowStage::GlowField => "glow field",
            GlowStage::Upsample => "upsample",
            GlowStage::Normalize => "normalize",
        }
    }

    /// Fraction of the pipeline completed once this stage is done.
    pub fn fraction_done(self) -> f32 {
        let position = GlowStage::ALL
            .iter()
            .position(|stage| *stage == self)
            .unwrap_or(0);
        (position + 1) as f32 / GlowStage::ALL.len() as f32
    }
}

impl fmt::Display for GlowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    Start,
    Stage { stage: GlowStage, fraction: f32 },
    Finish,
}

pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

pub(crate) fn report(sink: Option<&ProgressSink>, event: ProgressEvent) {
    if let Some(sink) = sink {
        (sink)(event);
    }
}

pub(crate) fn report_stage(sink: Option<&ProgressSink>, stage: GlowStage) {
    report(
        sink,
        ProgressEvent::Stage {
            stage,
            fraction: stage.fraction_done(),
        },
    );
}
