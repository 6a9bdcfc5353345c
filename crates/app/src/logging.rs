use std::io;

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Installs the global subscriber. `level` applies to this workspace's
/// crates; everything else is held at WARN.
pub(crate) fn setup_tracing(level: LevelFilter) {
    let level = level_from_filter(level);
    let filter_layer = tracing_subscriber::filter::filter_fn(move |metadata| {
        let Some(level) = level else {
            return false;
        };
        let target = metadata.target();
        let is_glowmask = target.starts_with("glowmask");
        let effective_level = if is_glowmask { level } else { Level::WARN };
        metadata.level() <= &effective_level
    });
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter_layer))
        .init();
}

pub(crate) fn parse_level(value: &str) -> Result<LevelFilter, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "off" => Ok(LevelFilter::OFF),
        "error" => Ok(LevelFilter::ERROR),
        "warn" => Ok(LevelFilter::WARN),
        "info" => Ok(LevelFilter::INFO),
        "debug" => Ok(LevelFilter::DEBUG),
        "trace" => Ok(LevelFilter::TRACE),
        other => Err(format!("unknown log level '{other}'")),
    }
}

fn level_from_filter(level: LevelFilter) -> Option<Level> {
    match level {
        LevelFilter::OFF => None,
        LevelFilter::ERROR => Some(Level::ERROR),
        LevelFilter::WARN => Some(Level::WARN),
        LevelFilter::INFO => Some(Level::INFO),
        LevelFilter::DEBUG => Some(Level::DEBUG),
        LevelFilter::TRACE => Some(Level::TRACE),
    }
}
