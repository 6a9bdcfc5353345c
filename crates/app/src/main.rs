use std::process;

use glowmask_core::GlowPipeline;

mod batch;
mod cli;
mod logging;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let parsed = match cli::parse_args(&args) {
        Ok(cli::Command::Help) => {
            cli::print_help();
            return;
        }
        Ok(cli::Command::Run(parsed)) => parsed,
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!("run with --help for usage");
            process::exit(2);
        }
    };

    logging::setup_tracing(parsed.log_level);
    tracing::info!("glowmask starting");

    if let Err(err) = run(&parsed) {
        tracing::error!("{err}");
        process::exit(1);
    }
}

fn run(args: &cli::BatchArgs) -> Result<(), String> {
    let mut config = cli::load_config(args.config_path.as_deref())?;
    args.overrides.apply(&mut config);

    let pipeline = GlowPipeline::new(config)
        .map_err(|err| err.to_string())?
        .with_progress(batch::stage_logger());
    tracing::debug!("config: {:?}", pipeline.config());
    let inputs = batch::collect_inputs(&args.input)?;
    if inputs.is_empty() {
        return Err(format!("no volumes found in {}", args.input.display()));
    }
    std::fs::create_dir_all(&args.output)
        .map_err(|err| format!("{}: {err}", args.output.display()))?;

    let summary = batch::run_batch(&pipeline, &inputs, &args.output);
    tracing::info!(
        "done: {} written, {} failed",
        summary.written.len(),
        summary.failed.len()
    );
    if summary.failed.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "{} of {} volumes failed",
            summary.failed.len(),
            summary.total()
        ))
    }
}
