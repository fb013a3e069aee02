use super::{GlobalOptions, conclude, reset_and_open};
use crate::cli::GenerateArgs;
use crate::config::{Overrides, build_config};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use tracing::info;
use xrdcloud::core::io::intermediate::IntermediateTable;
use xrdcloud::engine::progress::ProgressReporter;
use xrdcloud::workflows::generate;

pub fn run(args: GenerateArgs, global: &GlobalOptions) -> Result<()> {
    let config = build_config(&Overrides {
        intermediate: args.input,
        output_root: args.output.output,
        points: args.points,
        slices: args.slices,
        ..global.overrides()
    })?;

    info!("Loading pattern table from {:?}", &config.intermediate_path);
    let table = IntermediateTable::load(&config.intermediate_path)?;
    println!("Loaded {} patterns.", table.len());

    let mut sink = reset_and_open(&config.output_root, global.yes)?;
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let report = generate::run(&table, &config.pipeline, &mut sink, &reporter)?;

    println!(
        "Wrote {} point clouds to {}.",
        sink.persisted(),
        config.output_root.display()
    );
    conclude(report)
}
