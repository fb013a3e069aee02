use super::{GlobalOptions, conclude};
use crate::cli::ComputeArgs;
use crate::config::{Overrides, build_config};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use tracing::info;
use xrdcloud::core::io::catalog::Catalog;
use xrdcloud::core::io::intermediate::IntermediateWriter;
use xrdcloud::engine::progress::ProgressReporter;
use xrdcloud::workflows::{self, compute};

pub fn run(args: ComputeArgs, global: &GlobalOptions) -> Result<()> {
    let config = build_config(&Overrides {
        catalog: args.input,
        intermediate: args.output,
        wavelength: args.wavelength,
        slices: args.slices,
        ..global.overrides()
    })?;

    info!("Loading catalog from {:?}", &config.catalog_path);
    let catalog = Catalog::load(&config.catalog_path, &config.pipeline.catalog)?;
    let mut writer =
        IntermediateWriter::create(&config.intermediate_path, catalog.target_names().clone())?;

    let simulator = workflows::default_simulator(&config.pipeline.simulation);
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let report = compute::run(&catalog, &*simulator, &config.pipeline, &mut writer, &reporter)?;

    println!(
        "Wrote {} patterns to {}.",
        writer.rows_written(),
        writer.path().display()
    );
    conclude(report)
}
