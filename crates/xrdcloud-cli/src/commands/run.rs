use super::{GlobalOptions, conclude, reset_and_open};
use crate::cli::RunArgs;
use crate::config::{Overrides, build_config};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use tracing::info;
use xrdcloud::core::io::catalog::Catalog;
use xrdcloud::core::io::intermediate::IntermediateWriter;
use xrdcloud::engine::progress::ProgressReporter;
use xrdcloud::workflows::{self, materialize};

pub fn run(args: RunArgs, global: &GlobalOptions) -> Result<()> {
    let config = build_config(&Overrides {
        catalog: args.input,
        output_root: args.output.output,
        intermediate: args.intermediate.clone(),
        wavelength: args.wavelength,
        points: args.points,
        slices: args.slices,
        ..global.overrides()
    })?;

    info!("Loading catalog from {:?}", &config.catalog_path);
    let catalog = Catalog::load(&config.catalog_path, &config.pipeline.catalog)?;
    println!(
        "Loaded {} materials with targets [{}].",
        catalog.len(),
        catalog.target_names().join(", ")
    );

    let mut sink = reset_and_open(&config.output_root, global.yes)?;
    let mut intermediate = match args.intermediate {
        Some(_) => Some(IntermediateWriter::create(
            &config.intermediate_path,
            catalog.target_names().clone(),
        )?),
        None => None,
    };

    let simulator = workflows::default_simulator(&config.pipeline.simulation);
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let report = materialize::run(
        &catalog,
        &*simulator,
        &config.pipeline,
        &mut sink,
        intermediate.as_mut(),
        &reporter,
    )?;

    println!(
        "Wrote {} point clouds to {}.",
        sink.persisted(),
        config.output_root.display()
    );
    if let Some(writer) = &intermediate {
        println!(
            "Kept {} patterns in {}.",
            writer.rows_written(),
            writer.path().display()
        );
    }
    conclude(report)
}
