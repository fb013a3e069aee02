use crate::core::crystal::structure::CrystalStructure;
use crate::core::io::catalog::Catalog;
use crate::core::io::intermediate::{IntermediateWriter, PatternRow};
use crate::core::xrd::simulator::DiffractionSimulator;
use crate::engine::config::PipelineConfig;
use crate::engine::dispatcher::Dispatcher;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::report::RunReport;
use tracing::{info, instrument};

/// Simulates every catalog record and appends the patterns to the intermediate table,
/// one macro-chunk at a time.
#[instrument(skip_all, name = "compute_workflow", fields(records = catalog.len()))]
pub fn run<S>(
    catalog: &Catalog,
    simulator: &S,
    config: &PipelineConfig,
    writer: &mut IntermediateWriter,
    reporter: &ProgressReporter,
) -> Result<RunReport, EngineError>
where
    S: DiffractionSimulator + ?Sized,
{
    info!(
        wavelength = %config.simulation.wavelength,
        output = %writer.path().display(),
        "Computing diffraction patterns."
    );
    reporter.report(Progress::PhaseStart {
        name: "Pattern Computation",
    });

    let dispatcher = Dispatcher::from_config(&config.dispatch, catalog.len());
    let wavelength = config.simulation.wavelength;

    let report = dispatcher.process(
        catalog.records(),
        |record| {
            let structure = CrystalStructure::from_cif(record.structure())?;
            let pattern = simulator.simulate(&structure, wavelength)?;
            Ok(PatternRow::from_pattern(
                record.id().clone(),
                &pattern,
                record.targets().clone(),
            )?)
        },
        reporter,
        |chunk| {
            writer.append(&chunk.outputs)?;
            Ok(())
        },
    )?;

    info!(
        rows = writer.rows_written(),
        skipped = report.skipped.len(),
        "Pattern computation finished."
    );
    reporter.report(Progress::PhaseFinish);
    Ok(report)
}
