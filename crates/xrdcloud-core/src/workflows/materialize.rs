use crate::core::crystal::structure::CrystalStructure;
use crate::core::encoding::encoder::PointCloudEncoder;
use crate::core::io::catalog::Catalog;
use crate::core::io::intermediate::{IntermediateWriter, PatternRow};
use crate::core::xrd::simulator::DiffractionSimulator;
use crate::engine::config::PipelineConfig;
use crate::engine::dispatcher::Dispatcher;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::report::RunReport;
use crate::engine::sink::ArtifactSink;
use tracing::{info, instrument};

/// Simulates and encodes every catalog record and persists the samples chunk by chunk.
///
/// Per record: parse the structure, simulate its pattern, encode it, persist it. When an
/// intermediate writer is given, the pattern rows of encoded records are appended to it
/// before the chunk's samples are persisted.
#[instrument(skip_all, name = "materialize_workflow", fields(records = catalog.len()))]
pub fn run<S>(
    catalog: &Catalog,
    simulator: &S,
    config: &PipelineConfig,
    sink: &mut ArtifactSink,
    mut intermediate: Option<&mut IntermediateWriter>,
    reporter: &ProgressReporter,
) -> Result<RunReport, EngineError>
where
    S: DiffractionSimulator + ?Sized,
{
    info!(
        wavelength = %config.simulation.wavelength,
        points = config.encoder.point_budget,
        "Starting point-cloud materialization."
    );
    reporter.report(Progress::PhaseStart {
        name: "Materialization",
    });

    let encoder = PointCloudEncoder::new(config.encoder);
    let dispatcher = Dispatcher::from_config(&config.dispatch, catalog.len());
    let wavelength = config.simulation.wavelength;
    let keep_patterns = intermediate.is_some();
    let persisted_before = sink.persisted();

    let mut report = dispatcher.process(
        catalog.records(),
        |record| {
            let structure = CrystalStructure::from_cif(record.structure())?;
            let pattern = simulator.simulate(&structure, wavelength)?;
            let sample = encoder.encode(record, &pattern)?;
            let row = if keep_patterns {
                Some(PatternRow::from_pattern(
                    record.id().clone(),
                    &pattern,
                    record.targets().clone(),
                )?)
            } else {
                None
            };
            Ok((sample, row))
        },
        reporter,
        |chunk| {
            let (samples, rows): (Vec<_>, Vec<_>) = chunk.outputs.into_iter().unzip();
            if let Some(writer) = intermediate.as_deref_mut() {
                let rows: Vec<PatternRow> = rows.into_iter().flatten().collect();
                writer.append(&rows)?;
            }
            for sample in &samples {
                sink.persist(sample)?;
            }
            Ok(())
        },
    )?;
    report.settle_partial_chunk(sink.persisted() - persisted_before);

    info!(
        succeeded = report.succeeded,
        skipped = report.skipped.len(),
        aborted = report.abort.is_some(),
        "Materialization finished."
    );
    reporter.report(Progress::PhaseFinish);
    Ok(report)
}
