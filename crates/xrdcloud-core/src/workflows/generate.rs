use crate::core::encoding::encoder::PointCloudEncoder;
use crate::core::io::intermediate::IntermediateTable;
use crate::engine::config::PipelineConfig;
use crate::engine::dispatcher::Dispatcher;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::report::RunReport;
use crate::engine::sink::ArtifactSink;
use tracing::{info, instrument};

/// Encodes every row of an intermediate table and persists the samples.
///
/// A row whose cells cannot be decoded is skipped as a parse failure.
#[instrument(skip_all, name = "generate_workflow", fields(rows = table.len()))]
pub fn run(
    table: &IntermediateTable,
    config: &PipelineConfig,
    sink: &mut ArtifactSink,
    reporter: &ProgressReporter,
) -> Result<RunReport, EngineError> {
    info!(
        points = config.encoder.point_budget,
        "Generating point clouds from pattern table."
    );
    reporter.report(Progress::PhaseStart {
        name: "Point-Cloud Generation",
    });

    let encoder = PointCloudEncoder::new(config.encoder);
    let dispatcher = Dispatcher::from_config(&config.dispatch, table.len());
    let persisted_before = sink.persisted();

    let mut report = dispatcher.process(
        table.rows(),
        |row| {
            let pattern = row.decode()?;
            Ok(encoder.encode_with(&row.id, &row.targets, &pattern)?)
        },
        reporter,
        |chunk| {
            for sample in &chunk.outputs {
                sink.persist(sample)?;
            }
            Ok(())
        },
    )?;
    report.settle_partial_chunk(sink.persisted() - persisted_before);

    info!(
        succeeded = report.succeeded,
        skipped = report.skipped.len(),
        "Point-cloud generation finished."
    );
    reporter.report(Progress::PhaseFinish);
    Ok(report)
}
