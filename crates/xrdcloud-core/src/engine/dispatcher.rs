use super::cancel::CancellationToken;
use super::config::DispatchConfig;
use super::error::{EngineError, RecordError};
use super::progress::{Progress, ProgressReporter};
use super::report::{RunAbort, RunReport, SkippedRecord};
use super::utils::partition::split_balanced;
use crate::core::io::intermediate::PatternRow;
use crate::core::models::ids::MaterialId;
use crate::core::models::record::MaterialRecord;
use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Anything the dispatcher can attribute an outcome to.
pub trait Keyed {
    fn key(&self) -> &MaterialId;
}

impl Keyed for MaterialRecord {
    fn key(&self) -> &MaterialId {
        self.id()
    }
}

impl Keyed for PatternRow {
    fn key(&self) -> &MaterialId {
        &self.id
    }
}

/// Successful outputs of one macro-chunk, in submission order.
#[derive(Debug)]
pub struct MacroChunk<U> {
    /// 0-based position of the chunk.
    pub index: usize,
    pub total: usize,
    pub outputs: Vec<U>,
}

type Outcome<U> = Result<U, RecordError>;

/// Two-level fan-out of a record set over a worker pool.
///
/// Records are cut into `slice_count` macro-chunks that run one after another, which
/// bounds the results held in memory to one macro-chunk. Each macro-chunk is cut into
/// `worker_count` micro-chunks that run in parallel. Results are reassembled by
/// micro-chunk index, so outputs keep input order regardless of completion order.
#[derive(Debug)]
pub struct Dispatcher {
    worker_count: usize,
    slice_count: usize,
    cancel: CancellationToken,
}

impl Dispatcher {
    /// Counts below one are raised to one.
    pub fn new(worker_count: usize, slice_count: usize) -> Self {
        if worker_count == 0 || slice_count == 0 {
            warn!(worker_count, slice_count, "Clamping dispatcher counts to at least 1.");
        }
        Self {
            worker_count: worker_count.max(1),
            slice_count: slice_count.max(1),
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &DispatchConfig, records: usize) -> Self {
        Self::new(
            config.worker_count,
            config.slice_count.resolve(records, config.worker_count),
        )
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn slice_count(&self) -> usize {
        self.slice_count
    }

    /// Handle for stopping the run from outside; workers skip records once it is set.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs `task` over every item and hands each finished macro-chunk to `flush`.
    ///
    /// Record failures become [`SkippedRecord`]s. A fatal record error cancels the
    /// remaining records of the chunk, the chunk is not flushed and the report carries
    /// the abort. A `flush` error also aborts the run. Chunks flushed earlier stay
    /// flushed; what a failed `flush` wrote before stopping is for the caller to settle
    /// with [`RunReport::settle_partial_chunk`]. `Err` is returned only when the run
    /// could not start at all.
    #[instrument(skip_all, name = "dispatch", fields(records = items.len(), workers = self.worker_count, slices = self.slice_count))]
    pub fn process<T, U, F, S>(
        &self,
        items: &[T],
        task: F,
        reporter: &ProgressReporter,
        mut flush: S,
    ) -> Result<RunReport, EngineError>
    where
        T: Keyed + Sync,
        U: Send,
        F: Fn(&T) -> Result<U, RecordError> + Sync,
        S: FnMut(MacroChunk<U>) -> Result<(), EngineError>,
    {
        #[cfg(feature = "parallel")]
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_count)
            .thread_name(|i| format!("xrdcloud-worker-{i}"))
            .build()
            .map_err(|e| EngineError::ThreadPool(e.to_string()))?;

        let macro_chunks = split_balanced(items.len(), self.slice_count);
        let total = macro_chunks.len();
        let mut report = RunReport {
            chunks_total: total,
            ..RunReport::default()
        };

        reporter.report(Progress::TaskStart {
            total: items.len() as u64,
        });

        for (index, range) in macro_chunks.into_iter().enumerate() {
            let chunk = &items[range];
            let micro_chunks = split_balanced(chunk.len(), self.worker_count);
            debug!(
                chunk = index + 1,
                records = chunk.len(),
                micro_chunks = micro_chunks.len(),
                "Dispatching macro-chunk."
            );

            let run_micro =
                |micro: &Range<usize>| -> Vec<Outcome<U>> {
                    chunk[micro.clone()]
                        .iter()
                        .map(|item| self.run_one(item, &task, reporter))
                        .collect()
                };

            #[cfg(feature = "parallel")]
            let results: Vec<Vec<Outcome<U>>> =
                pool.install(|| micro_chunks.par_iter().map(run_micro).collect());

            #[cfg(not(feature = "parallel"))]
            let results: Vec<Vec<Outcome<U>>> = micro_chunks.iter().map(run_micro).collect();

            let mut outputs = Vec::with_capacity(chunk.len());
            let mut fatal = None;
            for (item, outcome) in chunk.iter().zip(results.into_iter().flatten()) {
                match outcome {
                    Ok(output) => outputs.push(output),
                    Err(err) if err.is_fatal() && fatal.is_none() => {
                        fatal = Some(EngineError::RecordFailed {
                            id: item.key().clone(),
                            source: err,
                        });
                    }
                    Err(err) => {
                        warn!(id = %item.key(), kind = %err.kind(), "Skipping record: {}", err);
                        reporter.report(Progress::RecordSkipped {
                            id: item.key().clone(),
                            kind: err.kind(),
                        });
                        report.skipped.push(SkippedRecord {
                            id: item.key().clone(),
                            kind: err.kind(),
                            reason: err.to_string(),
                        });
                    }
                }
            }

            let abort = match fatal {
                Some(err) => Some(err),
                None if self.cancel.is_cancelled() => Some(EngineError::Cancelled),
                None => {
                    let produced = outputs.len();
                    match flush(MacroChunk {
                        index,
                        total,
                        outputs,
                    }) {
                        Ok(()) => {
                            report.chunks_flushed += 1;
                            report.succeeded += produced;
                            info!("finished chunk {}/{}", index + 1, total);
                            reporter.report(Progress::ChunkFinished {
                                index: index + 1,
                                total,
                            });
                            None
                        }
                        Err(err) => Some(err),
                    }
                }
            };

            if let Some(error) = abort {
                error!(chunk = index + 1, total, "Run aborted: {}", error);
                report.abort = Some(RunAbort::new(index, error));
                break;
            }
        }

        reporter.report(Progress::TaskFinish);
        Ok(report)
    }

    fn run_one<T, U, F>(&self, item: &T, task: &F, reporter: &ProgressReporter) -> Outcome<U>
    where
        T: Keyed,
        F: Fn(&T) -> Result<U, RecordError>,
    {
        if self.cancel.is_cancelled() {
            return Err(RecordError::Cancelled);
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| task(item)))
            .unwrap_or_else(|payload| Err(RecordError::Panicked(panic_message(payload.as_ref()))));

        if let Err(err) = &outcome {
            if err.is_fatal() {
                self.cancel.cancel();
            }
        }
        reporter.report(Progress::TaskIncrement { amount: 1 });
        outcome
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
