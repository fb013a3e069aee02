use super::error::EngineError;
use crate::core::models::ids::MaterialId;
use std::fmt;

/// Why a record produced no artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipKind {
    Parse,
    Shape,
    Simulation,
    Timeout,
    Panic,
    Cancelled,
}

impl fmt::Display for SkipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parse => "parse",
            Self::Shape => "shape",
            Self::Simulation => "simulation",
            Self::Timeout => "timeout",
            Self::Panic => "panic",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub id: MaterialId,
    pub kind: SkipKind,
    pub reason: String,
}

/// Where a run stopped. `chunk_index` is 0-based; chunks before it were flushed.
#[derive(Debug)]
pub struct RunAbort {
    pub chunk_index: usize,
    /// Samples of the aborted chunk that reached the disk before the failure.
    pub persisted_in_chunk: usize,
    pub error: EngineError,
}

impl RunAbort {
    pub fn new(chunk_index: usize, error: EngineError) -> Self {
        Self {
            chunk_index,
            persisted_in_chunk: 0,
            error,
        }
    }
}

/// Outcome of a dispatcher run.
///
/// `succeeded` counts every sample that reached the disk. A report with an `abort`
/// describes a partial run: every chunk counted in `chunks_flushed` is on disk, the
/// aborted chunk may be on disk in part (see [`RunAbort::persisted_in_chunk`]) and
/// nothing after it is.
#[derive(Debug, Default)]
pub struct RunReport {
    pub chunks_total: usize,
    pub chunks_flushed: usize,
    pub succeeded: usize,
    pub skipped: Vec<SkippedRecord>,
    pub abort: Option<RunAbort>,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.abort.is_none() && self.chunks_flushed == self.chunks_total
    }

    /// Folds the samples a failed flush wrote before it stopped into the counts.
    ///
    /// `persisted` is how many samples the sink wrote during the whole run.
    pub fn settle_partial_chunk(&mut self, persisted: usize) {
        let Some(abort) = self.abort.as_mut() else {
            return;
        };
        let partial = persisted.saturating_sub(self.succeeded);
        abort.persisted_in_chunk = partial;
        self.succeeded += partial;
    }

    pub fn skipped_of(&self, kind: SkipKind) -> usize {
        self.skipped.iter().filter(|s| s.kind == kind).count()
    }

    /// Turns an aborted report into its fatal error.
    pub fn into_result(self) -> Result<Self, EngineError> {
        match self.abort {
            Some(abort) => Err(abort.error),
            None => Ok(self),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} skipped, {}/{} chunks flushed",
            self.succeeded,
            self.skipped.len(),
            self.chunks_flushed,
            self.chunks_total
        )?;
        if let Some(abort) = &self.abort {
            write!(f, "; aborted in chunk {}", abort.chunk_index + 1)?;
            if abort.persisted_in_chunk > 0 {
                write!(f, " after {} of its samples were written", abort.persisted_in_chunk)?;
            }
            write!(f, ": {}", abort.error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skipped(id: &str, kind: SkipKind) -> SkippedRecord {
        SkippedRecord {
            id: MaterialId::new(id).unwrap(),
            kind,
            reason: "test".into(),
        }
    }

    #[test]
    fn counts_and_summary() {
        let report = RunReport {
            chunks_total: 2,
            chunks_flushed: 2,
            succeeded: 5,
            skipped: vec![skipped("a", SkipKind::Shape), skipped("b", SkipKind::Parse)],
            abort: None,
        };
        assert!(report.is_complete());
        assert_eq!(report.skipped_of(SkipKind::Shape), 1);
        assert_eq!(report.to_string(), "5 succeeded, 2 skipped, 2/2 chunks flushed");
    }

    #[test]
    fn aborted_report_yields_its_error() {
        let report = RunReport {
            chunks_total: 3,
            chunks_flushed: 1,
            abort: Some(RunAbort::new(1, EngineError::ResetDeclined)),
            ..RunReport::default()
        };
        assert!(!report.is_complete());
        assert!(report.to_string().ends_with("aborted in chunk 2: Reset of the output space was declined"));
        assert!(matches!(report.into_result(), Err(EngineError::ResetDeclined)));
    }

    #[test]
    fn partial_chunk_is_counted_as_succeeded() {
        let mut report = RunReport {
            chunks_total: 2,
            chunks_flushed: 1,
            succeeded: 3,
            abort: Some(RunAbort::new(1, EngineError::Cancelled)),
            ..RunReport::default()
        };
        report.settle_partial_chunk(5);

        assert_eq!(report.succeeded, 5);
        assert_eq!(report.abort.as_ref().unwrap().persisted_in_chunk, 2);
        assert_eq!(
            report.to_string(),
            "5 succeeded, 0 skipped, 1/2 chunks flushed; aborted in chunk 2 after 2 of its samples were written: Run cancelled"
        );
    }

    #[test]
    fn settling_a_complete_run_changes_nothing() {
        let mut report = RunReport {
            chunks_total: 1,
            chunks_flushed: 1,
            succeeded: 4,
            ..RunReport::default()
        };
        report.settle_partial_chunk(4);
        assert_eq!(report.succeeded, 4);
        assert!(report.is_complete());
    }
}
