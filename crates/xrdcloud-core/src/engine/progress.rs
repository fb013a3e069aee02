use super::report::SkipKind;
use crate::core::models::ids::MaterialId;

/// Events emitted while a run advances. Front-ends map them onto bars and log lines.
#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    /// A batch of `total` records is about to be processed.
    TaskStart { total: u64 },
    /// Records finished (successfully or not). Sent from worker threads.
    TaskIncrement { amount: u64 },
    TaskFinish,

    /// A macro-chunk was flushed to the sink. `index` is 1-based.
    ChunkFinished { index: usize, total: usize },
    RecordSkipped { id: MaterialId, kind: SkipKind },

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards [`Progress`] events to an optional callback; silent without one.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
