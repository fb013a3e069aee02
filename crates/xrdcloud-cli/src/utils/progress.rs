use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;
use xrdcloud::engine::progress::{Progress, ProgressCallback};

const SPINNER_TICK_MS: u64 = 80;

/// Drives one terminal bar from the engine's progress events.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0)
            .with_style(Self::spinner_style())
            .with_message("Initializing...");
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.disable_steady_tick();
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb_clone = self.pb.clone();

        Box::new(move |progress: Progress| {
            let Ok(pb_guard) = pb_clone.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    pb_guard.reset();
                    pb_guard.set_length(0);
                    pb_guard.set_style(Self::spinner_style());
                    pb_guard.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    pb_guard.set_message(name.to_string());
                }
                Progress::PhaseFinish => {
                    pb_guard.disable_steady_tick();
                    pb_guard.finish_with_message("✓ Done");
                }
                Progress::TaskStart { total } => {
                    pb_guard.disable_steady_tick();
                    pb_guard.reset();
                    pb_guard.set_length(total);
                    pb_guard.set_position(0);
                    pb_guard.set_style(Self::bar_style());
                    pb_guard.set_message("records");
                }
                Progress::TaskIncrement { amount } => {
                    pb_guard.inc(amount);
                }
                Progress::TaskFinish => {
                    pb_guard.finish();
                }
                Progress::ChunkFinished { index, total } => {
                    pb_guard.set_message(format!("chunk {}/{}", index, total));
                }
                Progress::RecordSkipped { id, kind } => {
                    pb_guard.println(format!("  skipped {} ({})", id, kind));
                }
                Progress::Message(msg) => {
                    if !pb_guard.is_finished() {
                        pb_guard.println(format!("  {}", msg));
                    } else {
                        pb_guard.set_message(msg);
                    }
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<14} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .with_key(
                "eta",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
                },
            )
            .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use xrdcloud::core::models::ids::MaterialId;
    use xrdcloud::engine::report::SkipKind;

    #[test]
    fn handler_initializes_in_a_clean_state() {
        let handler = CliProgressHandler::new();
        let pb = handler.pb.lock().unwrap();
        assert_eq!(pb.length(), Some(0));
        assert!(pb.is_finished());
    }

    #[test]
    fn callback_follows_a_chunked_run() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart {
            name: "Materialization",
        });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.message(), "Materialization");
            assert!(!pb.is_finished());
        }

        callback(Progress::TaskStart { total: 4 });
        callback(Progress::TaskIncrement { amount: 1 });
        callback(Progress::TaskIncrement { amount: 1 });
        callback(Progress::ChunkFinished { index: 1, total: 2 });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.length(), Some(4));
            assert_eq!(pb.position(), 2);
            assert_eq!(pb.message(), "chunk 1/2");
        }

        callback(Progress::RecordSkipped {
            id: MaterialId::new("mp-3").unwrap(),
            kind: SkipKind::Shape,
        });
        callback(Progress::TaskIncrement { amount: 2 });
        callback(Progress::TaskFinish);
        {
            let pb = handler.pb.lock().unwrap();
            assert!(pb.is_finished());
            assert_eq!(pb.position(), 4);
        }

        callback(Progress::PhaseFinish);
        assert_eq!(handler.pb.lock().unwrap().message(), "✓ Done");
    }

    #[test]
    fn skipped_records_do_not_move_the_bar() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::TaskStart { total: 10 });
        callback(Progress::TaskIncrement { amount: 3 });
        callback(Progress::RecordSkipped {
            id: MaterialId::new("mp-9").unwrap(),
            kind: SkipKind::Timeout,
        });
        callback(Progress::Message("chunk 2 aborted".to_string()));

        let pb = handler.pb.lock().unwrap();
        assert_eq!(pb.position(), 3);
        assert!(!pb.is_finished());
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| callback(Progress::TaskIncrement { amount: 1 }));
            }
        });
        callback(Progress::PhaseFinish);

        let pb = handler.pb.lock().unwrap();
        assert_eq!(pb.position(), 4);
        assert!(pb.is_finished());
    }
}
