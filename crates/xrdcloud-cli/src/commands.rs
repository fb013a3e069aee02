pub mod compute;
pub mod generate;
pub mod reset;
pub mod run;
pub mod verify;

use crate::config::Overrides;
use crate::error::Result;
use crate::utils::prompt::ConsoleGate;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use xrdcloud::engine::report::{RunReport, SkipKind};
use xrdcloud::engine::sink::{ArtifactSink, OutputSpace};

/// Flags every subcommand accepts.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub set_values: Vec<String>,
    pub workers: Option<usize>,
    pub yes: bool,
}

impl GlobalOptions {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config_file: self.config.clone(),
            set_values: self.set_values.clone(),
            workers: self.workers,
            ..Default::default()
        }
    }
}

/// Wipes and recreates the output directories behind the console gate, then opens a sink.
fn reset_and_open(root: &Path, yes: bool) -> Result<ArtifactSink> {
    let space = OutputSpace::under(root);
    space.reset(&mut ConsoleGate::stdio(yes))?;
    info!("Output space ready under {:?}", root);
    Ok(ArtifactSink::open(space)?)
}

/// Prints the run summary; an aborted run becomes the command's error.
fn conclude(report: RunReport) -> Result<()> {
    println!("{}", report);
    let skipped_kinds = [
        SkipKind::Parse,
        SkipKind::Shape,
        SkipKind::Simulation,
        SkipKind::Timeout,
        SkipKind::Panic,
        SkipKind::Cancelled,
    ];
    for kind in skipped_kinds {
        let count = report.skipped_of(kind);
        if count > 0 {
            println!("  skipped ({}): {}", kind, count);
        }
    }
    if report.abort.is_some() {
        warn!(
            "Run stopped after {}/{} chunks; flushed chunks are kept on disk.",
            report.chunks_flushed, report.chunks_total
        );
    }
    report.into_result()?;
    Ok(())
}
