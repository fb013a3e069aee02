//! File formats of the pipeline.
//!
//! - [`catalog`] reads the delimited material catalog (the record source).
//! - [`intermediate`] writes and reads the pattern-level table between the compute and
//!   generate stages.
//! - [`artifact`] writes and reads the per-material features / targets files.
//! - [`dataset`] indexes a directory of artifacts for downstream consumers.

pub mod artifact;
pub mod catalog;
pub mod dataset;
pub mod intermediate;

/// Field delimiter shared by every table the pipeline writes.
pub const DELIMITER: u8 = b';';

pub(crate) fn display_path(path: &std::path::Path) -> String {
    path.to_string_lossy().to_string()
}
