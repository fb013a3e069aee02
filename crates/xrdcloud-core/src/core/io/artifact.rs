use super::{DELIMITER, display_path};
use crate::core::models::record::TargetProperties;
use crate::core::models::sample::FeatureTensor;
use nalgebra::DMatrix;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Directory name of the per-material feature files.
pub const FEATURES_DIR: &str = "features";
/// Directory name of the per-material target files.
pub const TARGETS_DIR: &str = "target";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Malformed artifact '{path}': {message}")]
    Malformed { path: String, message: String },
}

fn writer<W: Write>(inner: W, has_headers: bool) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(has_headers)
        .from_writer(inner)
}

/// Writes a feature tensor as a headerless table, one line per channel.
///
/// # Arguments
///
/// * `features` - The shape-checked tensor to write.
/// * `out` - Destination; flushed before returning.
///
/// # Errors
///
/// Returns the underlying CSV or I/O error.
pub fn write_features<W: Write>(features: &FeatureTensor, out: W) -> Result<(), csv::Error> {
    let matrix = features.matrix();
    let mut wtr = writer(out, false);
    for row in matrix.row_iter() {
        wtr.write_record(row.iter().map(f64::to_string))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the target header and the single value line.
///
/// # Arguments
///
/// * `targets` - Named target values of one material.
/// * `out` - Destination; flushed before returning.
///
/// # Errors
///
/// Returns the underlying CSV or I/O error.
pub fn write_targets<W: Write>(targets: &TargetProperties, out: W) -> Result<(), csv::Error> {
    let mut wtr = writer(out, false);
    wtr.write_record(targets.names())?;
    wtr.write_record(targets.values().iter().map(f64::to_string))?;
    wtr.flush()?;
    Ok(())
}

fn open(path: &Path) -> Result<File, ArtifactError> {
    File::open(path).map_err(|source| ArtifactError::Io {
        path: display_path(path),
        source,
    })
}

fn parse_cell(path: &Path, line: usize, raw: &str) -> Result<f64, ArtifactError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ArtifactError::Malformed {
            path: display_path(path),
            message: format!("line {line}: '{raw}' is not a number"),
        })
}

/// Reads a features file back into a `channels x points` matrix.
pub fn read_features(path: &Path) -> Result<DMatrix<f64>, ArtifactError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .from_reader(open(path)?);

    let mut values = Vec::new();
    let mut rows = 0;
    let mut cols = None;
    for record in reader.records() {
        let record = record.map_err(|source| ArtifactError::Csv {
            path: display_path(path),
            source,
        })?;
        rows += 1;
        if cols.is_none() {
            cols = Some(record.len());
        }
        for raw in record.iter() {
            values.push(parse_cell(path, rows, raw)?);
        }
    }

    match cols {
        Some(cols) if cols > 0 => Ok(DMatrix::from_row_slice(rows, cols, &values)),
        _ => Err(ArtifactError::Malformed {
            path: display_path(path),
            message: "features file is empty".to_string(),
        }),
    }
}

/// Reads a targets file: a header of names and exactly one line of values.
pub fn read_targets(path: &Path) -> Result<TargetProperties, ArtifactError> {
    let csv_error = |source| ArtifactError::Csv {
        path: display_path(path),
        source,
    };
    let malformed = |message: &str| ArtifactError::Malformed {
        path: display_path(path),
        message: message.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .from_reader(open(path)?);
    let names: Arc<[String]> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut records = reader.records();
    let record = records
        .next()
        .ok_or_else(|| malformed("targets file has no value line"))?
        .map_err(csv_error)?;
    if records.next().is_some() {
        return Err(malformed("targets file has more than one value line"));
    }
    let values = record
        .iter()
        .map(|raw| parse_cell(path, 2, raw))
        .collect::<Result<Vec<_>, _>>()?;

    TargetProperties::new(names, values).map_err(|e| malformed(&e.to_string()))
}
