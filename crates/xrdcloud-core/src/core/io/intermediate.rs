use super::{DELIMITER, display_path};
use crate::core::encoding::encoder::EncodeError;
use crate::core::models::ids::{InvalidMaterialId, MaterialId};
use crate::core::models::pattern::{DiffractionPattern, Reflection};
use crate::core::models::record::TargetProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

pub const ID_COLUMN: &str = "material_id";
pub const LATTICE_COLUMN: &str = "recip_latt";
pub const REFLECTIONS_COLUMN: &str = "reflections";

#[derive(Debug, Error)]
pub enum IntermediateError {
    #[error("Intermediate pattern table not found: '{path}'")]
    InputMissing { path: String },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Invalid header in '{path}': {message}")]
    Header { path: String, message: String },
    #[error("Row {row}: {source}")]
    InvalidId {
        row: usize,
        source: InvalidMaterialId,
    },
    #[error("Row {row}: value '{value}' in column '{column}' is not a number")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
    #[error("Targets of '{id}' do not match the table columns")]
    TargetMismatch { id: MaterialId },
}

/// One material's simulated pattern in its serialized table form.
///
/// The lattice and reflection cells hold JSON and are only decoded when the row is
/// encoded, so a corrupt cell affects that material alone.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternRow {
    pub id: MaterialId,
    pub reciprocal_lattice: String,
    pub reflections: String,
    pub targets: TargetProperties,
}

impl PatternRow {
    pub fn from_pattern(
        id: MaterialId,
        pattern: &DiffractionPattern,
        targets: TargetProperties,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id,
            reciprocal_lattice: serde_json::to_string(&pattern.lattice_rows())?,
            reflections: serde_json::to_string(&pattern.reflections)?,
            targets,
        })
    }

    pub fn decode(&self) -> Result<DiffractionPattern, EncodeError> {
        let rows: [[f64; 3]; 3] = serde_json::from_str(&self.reciprocal_lattice)
            .map_err(|e| EncodeError::Parse(format!("{LATTICE_COLUMN}: {e}")))?;
        let reflections: Vec<Reflection> = serde_json::from_str(&self.reflections)
            .map_err(|e| EncodeError::Parse(format!("{REFLECTIONS_COLUMN}: {e}")))?;
        Ok(DiffractionPattern::new(
            DiffractionPattern::lattice_from_rows(rows),
            reflections,
        ))
    }
}

/// Append-only writer of the intermediate table. The header is written once, on
/// creation; every [`IntermediateWriter::append`] adds rows and flushes.
pub struct IntermediateWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    target_names: Arc<[String]>,
    rows_written: usize,
}

impl IntermediateWriter {
    pub fn create(path: &Path, target_names: Arc<[String]>) -> Result<Self, IntermediateError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| IntermediateError::Io {
                path: display_path(parent),
                source,
            })?;
        }
        let file = File::create(path).map_err(|source| IntermediateError::Io {
            path: display_path(path),
            source,
        })?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .from_writer(file);

        let header = [ID_COLUMN, LATTICE_COLUMN, REFLECTIONS_COLUMN]
            .into_iter()
            .chain(target_names.iter().map(String::as_str));
        let csv_error = |source| IntermediateError::Csv {
            path: display_path(path),
            source,
        };
        writer.write_record(header).map_err(csv_error)?;
        writer.flush().map_err(|source| IntermediateError::Io {
            path: display_path(path),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            target_names,
            rows_written: 0,
        })
    }

    pub fn append(&mut self, rows: &[PatternRow]) -> Result<(), IntermediateError> {
        for row in rows {
            if row.targets.names() != &*self.target_names {
                return Err(IntermediateError::TargetMismatch { id: row.id.clone() });
            }
            let mut fields = vec![
                row.id.to_string(),
                row.reciprocal_lattice.clone(),
                row.reflections.clone(),
            ];
            fields.extend(row.targets.values().iter().map(f64::to_string));
            self.writer
                .write_record(&fields)
                .map_err(|source| IntermediateError::Csv {
                    path: display_path(&self.path),
                    source,
                })?;
        }
        self.writer.flush().map_err(|source| IntermediateError::Io {
            path: display_path(&self.path),
            source,
        })?;
        self.rows_written += rows.len();
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn target_names(&self) -> &Arc<[String]> {
        &self.target_names
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}

/// Rows of an intermediate table, in file order, with cells not yet decoded.
#[derive(Debug, Clone)]
pub struct IntermediateTable {
    target_names: Arc<[String]>,
    rows: Vec<PatternRow>,
}

impl IntermediateTable {
    #[instrument(skip_all, name = "intermediate_load", fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, IntermediateError> {
        if !path.is_file() {
            return Err(IntermediateError::InputMissing {
                path: display_path(path),
            });
        }
        let file = File::open(path).map_err(|source| IntermediateError::Io {
            path: display_path(path),
            source,
        })?;
        let csv_error = |source| IntermediateError::Csv {
            path: display_path(path),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(true)
            .from_reader(file);

        let headers = reader.headers().map_err(csv_error)?.clone();
        let leading: Vec<&str> = headers.iter().take(3).collect();
        if leading != [ID_COLUMN, LATTICE_COLUMN, REFLECTIONS_COLUMN] || headers.len() < 4 {
            return Err(IntermediateError::Header {
                path: display_path(path),
                message: format!(
                    "expected '{ID_COLUMN};{LATTICE_COLUMN};{REFLECTIONS_COLUMN};<targets>', found '{}'",
                    headers.iter().collect::<Vec<_>>().join(";")
                ),
            });
        }
        let target_names: Arc<[String]> = headers.iter().skip(3).map(str::to_string).collect();

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(csv_error)?;
            let row = index + 1;
            let field = |col: usize| record.get(col).unwrap_or_default();

            let id = MaterialId::new(field(0))
                .map_err(|source| IntermediateError::InvalidId { row, source })?;
            let values = target_names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let raw = field(3 + i).trim();
                    raw.parse::<f64>().map_err(|_| IntermediateError::InvalidValue {
                        row,
                        column: name.clone(),
                        value: raw.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let targets = TargetProperties::new(Arc::clone(&target_names), values)
                .map_err(|_| IntermediateError::TargetMismatch { id: id.clone() })?;

            rows.push(PatternRow {
                id,
                reciprocal_lattice: field(1).to_string(),
                reflections: field(2).to_string(),
                targets,
            });
        }

        debug!(rows = rows.len(), "Intermediate table loaded.");
        Ok(Self { target_names, rows })
    }

    pub fn target_names(&self) -> &Arc<[String]> {
        &self.target_names
    }

    pub fn rows(&self) -> &[PatternRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
