use super::{DELIMITER, display_path};
use crate::core::models::ids::{InvalidMaterialId, MaterialId};
use crate::core::models::record::{MaterialRecord, TargetProperties};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog file not found: '{path}'")]
    InputMissing { path: String },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Catalog is missing required column '{0}'")]
    MissingColumn(String),
    #[error("Unknown target property '{name}' (catalog columns: {available})")]
    UnknownTargetProperty { name: String, available: String },
    #[error("Row {row}: value '{value}' in column '{column}' is not a number")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
    #[error("Row {row}: {source}")]
    InvalidId {
        row: usize,
        source: InvalidMaterialId,
    },
}

/// Column layout of a catalog file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSchema {
    pub delimiter: u8,
    pub id_column: String,
    pub structure_column: String,
    pub target_columns: Vec<String>,
}

impl Default for CatalogSchema {
    fn default() -> Self {
        Self {
            delimiter: DELIMITER,
            id_column: "material_id".to_string(),
            structure_column: "cif".to_string(),
            target_columns: vec![
                "band_gap".to_string(),
                "energy_per_atom".to_string(),
                "formation_energy_per_atom".to_string(),
            ],
        }
    }
}

/// All records of a catalog, in file order.
#[derive(Debug, Clone)]
pub struct Catalog {
    target_names: Arc<[String]>,
    records: Vec<MaterialRecord>,
}

impl Catalog {
    pub fn new(target_names: Arc<[String]>, records: Vec<MaterialRecord>) -> Self {
        Self {
            target_names,
            records,
        }
    }

    /// Reads every row of the catalog at `path`.
    ///
    /// Extra columns are ignored. Target cells must parse as numbers; a bad cell means the
    /// catalog is corrupt and fails the whole load.
    #[instrument(skip_all, name = "catalog_load", fields(path = %path.display()))]
    pub fn load(path: &Path, schema: &CatalogSchema) -> Result<Self, CatalogError> {
        if !path.is_file() {
            return Err(CatalogError::InputMissing {
                path: display_path(path),
            });
        }
        let file = File::open(path).map_err(|source| CatalogError::Io {
            path: display_path(path),
            source,
        })?;
        let csv_error = |source| CatalogError::Csv {
            path: display_path(path),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(schema.delimiter)
            .has_headers(true)
            .from_reader(file);
        let headers = reader.headers().map_err(csv_error)?.clone();

        let column = |name: &str| headers.iter().position(|h| h.trim() == name);
        let id_col = column(&schema.id_column)
            .ok_or_else(|| CatalogError::MissingColumn(schema.id_column.clone()))?;
        let structure_col = column(&schema.structure_column)
            .ok_or_else(|| CatalogError::MissingColumn(schema.structure_column.clone()))?;
        let target_cols = schema
            .target_columns
            .iter()
            .map(|name| {
                column(name).ok_or_else(|| CatalogError::UnknownTargetProperty {
                    name: name.clone(),
                    available: headers.iter().collect::<Vec<_>>().join(", "),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let target_names: Arc<[String]> = Arc::from(schema.target_columns.clone());
        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let row = row.map_err(csv_error)?;
            let row_number = index + 1;
            let field = |col: usize| row.get(col).unwrap_or_default();

            let id = MaterialId::new(field(id_col)).map_err(|source| CatalogError::InvalidId {
                row: row_number,
                source,
            })?;

            let values = target_cols
                .iter()
                .zip(schema.target_columns.iter())
                .map(|(&col, name)| {
                    let raw = field(col).trim();
                    raw.parse::<f64>().map_err(|_| CatalogError::InvalidValue {
                        row: row_number,
                        column: name.clone(),
                        value: raw.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            // Lengths agree by construction.
            let targets = TargetProperties::new(Arc::clone(&target_names), values).map_err(|e| {
                CatalogError::InvalidValue {
                    row: row_number,
                    column: "targets".to_string(),
                    value: e.to_string(),
                }
            })?;
            records.push(MaterialRecord::new(id, field(structure_col), targets));
        }

        debug!(records = records.len(), "Catalog loaded.");
        Ok(Self {
            target_names,
            records,
        })
    }

    pub fn target_names(&self) -> &Arc<[String]> {
        &self.target_names
    }

    pub fn records(&self) -> &[MaterialRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<MaterialRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
