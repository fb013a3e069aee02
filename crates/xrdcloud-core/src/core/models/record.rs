use super::ids::MaterialId;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("expected {expected} target values, got {actual}")]
pub struct TargetLengthMismatch {
    pub expected: usize,
    pub actual: usize,
}

/// Ordered, named scalar targets of one material.
///
/// The names are shared between every record of a catalog; only the values are
/// per-material.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetProperties {
    names: Arc<[String]>,
    values: Vec<f64>,
}

impl TargetProperties {
    pub fn new(names: Arc<[String]>, values: Vec<f64>) -> Result<Self, TargetLengthMismatch> {
        if names.len() != values.len() {
            return Err(TargetLengthMismatch {
                expected: names.len(),
                actual: values.len(),
            });
        }
        Ok(Self { names, values })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn shared_names(&self) -> &Arc<[String]> {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One catalog row. Immutable once read.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRecord {
    id: MaterialId,
    structure: String,
    targets: TargetProperties,
}

impl MaterialRecord {
    pub fn new(id: MaterialId, structure: impl Into<String>, targets: TargetProperties) -> Self {
        Self {
            id,
            structure: structure.into(),
            targets,
        }
    }

    pub fn id(&self) -> &MaterialId {
        &self.id
    }

    /// Raw structure description (CIF text).
    pub fn structure(&self) -> &str {
        &self.structure
    }

    pub fn targets(&self) -> &TargetProperties {
        &self.targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Arc<[String]> {
        vec!["band_gap".to_string(), "energy_per_atom".to_string()].into()
    }

    #[test]
    fn lookup_by_name_preserves_order() {
        let targets = TargetProperties::new(names(), vec![1.2, -3.4]).unwrap();
        assert_eq!(targets.get("band_gap"), Some(1.2));
        assert_eq!(targets.get("energy_per_atom"), Some(-3.4));
        assert_eq!(targets.get("e_above_hull"), None);
        let pairs: Vec<_> = targets.iter().collect();
        assert_eq!(pairs, vec![("band_gap", 1.2), ("energy_per_atom", -3.4)]);
    }

    #[test]
    fn rejects_value_count_mismatch() {
        let err = TargetProperties::new(names(), vec![1.0]).unwrap_err();
        assert_eq!(
            err,
            TargetLengthMismatch {
                expected: 2,
                actual: 1
            }
        );
    }
}
