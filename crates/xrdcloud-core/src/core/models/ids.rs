use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid material id '{value}': {reason}")]
pub struct InvalidMaterialId {
    pub value: String,
    pub reason: &'static str,
}

/// Unique key of a material; also the stem of its artifact file names.
///
/// Ids are validated on construction so that they can be used directly as file
/// names: they are non-empty, contain no path separators and do not start with a
/// dot (staged artifacts use dot-prefixed names).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MaterialId(String);

impl MaterialId {
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidMaterialId> {
        let raw = raw.into();
        let value = raw.trim();
        let reason = if value.is_empty() {
            Some("id is empty")
        } else if value.contains(['/', '\\', '\0']) {
            Some("id contains a path separator")
        } else if value.starts_with('.') {
            Some("id starts with '.'")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(InvalidMaterialId {
                value: raw.clone(),
                reason,
            }),
            None => Ok(Self(value.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.0)
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MaterialId {
    type Error = InvalidMaterialId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MaterialId> for String {
    fn from(id: MaterialId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_materials_project_style_ids() {
        let id = MaterialId::new("mp-1234").unwrap();
        assert_eq!(id.as_str(), "mp-1234");
        assert_eq!(id.file_name(), "mp-1234.csv");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let id = MaterialId::new("  mvc-42 ").unwrap();
        assert_eq!(id.to_string(), "mvc-42");
    }

    #[test]
    fn rejects_ids_that_are_not_safe_file_stems() {
        for bad in ["", "   ", "a/b", "..", ".hidden", "x\\y"] {
            assert!(MaterialId::new(bad).is_err(), "'{}' should be rejected", bad);
        }
    }

    #[test]
    fn deserialization_validates_the_id() {
        let ok: Result<MaterialId, _> = serde_json::from_str("\"mp-1\"");
        assert!(ok.is_ok());
        let bad: Result<MaterialId, _> = serde_json::from_str("\"../etc\"");
        assert!(bad.is_err());
    }
}
