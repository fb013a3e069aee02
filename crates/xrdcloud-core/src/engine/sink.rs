use super::error::EngineError;
use crate::core::io::artifact::{
    ArtifactError, FEATURES_DIR, TARGETS_DIR, write_features, write_targets,
};
use crate::core::io::display_path;
use crate::core::models::ids::MaterialId;
use crate::core::models::sample::PointCloudSample;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, trace, warn};

/// Confirmation step guarding the irreversible reset of an [`OutputSpace`].
pub trait ResetGate {
    fn confirm(&mut self, space: &OutputSpace) -> bool;
}

impl<F> ResetGate for F
where
    F: FnMut(&OutputSpace) -> bool,
{
    fn confirm(&mut self, space: &OutputSpace) -> bool {
        self(space)
    }
}

/// The pair of directories one run writes its artifacts into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpace {
    features_dir: PathBuf,
    targets_dir: PathBuf,
}

impl OutputSpace {
    pub fn new(features_dir: impl Into<PathBuf>, targets_dir: impl Into<PathBuf>) -> Self {
        Self {
            features_dir: features_dir.into(),
            targets_dir: targets_dir.into(),
        }
    }

    /// `<root>/features` and `<root>/target`.
    pub fn under(root: &Path) -> Self {
        Self::new(root.join(FEATURES_DIR), root.join(TARGETS_DIR))
    }

    pub fn features_dir(&self) -> &Path {
        &self.features_dir
    }

    pub fn targets_dir(&self) -> &Path {
        &self.targets_dir
    }

    pub fn features_path(&self, id: &MaterialId) -> PathBuf {
        self.features_dir.join(id.file_name())
    }

    pub fn targets_path(&self, id: &MaterialId) -> PathBuf {
        self.targets_dir.join(id.file_name())
    }

    fn dirs(&self) -> [&Path; 2] {
        [&self.features_dir, &self.targets_dir]
    }

    /// Deletes both directories with everything in them and recreates them empty.
    ///
    /// Nothing is touched unless `gate` confirms.
    #[instrument(skip_all, fields(features = %self.features_dir.display(), targets = %self.targets_dir.display()))]
    pub fn reset(&self, gate: &mut impl ResetGate) -> Result<(), EngineError> {
        if !gate.confirm(self) {
            warn!("Output space reset declined.");
            return Err(EngineError::ResetDeclined);
        }
        for dir in self.dirs() {
            if dir.exists() {
                fs::remove_dir_all(dir).map_err(|source| EngineError::Io {
                    path: display_path(dir),
                    source,
                })?;
            }
        }
        self.ensure()?;
        info!("Output space reset.");
        Ok(())
    }

    /// Creates missing directories without deleting anything.
    pub fn ensure(&self) -> Result<(), EngineError> {
        for dir in self.dirs() {
            fs::create_dir_all(dir).map_err(|source| EngineError::Io {
                path: display_path(dir),
                source,
            })?;
        }
        Ok(())
    }
}

/// Where one material's artifacts ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub id: MaterialId,
    pub features_path: PathBuf,
    pub targets_path: PathBuf,
}

/// Writes each material's artifact pair exactly once.
///
/// An id seen earlier in the run, or whose artifacts already exist on disk, is a
/// [`EngineError::DuplicateArtifact`]. Both files are staged under a dot-prefixed name
/// and renamed into place; if the targets file fails, the features file is removed
/// again so a material is either fully materialized or absent.
#[derive(Debug)]
pub struct ArtifactSink {
    space: OutputSpace,
    seen: HashSet<MaterialId>,
    persisted: usize,
}

impl ArtifactSink {
    pub fn open(space: OutputSpace) -> Result<Self, EngineError> {
        for dir in space.dirs() {
            if !dir.is_dir() {
                return Err(EngineError::InputMissing { path: display_path(dir) });
            }
        }
        Ok(Self {
            space,
            seen: HashSet::new(),
            persisted: 0,
        })
    }

    pub fn space(&self) -> &OutputSpace {
        &self.space
    }

    pub fn persisted(&self) -> usize {
        self.persisted
    }

    pub fn persist(&mut self, sample: &PointCloudSample) -> Result<Ack, EngineError> {
        let id = sample.id();
        let features_path = self.space.features_path(id);
        let targets_path = self.space.targets_path(id);

        if self.seen.contains(id) {
            return Err(EngineError::DuplicateArtifact {
                id: id.clone(),
                path: display_path(&features_path),
            });
        }
        if let Some(existing) = [&features_path, &targets_path].into_iter().find(|p| p.exists()) {
            return Err(EngineError::DuplicateArtifact {
                id: id.clone(),
                path: display_path(existing),
            });
        }

        write_staged(&features_path, id, |file| {
            write_features(sample.features(), file)
        })?;
        if let Err(err) = write_staged(&targets_path, id, |file| {
            write_targets(sample.targets(), file)
        }) {
            if let Err(cleanup) = fs::remove_file(&features_path) {
                warn!(id = %id, "Could not remove orphaned features file: {}", cleanup);
            }
            return Err(err);
        }

        self.seen.insert(id.clone());
        self.persisted += 1;
        trace!(id = %id, "Artifacts persisted.");
        Ok(Ack {
            id: id.clone(),
            features_path,
            targets_path,
        })
    }
}

fn staged_path(final_path: &Path) -> PathBuf {
    let name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    final_path.with_file_name(format!(".{name}.partial"))
}

fn write_staged(
    final_path: &Path,
    id: &MaterialId,
    write: impl FnOnce(File) -> Result<(), csv::Error>,
) -> Result<(), EngineError> {
    let staged = staged_path(final_path);
    let artifact_error = |source| EngineError::Artifact {
        id: id.clone(),
        source,
    };

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&staged)
        .map_err(|source| {
            artifact_error(ArtifactError::Io {
                path: display_path(&staged),
                source,
            })
        })?;

    let written = write(file)
        .map_err(|source| ArtifactError::Csv {
            path: display_path(&staged),
            source,
        })
        .and_then(|()| {
            fs::rename(&staged, final_path).map_err(|source| ArtifactError::Io {
                path: display_path(final_path),
                source,
            })
        });

    if let Err(source) = written {
        if let Err(cleanup) = fs::remove_file(&staged) {
            warn!(id = %id, "Could not remove staged file {}: {}", display_path(&staged), cleanup);
        }
        return Err(artifact_error(source));
    }
    Ok(())
}
