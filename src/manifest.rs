//! Filename index of a mounted source tree.
//!
//! Built once per source with a single walk; artifact and marker lookups
//! are then map hits instead of repeated recursive searches. The walk is
//! sorted by file name so that duplicate names resolve to the same path on
//! every run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::DeployError;

pub struct SourceManifest {
    root: PathBuf,
    files: HashMap<String, PathBuf>,
}

impl SourceManifest {
    /// Walk `root` and record the first occurrence of every file name.
    pub fn index(root: &Path) -> Result<Self, DeployError> {
        let mut files = HashMap::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|err| DeployError::Io(err.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                files
                    .entry(name.to_string())
                    .or_insert_with(|| entry.path().to_path_buf());
            }
        }
        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stable first match for `name`, if the source tree contains one.
    pub fn lookup(&self, name: &str) -> Option<&Path> {
        self.files.get(name).map(PathBuf::as_path)
    }
}
