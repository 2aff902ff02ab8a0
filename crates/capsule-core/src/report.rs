use crate::CoreError;
use capsule_schema::{Variant, Warning};
use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// One finished capsule archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltCapsule {
    pub variant: Variant,
    pub path: PathBuf,
    pub size: u64,
    /// blake3 of the archive bytes, hex encoded.
    pub digest: String,
    pub entries: usize,
    /// `.x` / `.tx` copies written next to the archive.
    pub companions: Vec<PathBuf>,
}

impl BuiltCapsule {
    pub fn describe(
        variant: Variant,
        path: &Path,
        entries: usize,
        companions: Vec<PathBuf>,
    ) -> Result<Self, CoreError> {
        let mut file = File::open(path)?;
        let mut hasher = blake3::Hasher::new();
        let size = io::copy(&mut file, &mut hasher)?;
        Ok(Self {
            variant,
            path: path.to_path_buf(),
            size,
            digest: hasher.finalize().to_hex().to_string(),
            entries,
            companions,
        })
    }
}

/// Summary of a packaging run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub runtime_version: String,
    pub output_dir: PathBuf,
    pub capsules: Vec<BuiltCapsule>,
    pub warnings: Vec<Warning>,
    pub built_at: String,
}

impl BuildReport {
    pub fn new(runtime_version: &str, output_dir: &Path) -> Self {
        Self {
            runtime_version: runtime_version.to_owned(),
            output_dir: output_dir.to_path_buf(),
            capsules: Vec::new(),
            warnings: Vec::new(),
            built_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn capsule(&self, variant: Variant) -> Option<&BuiltCapsule> {
        self.capsules.iter().find(|c| c.variant == variant)
    }
}
