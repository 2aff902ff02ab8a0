//! Archive assembly primitives for capsule packaging.
//!
//! This crate provides the low-level pieces: `ArchiveWriter` for streaming
//! entries into a zip archive while tolerating duplicate names, the jar
//! `Manifest` model with its text rendering and parser, the entry collectors
//! (compiled output, runtime-support classes, file sets, caplets),
//! `make_executable` for shell-prefixed self-executing copies, and
//! `ArchiveReader` for inspecting finished capsules.

pub mod exec;
pub mod manifest;
pub mod reader;
pub mod sources;
pub mod writer;

pub use exec::{make_executable, ExecKind, EXEC_PREFIX, EXEC_TRAMPOLINE_PREFIX};
pub use manifest::{Attributes, Manifest, ManifestError, MANIFEST_PATH};
pub use reader::ArchiveReader;
pub use sources::{
    archive_path, candidate_files, caplet_entries, compiled_entries, file_set_entries,
    locate_caplets, runtime_entries, Entry, EntryContent, LocatedCaplet, RuntimeSelection,
};
pub use writer::{ArchiveWriter, WriteOutcome};

use std::path::PathBuf;
use thiserror::Error;

/// Launcher class every capsule declares as `Main-Class`.
pub const RUNTIME_MAIN_CLASS: &str = "Capsule";
/// Archive entry of the launcher class inside the runtime artifact.
pub const RUNTIME_MAIN_CLASS_ENTRY: &str = "Capsule.class";
/// Runtime-support entries are those whose name contains this token.
pub const RUNTIME_MARKER: &str = "capsule";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),
    #[error("failed to read {}: {source}", path.display())]
    ReadSource {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),
    #[error("directory walk failed: {0}")]
    Walk(String),
    #[error("{} is not under {}", path.display(), root.display())]
    OutsideRoot { root: PathBuf, path: PathBuf },
    #[error("runtime artifact {} has no {entry} entry", artifact.display())]
    MissingRuntimeClass { artifact: PathBuf, entry: String },
}
