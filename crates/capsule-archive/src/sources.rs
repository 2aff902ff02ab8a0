//! Collectors of archive entries: compiled output, runtime-support classes,
//! user file sets, and caplet classes.

use crate::{ArchiveError, RUNTIME_MAIN_CLASS_ENTRY, RUNTIME_MARKER};
use capsule_schema::{Diagnostics, FileSet, Warning};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

const OS_METADATA_FILE: &str = ".DS_Store";
const MANIFEST_FILE_NAME: &str = "MANIFEST.MF";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryContent {
    Bytes(Vec<u8>),
    /// Streamed from disk when written.
    File(PathBuf),
    Directory,
}

/// A named entry destined for an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub content: EntryContent,
}

impl Entry {
    pub fn bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content: EntryContent::Bytes(data),
        }
    }

    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            content: EntryContent::File(path.into()),
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        let mut name = name.into();
        if !name.ends_with('/') {
            name.push('/');
        }
        Self {
            name,
            content: EntryContent::Directory,
        }
    }
}

/// `/`-separated archive path of `path` relative to `root`.
pub fn archive_path(root: &Path, path: &Path) -> Result<String, ArchiveError> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| ArchiveError::OutsideRoot {
            root: root.to_path_buf(),
            path: path.to_path_buf(),
        })?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

/// Lazily yield regular files under `root`, depth-first, siblings sorted by name.
///
/// The iterator can be dropped at any point to stop the traversal.
pub fn candidate_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
}

/// Every regular file of the compiled-output tree, except OS metadata files
/// and stray manifests. Symbolic links are followed.
pub fn compiled_entries(classes_dir: &Path) -> Result<Vec<Entry>, ArchiveError> {
    if !classes_dir.is_dir() {
        return Err(ArchiveError::MissingDirectory(classes_dir.to_path_buf()));
    }

    let mut entries = Vec::new();
    for item in WalkDir::new(classes_dir).follow_links(true).sort_by_file_name() {
        let item = item.map_err(|e| ArchiveError::Walk(e.to_string()))?;
        if !item.file_type().is_file() {
            continue;
        }
        let file_name = item.file_name().to_string_lossy();
        if file_name == OS_METADATA_FILE || file_name == MANIFEST_FILE_NAME {
            trace!("skipping {}", item.path().display());
            continue;
        }
        let name = archive_path(classes_dir, item.path())?;
        debug!("adding compiled project class to capsule: [{}]", item.path().display());
        entries.push(Entry::file(name, item.path()));
    }
    Ok(entries)
}

/// Which part of the runtime-support artifact to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeSelection {
    /// Every entry whose name contains the runtime marker, plus the main class.
    Full,
    /// Only the launcher main class.
    MainClassOnly,
}

/// Extract runtime-support entries from the resolved runtime artifact.
///
/// Fails when the artifact does not contain the launcher main class.
pub fn runtime_entries(
    runtime_jar: &Path,
    selection: RuntimeSelection,
) -> Result<Vec<Entry>, ArchiveError> {
    let file = File::open(runtime_jar).map_err(|e| ArchiveError::ReadSource {
        path: runtime_jar.to_path_buf(),
        source: e,
    })?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut entries = Vec::new();
    let mut found_main = false;
    for i in 0..archive.len() {
        let mut zf = archive.by_index(i)?;
        let name = zf.name().to_owned();
        let is_main = name == RUNTIME_MAIN_CLASS_ENTRY;
        let wanted = match selection {
            RuntimeSelection::Full => is_main || name.contains(RUNTIME_MARKER),
            RuntimeSelection::MainClassOnly => is_main,
        };
        if !wanted {
            continue;
        }
        found_main |= is_main;
        if zf.is_dir() {
            entries.push(Entry::directory(name));
        } else {
            let mut data = Vec::with_capacity(zf.size() as usize);
            zf.read_to_end(&mut data)?;
            entries.push(Entry::bytes(name, data));
        }
    }

    if !found_main {
        return Err(ArchiveError::MissingRuntimeClass {
            artifact: runtime_jar.to_path_buf(),
            entry: RUNTIME_MAIN_CLASS_ENTRY.to_owned(),
        });
    }
    debug!(
        "extracted {} runtime entries from {}",
        entries.len(),
        runtime_jar.display()
    );
    Ok(entries)
}

/// Entries for user-declared file sets.
///
/// Relative source directories are resolved against `base_dir`. A source
/// that is not a directory is skipped with a warning; an include that does
/// not exist is an error.
pub fn file_set_entries(
    file_sets: &[FileSet],
    base_dir: &Path,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<Entry>, ArchiveError> {
    let mut entries = Vec::new();
    for set in file_sets {
        if set.directory.is_empty() {
            continue;
        }
        let directory = base_dir.join(&set.directory);
        if !directory.is_dir() {
            diagnostics.push(Warning::FileSetNotDirectory { directory });
            continue;
        }

        let prefix = set.normalized_prefix();
        if !prefix.is_empty() {
            entries.push(Entry::directory(prefix.clone()));
        }
        for include in &set.includes {
            let source = directory.join(include);
            if !source.is_file() {
                return Err(ArchiveError::ReadSource {
                    path: source,
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            entries.push(Entry::file(format!("{prefix}{include}"), source));
        }
    }
    Ok(entries)
}

/// A caplet fragment bound to the compiled file that matched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedCaplet {
    pub fragment: String,
    pub file: PathBuf,
    pub entry_name: String,
}

/// Bind each fragment to the first compiled file whose relative path contains it.
///
/// Unmatched fragments are reported as warnings and left out of the result.
pub fn locate_caplets(
    classes_dir: &Path,
    fragments: &[String],
    diagnostics: &mut Diagnostics,
) -> Vec<LocatedCaplet> {
    let mut located = Vec::new();
    for fragment in fragments {
        let hit = candidate_files(classes_dir).find_map(|path| {
            let rel = archive_path(classes_dir, &path).ok()?;
            rel.contains(fragment.as_str()).then_some((path, rel))
        });
        match hit {
            Some((file, entry_name)) => {
                debug!("caplet {fragment} -> {}", file.display());
                located.push(LocatedCaplet {
                    fragment: fragment.clone(),
                    file,
                    entry_name,
                });
            }
            None => diagnostics.push(Warning::UnmatchedCaplet {
                fragment: fragment.clone(),
            }),
        }
    }
    located
}

/// Entries that copy located caplet classes under their compiled-output path.
pub fn caplet_entries(caplets: &[LocatedCaplet]) -> Vec<Entry> {
    caplets
        .iter()
        .map(|c| Entry::file(c.entry_name.clone(), c.file.clone()))
        .collect()
}
