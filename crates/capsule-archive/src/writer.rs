use crate::sources::{Entry, EntryContent};
use crate::ArchiveError;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// What happened to a single entry write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// An entry with this name already exists; the first write wins.
    Duplicate,
}

/// Streams named entries into a zip archive on disk.
///
/// Duplicate names are detected up front and reported as
/// [`WriteOutcome::Duplicate`]; any other failure is an error. Timestamps are
/// left at the zip epoch so the same inputs give the same archive bytes.
pub struct ArchiveWriter {
    path: PathBuf,
    zip: ZipWriter<File>,
    names: HashSet<String>,
    options: SimpleFileOptions,
}

impl ArchiveWriter {
    /// Create (or truncate) the archive at `path`.
    pub fn create(path: &Path) -> Result<Self, ArchiveError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        debug!("opened archive {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            zip: ZipWriter::new(file),
            names: HashSet::new(),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry_count(&self) -> usize {
        self.names.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn write_entry(&mut self, entry: &Entry) -> Result<WriteOutcome, ArchiveError> {
        match &entry.content {
            EntryContent::Bytes(data) => self.write_bytes(&entry.name, data),
            EntryContent::File(path) => self.write_file(&entry.name, path),
            EntryContent::Directory => self.write_directory(&entry.name),
        }
    }

    pub fn write_entries(&mut self, entries: &[Entry]) -> Result<usize, ArchiveError> {
        let mut written = 0;
        for entry in entries {
            if self.write_entry(entry)? == WriteOutcome::Written {
                written += 1;
            }
        }
        Ok(written)
    }

    pub fn write_bytes(&mut self, name: &str, data: &[u8]) -> Result<WriteOutcome, ArchiveError> {
        if !self.claim(name) {
            return Ok(WriteOutcome::Duplicate);
        }
        self.zip.start_file(name, self.options)?;
        self.zip.write_all(data)?;
        trace!("wrote {name} ({} bytes)", data.len());
        Ok(WriteOutcome::Written)
    }

    /// Stream a file from disk. The source is opened before the entry is
    /// started so a missing file leaves the archive untouched.
    pub fn write_file(&mut self, name: &str, source: &Path) -> Result<WriteOutcome, ArchiveError> {
        if self.names.contains(name) {
            debug!("duplicate entry {name}, keeping first");
            return Ok(WriteOutcome::Duplicate);
        }
        let mut file = File::open(source).map_err(|e| ArchiveError::ReadSource {
            path: source.to_path_buf(),
            source: e,
        })?;
        self.names.insert(name.to_owned());
        self.zip.start_file(name, self.options)?;
        let n = io::copy(&mut file, &mut self.zip)?;
        trace!("wrote {name} from {} ({n} bytes)", source.display());
        Ok(WriteOutcome::Written)
    }

    pub fn write_directory(&mut self, name: &str) -> Result<WriteOutcome, ArchiveError> {
        let name = if name.ends_with('/') {
            name.to_owned()
        } else {
            format!("{name}/")
        };
        if !self.claim(&name) {
            return Ok(WriteOutcome::Duplicate);
        }
        self.zip.add_directory(name.as_str(), self.options)?;
        Ok(WriteOutcome::Written)
    }

    /// Finish the central directory and close the file.
    pub fn finish(self) -> Result<PathBuf, ArchiveError> {
        let mut file = self.zip.finish()?;
        file.flush()?;
        debug!(
            "closed archive {} ({} entries)",
            self.path.display(),
            self.names.len()
        );
        Ok(self.path)
    }

    /// Close and delete an archive that could not be completed.
    pub fn abandon(self) {
        let Self { path, zip, .. } = self;
        drop(zip);
        match fs::remove_file(&path) {
            Ok(()) => debug!("removed incomplete archive {}", path.display()),
            Err(e) => debug!("could not remove incomplete archive {}: {e}", path.display()),
        }
    }

    fn claim(&mut self, name: &str) -> bool {
        if self.names.insert(name.to_owned()) {
            true
        } else {
            debug!("duplicate entry {name}, keeping first");
            false
        }
    }
}
