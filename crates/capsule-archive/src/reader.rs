use crate::exec::{EXEC_PREFIX, EXEC_TRAMPOLINE_PREFIX};
use crate::manifest::{Manifest, MANIFEST_PATH};
use crate::ArchiveError;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

/// Read-only view of a capsule archive.
///
/// Accepts plain archives as well as the shell-prefixed `.x`/`.tx` copies;
/// the prefix is stripped before the zip structure is read.
pub struct ArchiveReader {
    zip: ZipArchive<Cursor<Vec<u8>>>,
    prefix: Option<&'static str>,
}

impl ArchiveReader {
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let mut data = fs::read(path).map_err(|e| ArchiveError::ReadSource {
            path: path.to_path_buf(),
            source: e,
        })?;
        let prefix = [EXEC_PREFIX, EXEC_TRAMPOLINE_PREFIX]
            .into_iter()
            .find(|p| data.starts_with(p.as_bytes()));
        if let Some(p) = prefix {
            data.drain(..p.len());
        }
        Ok(Self {
            zip: ZipArchive::new(Cursor::new(data))?,
            prefix,
        })
    }

    /// The shell prefix the file started with, if any.
    pub fn exec_prefix(&self) -> Option<&'static str> {
        self.prefix
    }

    pub fn len(&self) -> usize {
        self.zip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zip.len() == 0
    }

    /// Entry names in archive order.
    pub fn entry_names(&mut self) -> Result<Vec<String>, ArchiveError> {
        let mut names = Vec::with_capacity(self.zip.len());
        for i in 0..self.zip.len() {
            names.push(self.zip.by_index(i)?.name().to_owned());
        }
        Ok(names)
    }

    pub fn read(&mut self, name: &str) -> Result<Option<Vec<u8>>, ArchiveError> {
        let mut entry = match self.zip.by_name(name) {
            Ok(e) => e,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        Ok(Some(data))
    }

    /// Parse the manifest entry, if the archive has one.
    pub fn manifest(&mut self) -> Result<Option<Manifest>, ArchiveError> {
        match self.read(MANIFEST_PATH)? {
            Some(bytes) => Ok(Some(Manifest::parse(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{make_executable, ExecKind};
    use crate::writer::ArchiveWriter;

    fn sample_archive(path: &Path) {
        let mut m = Manifest::new();
        m.main_mut().insert("Manifest-Version", "1.0").unwrap();
        m.main_mut().insert("Main-Class", "Capsule").unwrap();
        let mut w = ArchiveWriter::create(path).unwrap();
        w.write_bytes(MANIFEST_PATH, &m.to_bytes()).unwrap();
        w.write_bytes("Capsule.class", b"launcher").unwrap();
        w.finish().unwrap();
    }

    #[test]
    fn reads_plain_archive() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("a.jar");
        sample_archive(&jar);

        let mut r = ArchiveReader::open(&jar).unwrap();
        assert!(r.exec_prefix().is_none());
        assert_eq!(r.len(), 2);
        assert_eq!(
            r.entry_names().unwrap(),
            vec![MANIFEST_PATH, "Capsule.class"]
        );
        let manifest = r.manifest().unwrap().unwrap();
        assert_eq!(manifest.main().get("Main-Class"), Some("Capsule"));
    }

    #[test]
    fn reads_trampoline_copy() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("a.jar");
        sample_archive(&jar);
        let tx = make_executable(&jar, ExecKind::Trampoline).unwrap();

        let mut r = ArchiveReader::open(&tx).unwrap();
        assert_eq!(r.exec_prefix(), Some(EXEC_TRAMPOLINE_PREFIX));
        assert_eq!(r.read("Capsule.class").unwrap().unwrap(), b"launcher");
    }

    #[test]
    fn archive_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("bare.jar");
        let mut w = ArchiveWriter::create(&jar).unwrap();
        w.write_bytes("x", b"y").unwrap();
        w.finish().unwrap();
        assert!(ArchiveReader::open(&jar).unwrap().manifest().unwrap().is_none());
    }

    #[test]
    fn non_archive_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let junk = dir.path().join("junk.jar");
        fs::write(&junk, b"definitely not a zip").unwrap();
        assert!(ArchiveReader::open(&junk).is_err());
    }
}
