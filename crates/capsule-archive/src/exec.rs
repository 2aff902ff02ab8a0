use crate::ArchiveError;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Shell prefix for a directly executable capsule.
pub const EXEC_PREFIX: &str = "#!/bin/sh\n\nexec java -jar \"$0\" \"$@\"\n\n";

/// Shell prefix that launches the capsule in trampoline mode.
pub const EXEC_TRAMPOLINE_PREFIX: &str =
    "#!/bin/sh\n\nexec java -Dcapsule.trampoline -jar \"$0\" \"$@\"\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecKind {
    Plain,
    Trampoline,
}

impl ExecKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Plain => EXEC_PREFIX,
            Self::Trampoline => EXEC_TRAMPOLINE_PREFIX,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Plain => "x",
            Self::Trampoline => "tx",
        }
    }
}

/// Write `{archive stem}.{x|tx}`: the shell prefix followed by the archive bytes.
///
/// The copy is staged in a temp file next to the archive and renamed into
/// place once complete, then marked executable.
pub fn make_executable(archive: &Path, kind: ExecKind) -> Result<PathBuf, ArchiveError> {
    let target = archive.with_extension(kind.extension());
    let dir = archive.parent().unwrap_or(Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(kind.prefix().as_bytes())?;
    let mut src = File::open(archive).map_err(|e| ArchiveError::ReadSource {
        path: archive.to_path_buf(),
        source: e,
    })?;
    io::copy(&mut src, &mut tmp)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&target).map_err(|e| ArchiveError::Io(e.error))?;

    set_executable(&target)?;
    info!(
        "created {}",
        target.file_name().unwrap_or_default().to_string_lossy()
    );
    Ok(target)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<(), ArchiveError> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(path: &Path) -> Result<(), ArchiveError> {
    fs::metadata(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_archive(dir: &Path) -> PathBuf {
        let path = dir.join("app-capsule-fat.jar");
        fs::write(&path, [0x50u8, 0x4b, 0x03, 0x04, 1, 2, 3]).unwrap();
        path
    }

    #[test]
    fn plain_copy_has_prefix_and_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let jar = fake_archive(dir.path());
        let x = make_executable(&jar, ExecKind::Plain).unwrap();
        assert_eq!(x, dir.path().join("app-capsule-fat.x"));

        let data = fs::read(&x).unwrap();
        assert!(data.starts_with(EXEC_PREFIX.as_bytes()));
        assert_eq!(&data[EXEC_PREFIX.len()..], fs::read(&jar).unwrap().as_slice());
    }

    #[test]
    fn trampoline_copy_uses_trampoline_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let jar = fake_archive(dir.path());
        let tx = make_executable(&jar, ExecKind::Trampoline).unwrap();
        assert_eq!(tx.extension().unwrap(), "tx");
        let data = fs::read(&tx).unwrap();
        assert!(data.starts_with(b"#!/bin/sh\n\nexec java -Dcapsule.trampoline -jar"));
        assert_eq!(
            &data[EXEC_TRAMPOLINE_PREFIX.len()..],
            fs::read(&jar).unwrap().as_slice()
        );
    }

    #[cfg(unix)]
    #[test]
    fn copy_is_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let jar = fake_archive(dir.path());
        let x = make_executable(&jar, ExecKind::Plain).unwrap();
        let mode = fs::metadata(&x).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn missing_archive_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = make_executable(&dir.path().join("nope.jar"), ExecKind::Plain);
        assert!(result.is_err());
        assert!(!dir.path().join("nope.x").exists());
    }

    #[test]
    fn rerun_overwrites_existing_copy() {
        let dir = tempfile::tempdir().unwrap();
        let jar = fake_archive(dir.path());
        make_executable(&jar, ExecKind::Plain).unwrap();
        fs::write(&jar, b"changed").unwrap();
        let x = make_executable(&jar, ExecKind::Plain).unwrap();
        assert!(fs::read(&x).unwrap().ends_with(b"changed"));
    }
}
