use crate::CoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lock file created inside the output directory while a build runs.
pub const LOCK_FILE_NAME: &str = ".capsule.lock";

/// Exclusive advisory lock on an output directory.
///
/// Held for the whole build so two invocations never interleave writes into
/// the same directory. Released on drop.
pub struct OutputLock {
    lock_file: File,
    path: PathBuf,
}

impl OutputLock {
    pub fn acquire(output_dir: &Path) -> Result<Self, CoreError> {
        let (file, path) = open_lock_file(output_dir)?;
        file.lock_exclusive()
            .map_err(|e| CoreError::Io(std::io::Error::new(std::io::ErrorKind::WouldBlock, e)))?;
        debug!("acquired output lock {}", path.display());
        Ok(Self {
            lock_file: file,
            path,
        })
    }

    /// Take the lock without waiting; `None` when another build holds it.
    pub fn try_acquire(output_dir: &Path) -> Result<Option<Self>, CoreError> {
        let (file, path) = open_lock_file(output_dir)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                lock_file: file,
                path,
            })),
            Err(_) => Ok(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_lock_file(output_dir: &Path) -> Result<(File, PathBuf), CoreError> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(LOCK_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&path)?;
    Ok((file, path))
}

impl Drop for OutputLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}
