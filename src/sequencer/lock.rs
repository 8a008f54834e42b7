use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use daopub_common::error::IoResultExt;
use daopub_common::paths::lock_file_for;
use daopub_common::{Error, Result};
use fs2::FileExt;

/// Advisory lock on a component directory, released on drop.
///
/// The sequencer holds it exclusively while renumbering; the publishing
/// pipeline holds it shared while tools read the images. The lock file is a
/// hidden sibling of the directory, so it never shows up as an image in the
/// sequence nor as a component during discovery.
#[derive(Debug)]
pub struct DirectoryLock {
    file: File,
    path: PathBuf,
}

impl DirectoryLock {
    /// Block until the exclusive lock on `dir` is held.
    pub fn exclusive(dir: &Path) -> Result<Self> {
        let lock = Self::open(dir)?;
        FileExt::lock_exclusive(&lock.file).at_path(&lock.path)?;
        Ok(lock)
    }

    /// Block until a shared lock on `dir` is held.
    pub fn shared(dir: &Path) -> Result<Self> {
        let lock = Self::open(dir)?;
        FileExt::lock_shared(&lock.file).at_path(&lock.path)?;
        Ok(lock)
    }

    /// Take a shared lock on `dir` if no writer holds it.
    pub fn try_shared(dir: &Path) -> Result<Option<Self>> {
        let lock = Self::open(dir)?;
        match FileExt::try_lock_shared(&lock.file) {
            Ok(()) => Ok(Some(lock)),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(Error::fs(&lock.path, e)),
        }
    }

    fn open(dir: &Path) -> Result<Self> {
        let path = lock_file_for(dir);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .at_path(&path)?;
        Ok(Self { file, path })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
