use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;

/// A held exclusive lock. Dropping it releases the lock.
pub struct LockGuard {
    name: String,
    _held: Box<dyn Send + Sync>,
}

impl LockGuard {
    pub fn new(name: impl Into<String>, held: impl Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            _held: Box::new(held),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("name", &self.name).finish()
    }
}

/// Named, process-wide exclusive lock
pub trait ExclusiveLock: Send + Sync {
    /// `Ok(None)` means another holder has the lock. `Err` is reserved for
    /// failures that say nothing about other holders.
    fn try_acquire(&self, name: &str) -> io::Result<Option<LockGuard>>;
}

/// Advisory `flock` on `{dir}/{name}.lock`. The OS drops it when the
/// holding process exits, so a crash never leaves a stale lock behind.
#[derive(Debug, Clone)]
pub struct FileLock {
    dir: PathBuf,
}

impl FileLock {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.lock"))
    }
}

struct HeldFile {
    file: File,
    path: PathBuf,
}

impl Drop for HeldFile {
    fn drop(&mut self) {
        // The file itself stays; removing it would race with the next locker
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!("failed to unlock {}: {e}", self.path.display());
        }
    }
}

impl ExclusiveLock for FileLock {
    fn try_acquire(&self, name: &str) -> io::Result<Option<LockGuard>> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(name);
        let file = open_lock_file(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                log::debug!("acquired {}", path.display());
                Ok(Some(LockGuard::new(name, HeldFile { file, path })))
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn open_lock_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
}
