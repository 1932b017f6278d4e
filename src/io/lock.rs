use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

/// Advisory lock held around a load-modify-save of one state file.
///
/// Uses flock on `<state file>.lock`, so concurrent `tt` invocations
/// against the same file take turns.
pub struct FileLock {
    _file: File,
    path: PathBuf,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not acquire lock on {path}: another tt process may be writing")]
    Timeout { path: PathBuf },
}

/// Lock file guarding `data_file`
pub fn lock_path_for(data_file: &Path) -> PathBuf {
    let mut name = data_file
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("tasks"));
    name.push(".lock");
    data_file.with_file_name(name)
}

impl FileLock {
    /// Lock `data_file`, waiting up to `timeout`.
    pub fn acquire(data_file: &Path, timeout: Duration) -> Result<Self, LockError> {
        let lock_path = lock_path_for(data_file);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| LockError::CreateError {
                path: lock_path.clone(),
                source: e,
            })?;

        let start = Instant::now();
        loop {
            match try_lock(&file) {
                Ok(()) => {
                    debug!(path = %lock_path.display(), "lock acquired");
                    return Ok(FileLock {
                        _file: file,
                        path: lock_path,
                    });
                }
                Err(e) if start.elapsed() < timeout => {
                    trace!(error = %e, "lock busy, retrying");
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(_) => {
                    return Err(LockError::Timeout { path: lock_path });
                }
            }
        }
    }

    /// Acquire with default timeout (5 seconds)
    pub fn acquire_default(data_file: &Path) -> Result<Self, LockError> {
        Self::acquire(data_file, Duration::from_secs(5))
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // flock goes with the descriptor. The file stays: removing it would
        // let a waiter and a newcomer lock two different inodes.
        trace!(path = %self.path.display(), "lock released");
    }
}

/// Try to acquire an exclusive flock on the file (non-blocking)
#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_path_sits_next_to_data_file() {
        assert_eq!(
            lock_path_for(Path::new("/work/tasks.xml")),
            PathBuf::from("/work/tasks.xml.lock")
        );
    }

    #[test]
    fn test_acquire_and_release_lock() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("tasks.xml");

        let lock = FileLock::acquire_default(&data);
        assert!(lock.is_ok());
        assert!(lock_path_for(&data).exists());
        drop(lock);

        let lock2 = FileLock::acquire_default(&data);
        assert!(lock2.is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_lock_contention() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("tasks.xml");

        let _lock1 = FileLock::acquire_default(&data).unwrap();
        let lock2 = FileLock::acquire(&data, Duration::from_millis(50));
        assert!(matches!(lock2, Err(LockError::Timeout { .. })));
    }
}
