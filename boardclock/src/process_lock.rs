//! One boardclock-sync per database.
//!
//! A sync replaces whole boards inside transactions; a second writer on the
//! same cache would only redo the same tracker requests. The lock is an
//! advisory flock on `$XDG_RUNTIME_DIR/boardclock/sync-<hash>.lock`, where the
//! hash is taken over the resolved database path, so `./data.db` and its
//! absolute spelling share a lock while different databases do not.
//!
//! The lock file holds the owner's pid so a refused run can name it.

use anyhow::{Context, Result};
use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

/// Held for the lifetime of a boardclock-sync process.
pub struct SyncProcessGuard {
    file: File,
    path: PathBuf,
}

impl Drop for SyncProcessGuard {
    fn drop(&mut self) {
        let _ = flock_file(&self.file, LOCK_UN);
        let _ = fs::remove_file(&self.path);
    }
}

/// Take the sync lock for `db_path`, or fail naming the current owner.
pub fn acquire_sync_guard(db_path: &Path) -> Result<SyncProcessGuard> {
    let dir = lock_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create lock directory: {}", dir.display()))?;

    let path = dir.join(lock_file_name(db_path));
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .with_context(|| format!("failed to open lock file: {}", path.display()))?;

    match flock_file(&file, LOCK_EX | LOCK_NB) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
            let owner = read_owner(&mut file)
                .map(|pid| format!(" (pid {pid})"))
                .unwrap_or_default();
            anyhow::bail!(
                "another boardclock-sync{owner} is already syncing {}",
                db_path.display()
            );
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to lock {}", path.display()));
        }
    }

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()?;

    tracing::debug!(lock = %path.display(), "Acquired sync lock");
    Ok(SyncProcessGuard { file, path })
}

fn lock_dir() -> PathBuf {
    let base = match std::env::var_os("XDG_RUNTIME_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir(),
    };
    base.join("boardclock")
}

/// The database file may not exist before the first sync, so its parent
/// directory is resolved instead.
fn resolved(db_path: &Path) -> PathBuf {
    let parent = db_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match (fs::canonicalize(parent), db_path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => db_path.to_path_buf(),
    }
}

fn lock_file_name(db_path: &Path) -> String {
    let mut hasher = DefaultHasher::new();
    resolved(db_path).hash(&mut hasher);
    format!("sync-{:016x}.lock", hasher.finish())
}

fn read_owner(file: &mut File) -> Option<u32> {
    let mut content = String::new();
    file.seek(SeekFrom::Start(0)).ok()?;
    file.read_to_string(&mut content).ok()?;
    content.trim().parse().ok()
}

const LOCK_EX: i32 = 2;
const LOCK_NB: i32 = 4;
const LOCK_UN: i32 = 8;

#[cfg(unix)]
fn flock_file(file: &File, operation: i32) -> io::Result<()> {
    extern "C" {
        fn flock(fd: i32, operation: i32) -> i32;
    }

    // SAFETY: the descriptor stays open for the duration of the call.
    let rc = unsafe { flock(file.as_raw_fd(), operation) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
compile_error!("boardclock-sync process locks require a Unix flock");
