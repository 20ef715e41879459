//! Scoped working-directory guard.
//!
//! The process working directory is shared, global, mutable state. Every
//! switch into a stage's artifact directory goes through [`DirScope`], whose
//! drop restores the previous directory on every exit path, including early
//! and erroring returns.

use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// RAII guard for a working-directory switch.
///
/// Created by [`DirScope::enter`]; dropping it restores the directory that
/// was current at creation time.
#[derive(Debug)]
pub struct DirScope {
    previous: PathBuf,
}

impl DirScope {
    /// Record the current directory and switch into `dir`.
    pub fn enter(dir: &Path) -> io::Result<Self> {
        let previous = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        Ok(Self { previous })
    }

    /// The directory this guard will restore.
    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for DirScope {
    fn drop(&mut self) {
        if let Err(err) = std::env::set_current_dir(&self.previous) {
            warn!(
                "failed to restore working directory to {}: {err}",
                self.previous.display()
            );
        }
    }
}

/// Serializes tests that touch the process working directory.
#[cfg(test)]
pub(crate) static CWD_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
pub(crate) fn lock_cwd_for_test() -> std::sync::MutexGuard<'static, ()> {
    CWD_TEST_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
