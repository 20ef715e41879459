//! Common test utilities for the end-to-end flow tests.

pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::*;

use std::sync::Mutex;

/// Compiling a stage switches the process working directory, which is global
/// state; tests that drive real compiles take this lock.
static CWD_LOCK: Mutex<()> = Mutex::new(());

pub fn serialize_cwd() -> std::sync::MutexGuard<'static, ()> {
    CWD_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
