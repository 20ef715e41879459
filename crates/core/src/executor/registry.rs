//! Bookkeeping for in-flight stage executors.
//!
//! Every [`StageExecutor::start`](crate::executor::StageExecutor::start) call
//! registers a handle here before spawning its work and removes it once the
//! work has finished, so a global stop can reach every run that is currently
//! alive. The registry only signals; it never waits for anything to exit.

use crate::cancel::CancelState;
use fab_protocol::stage_models::Stage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;
use uuid::Uuid;

/// One live stage run.
#[derive(Clone)]
pub struct ExecutorHandle {
    id: Uuid,
    stage: Stage,
    running: Arc<AtomicBool>,
    cancel: Arc<CancelState>,
}

impl ExecutorHandle {
    pub fn new(stage: Stage, cancel: Arc<CancelState>) -> Self {
        Self {
            id: Uuid::new_v4(),
            stage,
            running: Arc::new(AtomicBool::new(true)),
            cancel,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Whether the run is still in flight. Cleared when the run is removed
    /// from the registry; a clone held past that point observes the change.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask this run to stop. Signal only; returns immediately.
    pub fn signal_stop(&self) {
        self.cancel.request_stop();
    }
}

/// Live executors, keyed by run id.
#[derive(Default)]
pub struct ExecutorRegistry {
    handles: Mutex<HashMap<Uuid, ExecutorHandle>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a run until [`ExecutorRegistry::remove`] is called with its id.
    pub fn register(&self, handle: ExecutorHandle) {
        if let Ok(mut handles) = self.handles.lock() {
            handles.insert(handle.id(), handle);
        }
    }

    /// Stop tracking the run with `id`, marking it finished.
    pub fn remove(&self, id: Uuid) -> Option<ExecutorHandle> {
        let handle = self.handles.lock().ok().and_then(|mut map| map.remove(&id))?;
        handle.running.store(false, Ordering::SeqCst);
        Some(handle)
    }

    /// Number of runs currently alive.
    pub fn len(&self) -> usize {
        self.handles.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signal every live run to stop.
    pub fn stop_all(&self) {
        let Ok(handles) = self.handles.lock() else {
            return;
        };
        for handle in handles.values() {
            warn!("stopping {} run {}", handle.stage(), handle.id());
            handle.signal_stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(stage: Stage) -> (ExecutorHandle, Arc<CancelState>) {
        let cancel = Arc::new(CancelState::new());
        (ExecutorHandle::new(stage, Arc::clone(&cancel)), cancel)
    }

    #[test]
    fn test_register_and_remove() {
        let registry = ExecutorRegistry::new();
        let (h, _) = handle(Stage::Synthesize);
        let id = h.id();

        registry.register(h);
        assert_eq!(registry.len(), 1);

        let removed = registry.remove(id).unwrap();
        assert_eq!(removed.stage(), Stage::Synthesize);
        assert!(!removed.is_running());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_unknown_id_is_none() {
        let registry = ExecutorRegistry::new();
        assert!(registry.remove(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_stop_all_signals_every_handle() {
        let registry = ExecutorRegistry::new();
        let (h1, c1) = handle(Stage::Synthesize);
        let (h2, c2) = handle(Stage::Route);
        registry.register(h1);
        registry.register(h2);

        registry.stop_all();

        assert!(c1.is_stop_requested());
        assert!(c2.is_stop_requested());
        // Handles stay registered; the runs remove themselves when they exit.
        assert_eq!(registry.len(), 2);
    }
}
