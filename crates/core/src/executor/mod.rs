//! Hosted execution of single stages.
//!
//! A [`StageExecutor`] runs one coordinator compile on a background task
//! while the calling host waits its own way: a headless host simply awaits
//! completion, an interactive host keeps servicing its event loop in between
//! completion checks. In both cases `start` does not return until the run is
//! over, its registry entry is gone, and any success callback has fired.

pub mod registry;

use crate::coordinator::{CompileOutcome, PipelineCoordinator};
use async_trait::async_trait;
use fab_protocol::stage_models::{Stage, StageOptions};
use registry::{ExecutorHandle, ExecutorRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info};

/// Invoked after a successful run, before [`StageExecutor::start`] returns.
pub type SuccessCallback = Box<dyn FnOnce(&CompileOutcome) + Send>;

/// How the host rides out an in-flight run.
#[async_trait]
pub trait HostWait: Send + Sync {
    /// Wait for `done` to resolve, servicing the host however it needs.
    async fn wait(&self, done: oneshot::Receiver<CompileOutcome>) -> CompileOutcome;
}

/// Block-until-done host for batch and CLI use.
pub struct Headless;

#[async_trait]
impl HostWait for Headless {
    async fn wait(&self, done: oneshot::Receiver<CompileOutcome>) -> CompileOutcome {
        done.await.unwrap_or_else(|_| {
            error!("stage task dropped without reporting an outcome");
            CompileOutcome::failure()
        })
    }
}

/// Host that keeps pumping a callback while the run is in flight, so an
/// interactive frontend stays responsive.
pub struct EventPump {
    interval: Duration,
    pump: Box<dyn Fn() + Send + Sync>,
}

impl EventPump {
    pub fn new(interval: Duration, pump: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            interval,
            pump: Box::new(pump),
        }
    }
}

#[async_trait]
impl HostWait for EventPump {
    async fn wait(&self, mut done: oneshot::Receiver<CompileOutcome>) -> CompileOutcome {
        let mut tick = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                outcome = &mut done => {
                    return outcome.unwrap_or_else(|_| {
                        error!("stage task dropped without reporting an outcome");
                        CompileOutcome::failure()
                    });
                }
                _ = tick.tick() => (self.pump)(),
            }
        }
    }
}

/// Runs single stages through a coordinator, one at a time, on a background
/// task.
pub struct StageExecutor {
    coordinator: Arc<PipelineCoordinator>,
    registry: Arc<ExecutorRegistry>,
    host: Box<dyn HostWait>,
}

impl StageExecutor {
    pub fn new(
        coordinator: Arc<PipelineCoordinator>,
        registry: Arc<ExecutorRegistry>,
        host: Box<dyn HostWait>,
    ) -> Self {
        Self {
            coordinator,
            registry,
            host,
        }
    }

    /// Run `stage` to completion and return whether it succeeded.
    ///
    /// The run is registered for the duration of the call, so a global stop
    /// issued from another task reaches it. `on_success` fires only after a
    /// successful run, never on failure, and always before this returns.
    pub async fn start(
        &self,
        stage: Stage,
        options: StageOptions,
        on_success: Option<SuccessCallback>,
    ) -> bool {
        let handle = ExecutorHandle::new(stage, self.coordinator.cancel());
        let id = handle.id();
        self.registry.register(handle);
        info!("{stage}: run {id} started");

        let (tx, rx) = oneshot::channel();
        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move {
            let outcome = coordinator.compile(stage, options).await;
            let _ = tx.send(outcome);
        });

        let outcome = self.host.wait(rx).await;
        self.registry.remove(id);
        info!(
            "{stage}: run {id} finished ({})",
            if outcome.ok { "success" } else { "fail" }
        );

        if outcome.ok {
            if let Some(callback) = on_success {
                callback(&outcome);
            }
        }
        outcome.ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{StageContext, StageLogic, StageSet};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FixedResult(bool);

    #[async_trait]
    impl StageLogic for FixedResult {
        async fn run(&self, _ctx: &StageContext) -> bool {
            self.0
        }
    }

    struct SlowLogic;

    #[async_trait]
    impl StageLogic for SlowLogic {
        async fn run(&self, ctx: &StageContext) -> bool {
            for _ in 0..20 {
                if ctx.cancel.is_stop_requested() {
                    return false;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            true
        }
    }

    // Batch has no artifact directory, so these runs never touch the
    // process working directory.
    fn executor(ok: bool, host: Box<dyn HostWait>) -> (StageExecutor, Arc<ExecutorRegistry>) {
        let mut set = StageSet::new();
        set.insert(Stage::Batch, Arc::new(FixedResult(ok)));
        let registry = Arc::new(ExecutorRegistry::new());
        let coordinator = Arc::new(
            PipelineCoordinator::new("/nonexistent", set).with_registry(Arc::clone(&registry)),
        );
        (
            StageExecutor::new(coordinator, Arc::clone(&registry), host),
            registry,
        )
    }

    #[tokio::test]
    async fn test_success_fires_callback_before_return() {
        let (executor, registry) = executor(true, Box::new(Headless));
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let ok = executor
            .start(
                Stage::Batch,
                StageOptions::run(),
                Some(Box::new(move |outcome| {
                    assert!(outcome.ok);
                    flag.store(true, Ordering::SeqCst);
                })),
            )
            .await;

        assert!(ok);
        assert!(fired.load(Ordering::SeqCst));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_failure_skips_callback() {
        let (executor, registry) = executor(false, Box::new(Headless));
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let ok = executor
            .start(
                Stage::Batch,
                StageOptions::run(),
                Some(Box::new(move |_| flag.store(true, Ordering::SeqCst))),
            )
            .await;

        assert!(!ok);
        assert!(!fired.load(Ordering::SeqCst));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_event_pump_keeps_ticking_while_running() {
        let mut set = StageSet::new();
        set.insert(Stage::Batch, Arc::new(SlowLogic));
        let registry = Arc::new(ExecutorRegistry::new());
        let coordinator = Arc::new(
            PipelineCoordinator::new("/nonexistent", set).with_registry(Arc::clone(&registry)),
        );

        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let host = EventPump::new(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let executor = StageExecutor::new(coordinator, registry, Box::new(host));

        let ok = executor.start(Stage::Batch, StageOptions::run(), None).await;

        assert!(ok);
        assert!(ticks.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_stop_reaches_registered_run() {
        let mut set = StageSet::new();
        set.insert(Stage::Batch, Arc::new(SlowLogic));
        let registry = Arc::new(ExecutorRegistry::new());
        let coordinator = Arc::new(
            PipelineCoordinator::new("/nonexistent", set).with_registry(Arc::clone(&registry)),
        );
        let stopper = Arc::clone(&coordinator);
        let executor = StageExecutor::new(coordinator, registry, Box::new(Headless));

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            stopper.stop();
        });

        let ok = executor.start(Stage::Batch, StageOptions::run(), None).await;
        assert!(!ok);
    }
}
