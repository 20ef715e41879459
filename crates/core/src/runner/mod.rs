//! Supervised external tool invocation.
//!
//! [`ProcessRunner`] spawns one external command at a time, streams its
//! output to the parent's stdout/stderr (optionally duplicated to a log
//! file), samples the child's resident memory while it runs, and returns the
//! child's exit code. A stop request terminates the child; a sticky error set
//! before the call makes the call refuse to run at all.

pub mod monitor;
pub mod tokenize;

use crate::cancel::CancelState;
use fab_protocol::flow_models::UtilizationSample;
use monitor::spawn_memory_monitor;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::Mutex as AsyncMutex;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tokenize::split_command_line;
use tracing::{debug, error, info, warn};

/// Exit code reported when the child did not terminate normally, when the
/// spawn failed, or when a pre-flight sticky error refused the run.
pub const ABNORMAL_EXIT: i32 = -1;

/// One external command invocation.
///
/// The command line is a single pre-joined string; double-quoted substrings
/// that span whitespace are honored during tokenization.
#[derive(Debug, Clone, Default)]
pub struct RunSpec {
    /// Program plus arguments as one string, e.g. `yosys -p "synth -top t"`.
    pub command_line: String,

    /// Working directory for the child (created if missing). The parent's
    /// working directory is never changed by the call.
    pub working_dir: Option<PathBuf>,

    /// Duplicate the child's output to this file.
    pub log_file: Option<PathBuf>,

    /// Append to `log_file` instead of truncating it.
    pub append_log: bool,

    /// Extra environment variables overlaid on the inherited environment.
    pub env: Vec<(String, String)>,
}

impl RunSpec {
    /// Spec for `command_line` with defaults for everything else.
    pub fn new(command_line: impl Into<String>) -> Self {
        Self {
            command_line: command_line.into(),
            ..Self::default()
        }
    }

    /// Run the child in `dir`.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Duplicate output to `path`, truncating unless [`RunSpec::appending`].
    pub fn log_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Append to the log file instead of truncating it.
    pub fn appending(mut self) -> Self {
        self.append_log = true;
        self
    }

    /// Add one environment overlay entry.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Spawns and monitors external toolchain commands.
///
/// The runner shares the pipeline's [`CancelState`]: a stop request while a
/// child is running terminates the child, and a sticky error set by a
/// collaborator fails the next invocation before anything is spawned. The
/// utilization of the most recent invocation is retained for the coordinator
/// to collect after the stage finishes.
pub struct ProcessRunner {
    cancel: Arc<CancelState>,
    monitor_interval: Duration,
    last_utilization: Mutex<Option<UtilizationSample>>,
}

impl ProcessRunner {
    /// Create a runner bound to the given cancellation state.
    pub fn new(cancel: Arc<CancelState>) -> Self {
        Self {
            cancel,
            monitor_interval: monitor::DEFAULT_INTERVAL,
            last_utilization: Mutex::new(None),
        }
    }

    /// Override the memory sampling interval.
    pub fn with_monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = interval;
        self
    }

    /// Drop any retained utilization sample.
    ///
    /// Called by the coordinator at the start of every compile call.
    pub fn reset_utilization(&self) {
        if let Ok(mut guard) = self.last_utilization.lock() {
            *guard = None;
        }
    }

    /// Utilization of the most recent invocation, if any completed since the
    /// last reset. Within one compile call the last writer wins.
    pub fn last_utilization(&self) -> Option<UtilizationSample> {
        self.last_utilization.lock().ok().and_then(|guard| *guard)
    }

    /// Execute one command and wait for it to exit.
    ///
    /// Returns the child's exit code on normal termination, or
    /// [`ABNORMAL_EXIT`] when the spawn failed, the child was terminated by a
    /// stop request or a signal, or a sticky error refused the run. The
    /// sticky error is consumed as part of refusing.
    pub async fn run(&self, spec: &RunSpec) -> i32 {
        if let Some(message) = self.cancel.take_error() {
            error!("refusing to run command: {message}");
            return ABNORMAL_EXIT;
        }

        let Some((program, args)) = split_command_line(&spec.command_line) else {
            error!("cannot run an empty command line");
            return ABNORMAL_EXIT;
        };

        info!(command = %spec.command_line, "running");
        let started = Instant::now();

        let mut command = Command::new(&program);
        command.args(&args);
        for (key, value) in &spec.env {
            command.env(key, value);
        }
        if let Some(dir) = &spec.working_dir {
            if let Err(err) = std::fs::create_dir_all(dir) {
                warn!("failed to create working directory {}: {err}", dir.display());
            }
            command.current_dir(dir);
        }
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        command.kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                error!("failed to spawn '{program}': {err}");
                return ABNORMAL_EXIT;
            }
        };

        let log = match open_log(spec).await {
            Ok(log) => log,
            Err(err) => {
                warn!("failed to open log file: {err}");
                None
            }
        };

        let peak = Arc::new(AtomicU64::new(0));
        let sampler = child
            .id()
            .map(|pid| spawn_memory_monitor(pid, self.monitor_interval, Arc::clone(&peak)));

        let stdout_task = child
            .stdout
            .take()
            .map(|out| tokio::spawn(tee_lines(out, TeeTarget::Stdout, log.clone())));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(tee_lines(err, TeeTarget::Stderr, log)));

        let status = tokio::select! {
            status = child.wait() => status.ok(),
            _ = self.cancel.stopped() => {
                warn!("stop requested, terminating '{program}'");
                let _ = child.start_kill();
                let _ = child.wait().await;
                None
            }
        };

        // Output tasks finish at pipe EOF once the child is gone.
        if let Some(task) = stdout_task {
            let _ = task.await;
        }
        if let Some(task) = stderr_task {
            let _ = task.await;
        }
        if let Some(handle) = sampler {
            handle.abort();
        }

        let sample = UtilizationSample {
            peak_memory_bytes: peak.load(Ordering::Relaxed),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        debug!(
            duration_ms = sample.duration_ms,
            peak_memory_bytes = sample.peak_memory_bytes,
            "command finished"
        );
        if let Ok(mut guard) = self.last_utilization.lock() {
            *guard = Some(sample);
        }

        match status {
            Some(status) => status.code().unwrap_or(ABNORMAL_EXIT),
            None => ABNORMAL_EXIT,
        }
    }
}

type SharedLog = Arc<AsyncMutex<tokio::fs::File>>;

async fn open_log(spec: &RunSpec) -> std::io::Result<Option<SharedLog>> {
    let Some(path) = &spec.log_file else {
        return Ok(None);
    };
    let mut options = tokio::fs::OpenOptions::new();
    options.create(true).write(true);
    if spec.append_log {
        options.append(true);
    } else {
        options.truncate(true);
    }
    let file = options.open(path).await?;
    Ok(Some(Arc::new(AsyncMutex::new(file))))
}

enum TeeTarget {
    Stdout,
    Stderr,
}

/// Forward one child stream line-wise to the parent's own stream, duplicating
/// each line to the shared log file when one is open.
async fn tee_lines<R>(source: R, target: TeeTarget, log: Option<SharedLog>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let reader = BufReader::new(source);
    let mut lines = LinesStream::new(reader.lines());
    while let Some(line) = lines.next().await {
        let Ok(line) = line else { break };
        match target {
            TeeTarget::Stdout => println!("{line}"),
            TeeTarget::Stderr => eprintln!("{line}"),
        }
        if let Some(log) = &log {
            let mut file = log.lock().await;
            let _ = file.write_all(line.as_bytes()).await;
            let _ = file.write_all(b"\n").await;
        }
    }
    // tokio's File buffers writes; flush before the handle is dropped so the
    // log is complete once this task finishes.
    if let Some(log) = &log {
        let mut file = log.lock().await;
        let _ = file.flush().await;
    }
}
