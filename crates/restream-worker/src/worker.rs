//! A worker supervises the transcoder of one stream.
//!
//! Lifecycle: `Starting -> Running -> FailedRetry -> Running -> ... -> Stopped`.
//!
//! Every launch and every post-exit decision happens inside the worker's
//! critical section, and `stop` sets the manual-stop flag and kills the
//! current process group inside that same section. A crash racing a stop
//! therefore either sees the flag and exits, or has already published the
//! group that `stop` then kills. No process outlives `stop`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use restream_media::{spawn_in_group, HlsOutput, ProcessGroup, Transcoder};
use restream_models::{SourceList, StreamKey, WorkerSnapshot, WorkerState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::ChildStderr;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, Instrument};

use crate::logging::{describe_exit, WorkerLogger};
use crate::metrics;
use crate::retry::{FailureTracker, FallbackPolicy, FallbackStep};

/// Mutable worker state, guarded by the worker lock.
#[derive(Debug)]
struct WorkerInner {
    index: usize,
    manual_stop: bool,
    group: Option<ProcessGroup>,
    state: WorkerState,
    launches: u64,
}

/// Supervisor of a single stream's transcoder.
pub struct Worker {
    key: StreamKey,
    sources: SourceList,
    output: HlsOutput,
    policy: FallbackPolicy,
    crash_log_limit: u32,
    logger: WorkerLogger,
    inner: Mutex<WorkerInner>,
    stop_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
    created_at: DateTime<Utc>,
}

impl Worker {
    pub fn new(
        sources: SourceList,
        output: HlsOutput,
        policy: FallbackPolicy,
        crash_log_limit: u32,
    ) -> Self {
        let key = sources.key();
        let (stop_tx, _) = watch::channel(false);
        Self {
            logger: WorkerLogger::new(&key),
            key,
            sources,
            output,
            policy,
            crash_log_limit,
            inner: Mutex::new(WorkerInner {
                index: 0,
                manual_stop: false,
                group: None,
                state: WorkerState::Starting,
                launches: 0,
            }),
            stop_tx,
            task: Mutex::new(None),
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> &StreamKey {
        &self.key
    }

    pub fn output(&self) -> &HlsOutput {
        &self.output
    }

    /// Start the supervision task.
    ///
    /// Calling this more than once has no effect.
    pub async fn start(self: &Arc<Self>, transcoder: Arc<dyn Transcoder>) {
        let mut task = self.task.lock().await;
        if task.is_some() || self.is_stopped().await {
            return;
        }

        let span = self.logger.create_span();
        let worker = Arc::clone(self);
        *task = Some(tokio::spawn(
            async move { worker.supervise(transcoder).await }.instrument(span),
        ));
    }

    /// Stop the worker and kill its transcoder's process group.
    ///
    /// Returns once the supervision task has finished, so no transcoder for
    /// this worker is running or will be launched afterwards. Idempotent.
    pub async fn stop(&self) {
        {
            let mut inner = self.inner.lock().await;
            if inner.manual_stop {
                return;
            }
            inner.manual_stop = true;
            if let Some(group) = inner.group.take() {
                if let Err(e) = group.terminate() {
                    self.logger
                        .log_warning(&format!("Failed to kill process group: {}", e));
                }
            }
            inner.state = WorkerState::Stopped;
        }

        self.stop_tx.send_replace(true);

        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(stream_key = %self.key, "Supervision task failed: {}", e);
            }
        }

        metrics::record_stop();
        self.logger.log_stop();
    }

    /// Whether `stop` has been called.
    pub async fn is_stopped(&self) -> bool {
        self.inner.lock().await.manual_stop
    }

    /// Current state.
    pub async fn state(&self) -> WorkerState {
        self.inner.lock().await.state
    }

    /// Point-in-time view for listings.
    pub async fn snapshot(&self) -> WorkerSnapshot {
        let inner = self.inner.lock().await;
        WorkerSnapshot {
            key: self.key.clone(),
            state: inner.state,
            source_index: inner.index,
            source_count: self.sources.len(),
            launches: inner.launches,
            created_at: self.created_at,
        }
    }

    async fn supervise(self: Arc<Self>, transcoder: Arc<dyn Transcoder>) {
        let mut stop_rx = self.stop_tx.subscribe();
        let mut failures = FailureTracker::new(self.crash_log_limit, self.policy.long);

        loop {
            let Some(launch) = self.launch(transcoder.as_ref()).await else {
                return;
            };

            let started = Instant::now();
            let (outcome, spawned) = match launch.child {
                Ok(mut child) => {
                    if let Some(stderr) = child.stderr.take() {
                        self.forward_stderr(stderr);
                    }
                    (describe_exit(&child.wait().await), true)
                }
                Err(message) => (message, false),
            };
            let ran_for = started.elapsed();

            let Some(step) = self.after_exit().await else {
                return;
            };

            metrics::record_exit(spawned);
            let loud = failures.record_exit(ran_for);
            self.logger.log_exit(launch.index, &outcome, ran_for, loud);
            self.logger
                .log_fallback(step.next_index, step.delay, step.wrapped);
            metrics::record_fallback(step.wrapped);

            if Self::backoff(&mut stop_rx, step.delay).await {
                return;
            }
        }
    }

    /// Launch the current candidate unless the worker was stopped.
    async fn launch(&self, transcoder: &dyn Transcoder) -> Option<Launch> {
        let mut inner = self.inner.lock().await;
        if inner.manual_stop {
            return None;
        }

        let index = inner.index;
        let source = self.sources.get(index)?;
        inner.launches += 1;
        self.logger
            .log_launch(index, inner.launches, transcoder.name());
        metrics::record_launch();

        let child = match spawn_in_group(transcoder.command(source, &self.output)) {
            Ok(spawned) => {
                inner.group = Some(spawned.group);
                inner.state = WorkerState::Running;
                Ok(spawned.child)
            }
            Err(e) => Err(format!("spawn failed: {}", e)),
        };

        Some(Launch { index, child })
    }

    /// Record an exit and pick the next candidate, unless the worker was stopped.
    async fn after_exit(&self) -> Option<FallbackStep> {
        let mut inner = self.inner.lock().await;
        if inner.manual_stop {
            return None;
        }

        // Sweep anything the leader left behind in its group.
        if let Some(group) = inner.group.take() {
            if let Err(e) = group.terminate() {
                self.logger
                    .log_warning(&format!("Failed to sweep process group: {}", e));
            }
        }

        let step = self.policy.step(inner.index, self.sources.len());
        inner.index = step.next_index;
        inner.state = WorkerState::FailedRetry;
        Some(step)
    }

    /// Sleep for `delay`. Returns `true` if a stop arrived first.
    async fn backoff(stop_rx: &mut watch::Receiver<bool>, delay: Duration) -> bool {
        if *stop_rx.borrow_and_update() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            changed = stop_rx.changed() => changed.is_err() || *stop_rx.borrow(),
        }
    }

    fn forward_stderr(&self, stderr: ChildStderr) {
        let logger = self.logger.clone();
        tokio::spawn(
            async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if !line.trim().is_empty() {
                        logger.log_transcoder_output(&line);
                    }
                }
            }
            .in_current_span(),
        );
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("key", &self.key)
            .field("sources", &self.sources.len())
            .field("output", &self.output)
            .finish()
    }
}

/// Result of one launch attempt.
struct Launch {
    index: usize,
    child: Result<tokio::process::Child, String>,
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex as StdMutex;

    use super::*;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    use tempfile::TempDir;
    use tokio::process::Command;

    /// Runs a shell script instead of ffmpeg.
    struct ScriptTranscoder(&'static str);

    impl Transcoder for ScriptTranscoder {
        fn command(&self, _source: &str, _output: &HlsOutput) -> Command {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(self.0);
            cmd
        }

        fn name(&self) -> &str {
            "script"
        }
    }

    /// Leaves a background child behind and crashes. Each launch notes
    /// whether the child left by the previous run is still alive.
    struct OrphaningTranscoder {
        pidfile: PathBuf,
        previous_alive: StdMutex<Vec<bool>>,
    }

    impl Transcoder for OrphaningTranscoder {
        fn command(&self, _source: &str, _output: &HlsOutput) -> Command {
            if let Some(pid) = std::fs::read_to_string(&self.pidfile)
                .ok()
                .and_then(|s| s.trim().parse().ok())
            {
                self.previous_alive.lock().unwrap().push(pid_alive(pid));
            }
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(format!(
                "sleep 30 & echo $! > {}; exit 1",
                self.pidfile.display()
            ));
            cmd
        }

        fn name(&self) -> &str {
            "orphaning"
        }
    }

    fn pid_alive(pid: i32) -> bool {
        if kill(Pid::from_raw(pid), None).is_err() {
            return false;
        }
        // Killed orphans stay zombies until init reaps them.
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => !stat
                .rsplit(')')
                .next()
                .is_some_and(|rest| rest.trim_start().starts_with('Z')),
            Err(_) => !std::path::Path::new("/proc/self").exists(),
        }
    }

    fn worker(dir: &TempDir, specifier: &str) -> Arc<Worker> {
        Arc::new(Worker::new(
            SourceList::parse(specifier).unwrap(),
            HlsOutput::new(dir.path()),
            FallbackPolicy::new(Duration::from_millis(20), Duration::from_millis(50)),
            3,
        ))
    }

    async fn wait_for_state(worker: &Worker, state: WorkerState) {
        for _ in 0..200 {
            if worker.state().await == state {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("worker never reached {}", state);
    }

    #[tokio::test]
    async fn test_new_worker_is_starting() {
        let dir = TempDir::new().unwrap();
        let w = worker(&dir, "http://a/1,http://a/2");
        let snapshot = w.snapshot().await;
        assert_eq!(snapshot.state, WorkerState::Starting);
        assert_eq!(snapshot.source_index, 0);
        assert_eq!(snapshot.source_count, 2);
        assert_eq!(snapshot.launches, 0);
        assert_eq!(&snapshot.key, w.key());
    }

    #[tokio::test]
    async fn test_stop_kills_running_transcoder() {
        let dir = TempDir::new().unwrap();
        let w = worker(&dir, "http://a/1");
        w.start(Arc::new(ScriptTranscoder("exec sleep 30"))).await;
        wait_for_state(&w, WorkerState::Running).await;

        let group = w.inner.lock().await.group.unwrap();
        assert!(group.is_alive());

        tokio::time::timeout(Duration::from_secs(5), w.stop())
            .await
            .expect("stop should not hang");

        assert!(!group.is_alive());
        assert_eq!(w.state().await, WorkerState::Stopped);
        assert!(w.is_stopped().await);
    }

    #[tokio::test]
    async fn test_crashing_transcoder_advances_index() {
        let dir = TempDir::new().unwrap();
        let w = worker(&dir, "http://a/1,http://a/2,http://a/3");
        w.start(Arc::new(ScriptTranscoder("exit 1"))).await;

        for _ in 0..200 {
            if w.snapshot().await.launches >= 4 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        w.stop().await;

        assert!(w.snapshot().await.launches >= 4);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let w = worker(&dir, "http://a/1");
        w.start(Arc::new(ScriptTranscoder("exec sleep 30"))).await;

        w.stop().await;
        w.stop().await;
        assert_eq!(w.state().await, WorkerState::Stopped);
    }

    #[tokio::test]
    async fn test_start_after_stop_is_ignored() {
        let dir = TempDir::new().unwrap();
        let w = worker(&dir, "http://a/1");
        w.stop().await;

        w.start(Arc::new(ScriptTranscoder("exec sleep 30"))).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(w.snapshot().await.launches, 0);
    }

    #[tokio::test]
    async fn test_exit_sweeps_leftover_group_members() {
        let dir = TempDir::new().unwrap();
        let pidfile = dir.path().join("child.pid");
        let transcoder = Arc::new(OrphaningTranscoder {
            pidfile: pidfile.clone(),
            previous_alive: StdMutex::new(Vec::new()),
        });
        let w = worker(&dir, "http://a/1,http://a/2");
        w.start(transcoder.clone()).await;

        for _ in 0..300 {
            if transcoder.previous_alive.lock().unwrap().len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        w.stop().await;

        let seen = transcoder.previous_alive.lock().unwrap().clone();
        assert!(seen.len() >= 2, "expected relaunches, saw {}", seen.len());
        assert!(
            seen.iter().all(|alive| !alive),
            "a child of the previous run outlived it: {seen:?}"
        );

        if let Some(last) = std::fs::read_to_string(&pidfile)
            .ok()
            .and_then(|s| s.trim().parse().ok())
        {
            assert!(!pid_alive(last));
        }
    }
}
