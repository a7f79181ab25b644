use super::commands::{build_render_args, format_command_line};
use super::probe::{measure_duration, DurationProbe, FfprobeDuration};
use super::progress::ProgressTracker;
use super::tools::ToolPaths;
use crate::config::RenderConfig;
use crate::error::{RenderError, RenderResult};
use crate::project::RenderRequest;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::runtime::Handle;
use tokio::sync::Notify;

#[cfg(unix)]
use nix::sys::signal::{kill, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

const READ_CHUNK: usize = 8 * 1024;

/// Lifecycle of the runner's current (or last) job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Starting,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    /// A job is in flight; `start` must be refused.
    pub fn is_busy(&self) -> bool {
        matches!(self, RunState::Starting | RunState::Running)
    }
}

/// What the runner reports to whoever renders job state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    /// The encoder process was spawned.
    Started,
    /// Percentage 0..=100, non-decreasing within a job.
    Progress(u8),
    /// Diagnostic text, one event per chunk read from the encoder's stderr,
    /// plus the runner's own status lines.
    LogLine(String),
    /// Terminal. `exit_code == 0` means success. Nothing follows for this job.
    Finished { exit_code: i32, output_path: PathBuf },
}

struct Lifecycle {
    state: RunState,
    output_path: PathBuf,
    audio_duration: f64,
    cancel_requested: bool,
    cancel: Option<Arc<Notify>>,
}

/// Drives one `ffmpeg` process at a time and reports on it through [`RunnerEvent`]s.
///
/// Cloning yields another handle onto the same runner.
#[derive(Clone)]
pub struct FfmpegRunner {
    config: Arc<RenderConfig>,
    tools: Arc<ToolPaths>,
    probe: Arc<dyn DurationProbe>,
    runtime: Handle,
    lifecycle: Arc<Mutex<Lifecycle>>,
    events_tx: Sender<RunnerEvent>,
    events_rx: Receiver<RunnerEvent>,
}

impl FfmpegRunner {
    pub fn new(
        config: RenderConfig,
        tools: ToolPaths,
        probe: Arc<dyn DurationProbe>,
        runtime: Handle,
    ) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            config: Arc::new(config),
            tools: Arc::new(tools),
            probe,
            runtime,
            lifecycle: Arc::new(Mutex::new(Lifecycle {
                state: RunState::Idle,
                output_path: PathBuf::new(),
                audio_duration: 0.0,
                cancel_requested: false,
                cancel: None,
            })),
            events_tx,
            events_rx,
        }
    }

    /// Runner that measures audio with the configured `ffprobe`.
    pub fn with_ffprobe(config: RenderConfig, tools: ToolPaths, runtime: Handle) -> Self {
        let probe = Arc::new(FfprobeDuration::new(tools.ffprobe.clone()));
        Self::new(config, tools, probe, runtime)
    }

    /// The event stream. All clones share one queue: each event is delivered once.
    pub fn events(&self) -> Receiver<RunnerEvent> {
        self.events_rx.clone()
    }

    pub fn state(&self) -> RunState {
        self.lifecycle.lock().state
    }

    pub fn is_busy(&self) -> bool {
        self.state().is_busy()
    }

    /// Output path of the most recently started job.
    pub fn output_path(&self) -> PathBuf {
        self.lifecycle.lock().output_path.clone()
    }

    /// Audio duration measured for the most recently started job.
    pub fn audio_duration(&self) -> f64 {
        self.lifecycle.lock().audio_duration
    }

    /// Start rendering `request`.
    ///
    /// Blocks while the audio duration is probed, then returns as soon as the encoder is
    /// spawned. Probe and spawn failures are reported both as the returned error and as a
    /// `Finished { exit_code: -1, .. }` event. A busy runner or malformed request is
    /// rejected without any state change.
    pub fn start(&self, request: RenderRequest) -> RenderResult<()> {
        {
            let mut life = self.lifecycle.lock();
            if life.state.is_busy() {
                drop(life);
                tracing::warn!("start rejected: a render is already running");
                self.emit(RunnerEvent::LogLine(
                    "Error: A process is already running.".to_string(),
                ));
                return Err(RenderError::Busy);
            }
            request.validate()?;
            life.state = RunState::Starting;
            life.cancel_requested = false;
            life.cancel = None;
        }

        let duration = match measure_duration(self.probe.as_ref(), &request.audio_path) {
            Ok(d) => d,
            Err(e) => return Err(self.fail_probe(e)),
        };
        tracing::info!(audio = %request.audio_path.display(), duration, "probed audio duration");

        let output_path = request.output_path.clone();
        {
            let mut life = self.lifecycle.lock();
            life.output_path = output_path.clone();
            life.audio_duration = duration;
        }

        let args = match build_render_args(&request, duration, &self.config) {
            Ok(args) => args,
            Err(e) => {
                self.emit(RunnerEvent::LogLine(format!("Error: {}", e)));
                self.finish(RunState::Failed, -1, output_path);
                return Err(e);
            }
        };

        let command_line = format_command_line(&self.tools.ffmpeg, &args);
        tracing::debug!(command = %command_line, "spawning encoder");
        self.emit(RunnerEvent::LogLine(format!(
            "Executing command: {}",
            command_line
        )));

        let spawned = {
            let _guard = self.runtime.enter();
            Command::new(&self.tools.ffmpeg)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
        };
        let child = match spawned {
            Ok(child) => child,
            Err(source) => {
                let err = RenderError::Spawn {
                    program: self.tools.ffmpeg.clone(),
                    source,
                };
                tracing::error!("{}", err);
                self.emit(RunnerEvent::LogLine(format!("Error: {}", err)));
                self.finish(RunState::Failed, -1, output_path);
                return Err(err);
            }
        };

        let cancel = Arc::new(Notify::new());
        {
            let mut life = self.lifecycle.lock();
            life.state = RunState::Running;
            life.cancel = Some(cancel.clone());
        }
        tracing::info!(pid = ?child.id(), output = %output_path.display(), "encoder started");
        self.emit(RunnerEvent::Started);

        let runner = self.clone();
        self.runtime
            .spawn(async move { runner.supervise(child, cancel, duration, output_path).await });

        Ok(())
    }

    /// Ask the running encoder to stop. Returns immediately; the job still ends with
    /// `Finished`. Does nothing when no encoder is running.
    pub fn cancel(&self) {
        let notify = {
            let mut life = self.lifecycle.lock();
            if life.state != RunState::Running || life.cancel_requested {
                return;
            }
            life.cancel_requested = true;
            life.cancel.clone()
        };

        tracing::info!("cancelling encoder");
        self.emit(RunnerEvent::LogLine("--- CANCELLING PROCESS ---".to_string()));
        if let Some(notify) = notify {
            notify.notify_one();
        }
    }

    async fn supervise(
        self,
        mut child: Child,
        cancel: Arc<Notify>,
        duration: f64,
        output_path: PathBuf,
    ) {
        let progress_task = child
            .stdout
            .take()
            .map(|out| tokio::spawn(read_progress(out, duration, self.events_tx.clone())));
        let log_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(read_logs(err, self.events_tx.clone())));

        let status = loop {
            tokio::select! {
                status = child.wait() => break status,
                _ = cancel.notified() => terminate_gracefully(&mut child),
            }
        };

        // Drain both pipes so every progress and log event precedes Finished.
        if let Some(task) = progress_task {
            let _ = task.await;
        }
        if let Some(task) = log_task {
            let _ = task.await;
        }

        let exit_code = match status {
            Ok(status) => status.code().unwrap_or(-1),
            Err(e) => {
                tracing::error!("failed to wait for encoder: {}", e);
                -1
            }
        };
        tracing::info!(exit_code, "encoder exited");

        let state = if exit_code == 0 {
            self.emit(RunnerEvent::LogLine("--- PROCESS COMPLETE ---".to_string()));
            self.emit(RunnerEvent::LogLine(format!(
                "Output file: {}",
                output_path.display()
            )));
            self.emit(RunnerEvent::Progress(100));
            RunState::Completed
        } else {
            self.emit(RunnerEvent::LogLine(format!(
                "--- PROCESS FAILED (Code: {}) ---",
                exit_code
            )));
            if self.lifecycle.lock().cancel_requested {
                RunState::Cancelled
            } else {
                RunState::Failed
            }
        };

        self.finish(state, exit_code, output_path);
    }

    fn fail_probe(&self, err: RenderError) -> RenderError {
        tracing::warn!("{}", err);
        self.emit(RunnerEvent::LogLine(format!(
            "Error: Could not determine audio duration or audio is 0s long. ({})",
            err
        )));
        self.finish(RunState::Failed, -1, PathBuf::new());
        err
    }

    /// Record the terminal state, then announce it.
    fn finish(&self, state: RunState, exit_code: i32, output_path: PathBuf) {
        {
            let mut life = self.lifecycle.lock();
            life.state = state;
            life.cancel = None;
        }
        self.emit(RunnerEvent::Finished {
            exit_code,
            output_path,
        });
    }

    fn emit(&self, event: RunnerEvent) {
        // The runner holds a receiver itself, so sending cannot fail.
        let _ = self.events_tx.send(event);
    }
}

async fn read_progress<R>(mut reader: R, total_seconds: f64, events: Sender<RunnerEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut tracker = ProgressTracker::new(total_seconds);
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if let Some(pct) = tracker.feed(&buf[..n]) {
                    let _ = events.send(RunnerEvent::Progress(pct));
                }
            }
            Err(e) => {
                tracing::warn!("error reading encoder stdout: {}", e);
                break;
            }
        }
    }
    if let Some(pct) = tracker.finish() {
        let _ = events.send(RunnerEvent::Progress(pct));
    }
}

async fn read_logs<R>(mut reader: R, events: Sender<RunnerEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let text = String::from_utf8_lossy(&buf[..n]);
                let text = text.trim_end();
                if !text.is_empty() {
                    let _ = events.send(RunnerEvent::LogLine(text.to_string()));
                }
            }
            Err(e) => {
                tracing::warn!("error reading encoder stderr: {}", e);
                break;
            }
        }
    }
}

#[cfg(unix)]
fn terminate_gracefully(child: &mut Child) {
    // None once the child has been reaped; nothing left to signal.
    if let Some(pid) = child.id() {
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            tracing::warn!("failed to send SIGTERM to {}: {}", pid, e);
        }
    }
}

#[cfg(not(unix))]
fn terminate_gracefully(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        tracing::warn!("failed to stop encoder: {}", e);
    }
}
