//! Speech pipeline listener
//!
//! Runs the capture stage (`transcribe-stream`) and, in closed mode, the
//! interpretation stage (`recognize-intent`) as child processes on a
//! background task. `start_listening` returns once the capture stage is
//! listening or has already died; the returned [`ListenHandle`] yields the
//! recognition and owns the task.
//!
//! Every stage is killed and reaped when the task ends, whether it finished,
//! timed out, failed or was cancelled. Dropping the handle aborts the task
//! instead: the stages are killed through `kill_on_drop` but not waited for,
//! and reaping is left to the runtime.

use std::fmt;
use std::future::Future;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Split};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::recognition::{self, RecognitionResult};
use crate::config::ListenConfig;
use crate::{Error, Result};

/// Result of one listen; `None` means no speech before the timeout
pub type ListenOutcome = Result<Option<RecognitionResult>>;

/// A speech pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Live audio to raw transcript
    Capture,
    /// Raw transcript to intent and slots
    Interpretation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capture => f.write_str("capture"),
            Self::Interpretation => f.write_str("interpretation"),
        }
    }
}

/// Starts listening attempts
#[async_trait]
pub trait Listener: Send + Sync {
    /// Start listening and return once listening is active
    ///
    /// With `open` the raw transcript is returned without interpretation.
    ///
    /// # Errors
    ///
    /// Returns error if the pipeline failed before it became ready
    async fn start_listening(&self, open: bool, timeout: Duration) -> Result<ListenHandle>;
}

/// An in-flight listening attempt
pub struct ListenHandle {
    task: Option<JoinHandle<ListenOutcome>>,
    cancel: CancellationToken,
}

impl ListenHandle {
    /// Spawn a listen worker
    ///
    /// The worker gets a token that [`cancel`](Self::cancel) fires; it must
    /// release its resources before returning. Dropping the handle aborts the
    /// worker without waiting for it.
    pub fn spawn<F, Fut>(worker: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ListenOutcome> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(worker(cancel.clone()));

        Self {
            task: Some(task),
            cancel,
        }
    }

    /// A handle whose outcome is already known
    #[must_use]
    pub fn completed(outcome: Option<RecognitionResult>) -> Self {
        Self::spawn(move |_| async move { Ok(outcome) })
    }

    /// Whether the worker has stopped (or its outcome was already taken)
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the listen outcome
    ///
    /// # Errors
    ///
    /// Returns the pipeline error, or `Error::Listen` if the outcome was
    /// already taken or the worker was cancelled
    pub async fn result(&mut self) -> ListenOutcome {
        let task = self
            .task
            .as_mut()
            .ok_or_else(|| Error::Listen("listen outcome already taken".to_string()))?;

        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => Err(Error::Listen("listener was cancelled".to_string())),
            Err(e) => Err(Error::Listen(format!("listener task failed: {e}"))),
        };

        self.task = None;
        outcome
    }

    /// Cancel the attempt and wait until its stages are torn down
    ///
    /// Safe to call on a finished handle and safe to call more than once.
    pub async fn cancel(&mut self) {
        self.cancel.cancel();

        let Some(task) = self.task.as_mut() else {
            return;
        };

        if let Err(e) = task.await
            && e.is_panic()
        {
            tracing::warn!(error = %e, "listener task panicked");
        }

        self.task = None;
    }
}

/// Aborts a running worker; its stages are killed but not reaped here
impl Drop for ListenHandle {
    fn drop(&mut self) {
        self.cancel.cancel();

        if let Some(task) = self.task.take()
            && !task.is_finished()
        {
            tracing::debug!("listen handle dropped while running, aborting");
            task.abort();
        }
    }
}

impl fmt::Debug for ListenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenHandle")
            .field("finished", &self.is_finished())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Listener backed by the external speech tool
#[derive(Debug, Clone)]
pub struct SpeechPipeline {
    config: ListenConfig,
}

impl SpeechPipeline {
    /// Create a pipeline listener
    #[must_use]
    pub const fn new(config: ListenConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Listener for SpeechPipeline {
    async fn start_listening(&self, open: bool, timeout: Duration) -> Result<ListenHandle> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let config = self.config.clone();

        let mut handle = ListenHandle::spawn(move |cancel| {
            run_pipeline(config, open, timeout, ready_tx, cancel)
        });

        // Resolves on the ready signal, or with an error once the worker has
        // finished and dropped the sender without sending it.
        if ready_rx.await.is_ok() {
            tracing::debug!(open, ?timeout, "listening");
            return Ok(handle);
        }

        let outcome = handle.result().await?;
        Ok(ListenHandle::completed(outcome))
    }
}

/// Listen worker: runs the stages, then tears them down on every path
async fn run_pipeline(
    config: ListenConfig,
    open: bool,
    timeout: Duration,
    ready: oneshot::Sender<()>,
    cancel: CancellationToken,
) -> ListenOutcome {
    let mut stages = StageSet::default();

    let outcome = tokio::select! {
        () = cancel.cancelled() => {
            tracing::debug!("listener cancelled");
            Ok(None)
        }
        outcome = listen(&config, open, timeout, ready, &mut stages) => outcome,
    };

    stages.terminate().await;
    outcome
}

async fn listen(
    config: &ListenConfig,
    open: bool,
    timeout: Duration,
    ready: oneshot::Sender<()>,
    stages: &mut StageSet,
) -> ListenOutcome {
    let mut args = vec!["transcribe-stream", "--exit-count", "1"];
    if open {
        args.push("--open");
    }

    let mut command = Command::new(&config.command);
    command
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let capture = stages.spawn(Stage::Capture, &mut command)?;

    let mut stdout = capture
        .stdout
        .take()
        .ok_or_else(|| Error::Listen("capture stage has no stdout".to_string()))?;
    let mut stderr = capture
        .stderr
        .take()
        .map(|s| BufReader::new(s).split(b'\n'))
        .ok_or_else(|| Error::Listen("capture stage has no stderr".to_string()))?;

    let mut diagnostics = String::new();
    loop {
        match next_line(&mut stderr).await? {
            Some(line) if line.trim() == config.ready_line => break,
            Some(line) => {
                diagnostics.push_str(&line);
                diagnostics.push('\n');
            }
            None => {
                let status = stages.wait(Stage::Capture).await?;
                tracing::debug!(%status, "capture stage died before becoming ready");
                return Err(Error::Pipeline {
                    stage: Stage::Capture,
                    status,
                    stderr: diagnostics.trim().to_string(),
                });
            }
        }
    }

    tracing::debug!("capture stage ready");
    // The caller may have stopped waiting; the attempt carries on regardless
    let _ = ready.send(());

    let captured = tokio::time::timeout(timeout, async {
        let mut transcription = String::new();
        let (read, drained) = tokio::join!(
            stdout.read_to_string(&mut transcription),
            collect_lines(stderr, &mut diagnostics),
        );
        read?;
        drained?;
        Ok::<_, Error>(transcription)
    })
    .await;

    let Ok(transcription) = captured else {
        tracing::debug!(?timeout, "no speech before timeout");
        return Ok(None);
    };
    let transcription = transcription?;

    let status = stages.wait(Stage::Capture).await?;
    if !status.success() {
        return Err(Error::Pipeline {
            stage: Stage::Capture,
            status,
            stderr: diagnostics.trim().to_string(),
        });
    }

    tracing::debug!(transcription = %transcription.trim(), "got event from capture stage");

    if open {
        return recognition::parse_transcription(&transcription).map(Some);
    }

    let response = interpret(config, transcription, stages).await?;
    tracing::debug!(response = %response.trim(), "got event from interpretation stage");

    recognition::parse_intent(&response, config.min_confidence).map(Some)
}

/// Feed a transcription through the interpretation stage
async fn interpret(
    config: &ListenConfig,
    transcription: String,
    stages: &mut StageSet,
) -> Result<String> {
    let mut command = Command::new(&config.command);
    command
        .arg("recognize-intent")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let interpreter = stages.spawn(Stage::Interpretation, &mut command)?;

    let (Some(mut stdin), Some(mut stdout), Some(mut stderr)) = (
        interpreter.stdin.take(),
        interpreter.stdout.take(),
        interpreter.stderr.take(),
    ) else {
        return Err(Error::Listen(
            "interpretation stage is missing a pipe".to_string(),
        ));
    };

    let feed = async move {
        stdin.write_all(transcription.as_bytes()).await?;
        // Closing stdin tells the stage the transcription is complete
        drop(stdin);
        Ok::<_, std::io::Error>(())
    };

    let mut response = String::new();
    let mut errors = Vec::new();
    let (fed, read, drained) = tokio::join!(
        feed,
        stdout.read_to_string(&mut response),
        stderr.read_to_end(&mut errors),
    );

    let status = stages.wait(Stage::Interpretation).await?;
    if !status.success() {
        return Err(Error::Pipeline {
            stage: Stage::Interpretation,
            status,
            stderr: String::from_utf8_lossy(&errors).trim().to_string(),
        });
    }

    fed?;
    read?;
    drained?;

    Ok(response)
}

/// Diagnostic output isn't guaranteed to be UTF-8 (device names, locale
/// messages), so lines are decoded lossily
async fn next_line(lines: &mut Split<BufReader<ChildStderr>>) -> std::io::Result<Option<String>> {
    let segment = lines.next_segment().await?;
    Ok(segment.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}

async fn collect_lines(
    mut lines: Split<BufReader<ChildStderr>>,
    buf: &mut String,
) -> std::io::Result<()> {
    while let Some(line) = next_line(&mut lines).await? {
        buf.push_str(&line);
        buf.push('\n');
    }
    Ok(())
}

/// Child processes owned by one listening attempt
#[derive(Default)]
struct StageSet {
    children: Vec<(Stage, Child)>,
}

impl StageSet {
    fn spawn(&mut self, stage: Stage, command: &mut Command) -> Result<&mut Child> {
        let child = command.kill_on_drop(true).spawn().map_err(|e| {
            Error::Listen(format!("failed to start {stage} stage: {e}"))
        })?;
        tracing::debug!(%stage, pid = ?child.id(), "started stage");

        let index = self.children.len();
        self.children.push((stage, child));
        Ok(&mut self.children[index].1)
    }

    async fn wait(&mut self, stage: Stage) -> Result<ExitStatus> {
        let child = self
            .children
            .iter_mut()
            .find_map(|(s, child)| (*s == stage).then_some(child))
            .ok_or_else(|| Error::Listen(format!("{stage} stage was never started")))?;

        Ok(child.wait().await?)
    }

    /// Kill every stage that is still running and reap it
    async fn terminate(&mut self) {
        futures::future::join_all(
            self.children
                .iter_mut()
                .map(|(stage, child)| terminate_stage(*stage, child)),
        )
        .await;
    }
}

async fn terminate_stage(stage: Stage, child: &mut Child) {
    match child.try_wait() {
        Ok(Some(_)) => return,
        Ok(None) => {}
        Err(e) => tracing::warn!(%stage, error = %e, "failed to poll stage"),
    }

    // Fails if the process exited since the poll above, which is fine
    if let Err(e) = child.start_kill() {
        tracing::debug!(%stage, error = %e, "stage already gone");
    }

    match child.wait().await {
        Ok(status) => tracing::debug!(%stage, %status, "stage terminated"),
        Err(e) => tracing::warn!(%stage, error = %e, "failed to reap stage"),
    }
}
