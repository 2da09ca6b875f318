// Session service - validates start requests and launches background runs.
//
// The HTTP layer hands over the raw request; this module decides whether it
// is complete, prepares the session folder, and starts the pipeline without
// waiting for it.

use async_trait::async_trait;
use serde::Deserialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{oneshot, watch};

use crate::core::gaps::{is_plain_file_name, FileRef};
use crate::core::pipeline::{PipelineError, PipelineOutcome, PipelineRequest, PipelineRunner};

/// Every session folder name starts with this marker.
pub const SESSION_FOLDER_PREFIX: &str = "Temp_";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Missing required fields")]
    MissingFields,

    /// The id must work as a single folder name under the base directory.
    #[error("Invalid session_id")]
    InvalidSessionId,

    #[error("Failed to create session folder {path}: {reason}")]
    Folder { path: String, reason: String },
}

/// Body of `POST /start_gap_target`. Everything is optional at parse time so
/// missing fields become a validation error rather than a JSON error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub files: Option<Vec<FileRef>>,
    #[allow(dead_code)]
    #[serde(default)]
    pub gpt_module: Option<String>,
    #[allow(dead_code)]
    #[serde(default)]
    pub status: Option<String>,
}

/// A request that passed validation.
#[derive(Debug, Clone)]
pub struct ValidStart {
    pub session_id: String,
    pub email: String,
    pub files: Vec<FileRef>,
}

impl StartRequest {
    /// `session_id`, `email` and `files` must all be present and non-empty,
    /// and `session_id` must be a plain folder name.
    pub fn validate(self) -> Result<ValidStart, SessionError> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

        match (
            non_empty(self.session_id),
            non_empty(self.email),
            self.files.filter(|f| !f.is_empty()),
        ) {
            (Some(session_id), _, _) if !is_plain_file_name(&session_id) => {
                Err(SessionError::InvalidSessionId)
            }
            (Some(session_id), Some(email), Some(files)) => Ok(ValidStart {
                session_id,
                email,
                files,
            }),
            _ => Err(SessionError::MissingFields),
        }
    }
}

/// Folder name for a session: the id itself when it already carries the
/// marker, otherwise the id with the marker prepended.
pub fn session_folder_name(session_id: &str) -> String {
    if session_id.starts_with(SESSION_FOLDER_PREFIX) {
        session_id.to_string()
    } else {
        format!("{}{}", SESSION_FOLDER_PREFIX, session_id)
    }
}

// ============================================================================
// BACKGROUND DISPATCH
// ============================================================================

/// Handle to one background run.
///
/// Dropping the handle detaches the run; it keeps going to completion.
pub struct SessionHandle {
    pub session_id: String,
    cancel: watch::Sender<bool>,
    done: oneshot::Receiver<Result<PipelineOutcome, PipelineError>>,
}

impl SessionHandle {
    /// Ask the run to stop at its next suspension point.
    #[allow(dead_code)]
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Wait for the run to finish. Returns `None` if the task died without reporting.
    #[allow(dead_code)]
    pub async fn wait(self) -> Option<Result<PipelineOutcome, PipelineError>> {
        self.done.await.ok()
    }
}

/// Starts pipeline runs without blocking the caller.
pub trait SessionDispatcher: Send + Sync {
    fn dispatch(&self, request: PipelineRequest) -> SessionHandle;
}

/// Resolves once cancellation was requested. A dropped sender means
/// "never cancel", not "cancel now".
async fn cancellation(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn run_until_cancelled<Fut>(
    session_id: &str,
    run: Fut,
    cancel_rx: watch::Receiver<bool>,
) -> Result<PipelineOutcome, PipelineError>
where
    Fut: Future<Output = Result<PipelineOutcome, PipelineError>>,
{
    let result = tokio::select! {
        result = run => result,
        _ = cancellation(cancel_rx) => Err(PipelineError::Cancelled),
    };

    match &result {
        Ok(outcome) => tracing::info!(
            session_id,
            hardware = outcome.hardware_entries,
            software = outcome.software_entries,
            "Target GAP processing complete"
        ),
        Err(PipelineError::Cancelled) => {
            tracing::warn!(session_id, "Target GAP processing cancelled")
        }
        Err(e) => tracing::error!(
            session_id,
            error = %e,
            trace = %error_chain(e),
            "Target GAP processing failed"
        ),
    }

    result
}

/// Joins an error with all of its sources, outermost first.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

/// Spawns one tokio task per session. No queueing and no concurrency limit.
pub struct BackgroundDispatcher<P: PipelineRunner + 'static> {
    runner: Arc<P>,
}

impl<P: PipelineRunner + 'static> BackgroundDispatcher<P> {
    pub fn new(runner: P) -> Self {
        Self {
            runner: Arc::new(runner),
        }
    }
}

impl<P: PipelineRunner + 'static> SessionDispatcher for BackgroundDispatcher<P> {
    fn dispatch(&self, request: PipelineRequest) -> SessionHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (done_tx, done_rx) = oneshot::channel();
        let runner = Arc::clone(&self.runner);
        let session_id = request.session_id.clone();

        tokio::spawn(async move {
            let session_id = request.session_id.clone();
            let result = run_until_cancelled(&session_id, runner.run(request), cancel_rx).await;
            // Nobody may be listening; detached runs drop the receiver.
            let _ = done_tx.send(result);
        });

        SessionHandle {
            session_id,
            cancel: cancel_tx,
            done: done_rx,
        }
    }
}

// ============================================================================
// SERVICE
// ============================================================================

/// What the endpoint needs: validate, prepare the folder, dispatch.
#[async_trait]
pub trait SessionStarter: Send + Sync {
    async fn start(&self, request: StartRequest) -> Result<SessionHandle, SessionError>;
}

pub struct SessionService<D: SessionDispatcher> {
    base_dir: PathBuf,
    dispatcher: D,
}

impl<D: SessionDispatcher> SessionService<D> {
    pub fn new(base_dir: impl AsRef<Path>, dispatcher: D) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            dispatcher,
        }
    }

    pub fn session_folder(&self, session_id: &str) -> PathBuf {
        self.base_dir.join(session_folder_name(session_id))
    }
}

#[async_trait]
impl<D: SessionDispatcher> SessionStarter for SessionService<D> {
    async fn start(&self, request: StartRequest) -> Result<SessionHandle, SessionError> {
        let valid = request.validate()?;
        let folder = self.session_folder(&valid.session_id);

        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|e| SessionError::Folder {
                path: folder.display().to_string(),
                reason: e.to_string(),
            })?;

        let handle = self.dispatcher.dispatch(PipelineRequest {
            session_id: valid.session_id,
            email: valid.email,
            files: valid.files,
            folder,
        });
        tracing::info!(session_id = %handle.session_id, "Started Target GAP analysis");

        Ok(handle)
    }
}
