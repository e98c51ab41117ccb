//! Upload session controller.
//!
//! Drives one file through `Idle -> Ready -> Uploading -> {Complete | Error}`:
//! opens a session on the control plane, runs the parts through the
//! scheduler, finalizes, and aborts the session when anything after initiate
//! fails.

use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use parcel_protocol::constants::DEFAULT_CONTENT_TYPE;
use parcel_protocol::messages::{AbortRequest, CompleteRequest, CompletedPart, InitiateRequest};
use parcel_protocol::{UploadDetails, UploadStatus};
use parcel_transfer::{ChunkPlan, ChunkReader, ChunkSource, FileSource, ProgressMeter};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::UploaderConfig;
use crate::control::{ControlPlane, StorageBackend};
use crate::error::UploadError;
use crate::part::{PartTarget, PartUploader};
use crate::scheduler::PartScheduler;
use crate::types::{EVENT_CHANNEL_CAPACITY, UploadEvent, UploadOutcome, UploadSession, emit};

/// A file picked for upload.
#[derive(Clone)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    pub source: Arc<dyn ChunkSource>,
}

impl std::fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("size", &self.size)
            .finish()
    }
}

#[derive(Default)]
struct ControllerState {
    status: UploadStatus,
    file: Option<SelectedFile>,
    session: Option<UploadSession>,
    progress: Option<Arc<ProgressMeter>>,
    last_error: Option<UploadError>,
    location: Option<String>,
    cancel: CancellationToken,
}

/// Owns the lifecycle of one upload at a time.
///
/// All methods but [`take_events`](Self::take_events) take `&self`, so the
/// controller can be shared through an `Arc` between the task driving
/// [`start`](Self::start) and observers.
pub struct UploadController {
    control: Arc<dyn ControlPlane>,
    storage: Arc<dyn StorageBackend>,
    config: UploaderConfig,
    state: RwLock<ControllerState>,
    events_tx: mpsc::Sender<UploadEvent>,
    events_taken: bool,
}

impl UploadController {
    /// Creates an idle controller. Fails on an invalid `config`.
    pub fn new(
        control: Arc<dyn ControlPlane>,
        storage: Arc<dyn StorageBackend>,
        config: UploaderConfig,
    ) -> Result<Self, UploadError> {
        config.validate()?;
        // Closed until `take_events`: nothing queues up for a missing reader.
        let (events_tx, _) = mpsc::channel(1);
        Ok(Self {
            control,
            storage,
            config,
            state: RwLock::new(ControllerState::default()),
            events_tx,
            events_taken: false,
        })
    }

    /// Takes the event receiver. Can only be called once.
    ///
    /// The upload waits for a consumer that falls behind rather than dropping
    /// events, so the receiver must be drained while `start` runs.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        if self.events_taken {
            return None;
        }
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.events_tx = events_tx;
        self.events_taken = true;
        Some(events_rx)
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    /// Picks `source` as the next file to upload.
    ///
    /// Allowed whenever no upload is running; any previous session state is
    /// cleared. Empty sources are rejected and leave the state unchanged.
    pub fn select(
        &self,
        name: impl Into<String>,
        source: Arc<dyn ChunkSource>,
    ) -> Result<(), UploadError> {
        let name = name.into();
        let size = source.len();
        {
            let mut state = self.write();
            if state.status == UploadStatus::Uploading {
                return Err(UploadError::InvalidState {
                    action: "select",
                    state: state.status,
                });
            }
            if size == 0 {
                return Err(UploadError::EmptySource);
            }
            *state = ControllerState {
                status: UploadStatus::Ready,
                file: Some(SelectedFile {
                    name: name.clone(),
                    size,
                    source,
                }),
                ..ControllerState::default()
            };
        }
        info!(file = %name, size, "file selected");
        self.notify(UploadEvent::StatusChanged {
            status: UploadStatus::Ready,
        });
        Ok(())
    }

    /// Opens `path` and selects it under its file name.
    pub fn select_path(&self, path: &Path) -> Result<(), UploadError> {
        let source = FileSource::open(path)
            .map_err(|e| UploadError::Source(format!("{}: {e}", path.display())))?;
        let name = source
            .file_name()
            .ok_or_else(|| UploadError::Source(format!("{}: no file name", path.display())))?;
        self.select(name, Arc::new(source))
    }

    /// Uploads the selected file.
    ///
    /// Requires `Ready`. Initiate failures end in `Error` directly; any later
    /// failure aborts the session first. The abort outcome never replaces the
    /// original error.
    pub async fn start(&self, content_type: &str) -> Result<UploadOutcome, UploadError> {
        let (file, cancel) = {
            let mut state = self.write();
            let file = match (&state.status, &state.file) {
                (UploadStatus::Ready, Some(file)) => file.clone(),
                _ => {
                    return Err(UploadError::InvalidState {
                        action: "start",
                        state: state.status,
                    });
                }
            };
            state.status = UploadStatus::Uploading;
            state.last_error = None;
            state.location = None;
            (file, state.cancel.clone())
        };
        self.emit(UploadEvent::StatusChanged {
            status: UploadStatus::Uploading,
        })
        .await;

        let content_type = if content_type.trim().is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            content_type
        };

        let (upload_id, key) = match self.initiate(&file, content_type).await {
            Ok(ids) => ids,
            Err(e) => return Err(self.fail(e).await),
        };

        match self
            .upload_parts(&file, content_type, &upload_id, &key, &cancel)
            .await
        {
            Ok(outcome) => {
                self.finish(&outcome).await;
                Ok(outcome)
            }
            Err(e) => {
                error!(upload_id = %upload_id, key = %key, error = %e, "upload failed, aborting");
                self.emit(UploadEvent::Failed { error: e.clone() }).await;
                self.abort_session(&upload_id, &key).await;
                Err(self.fail(e).await)
            }
        }
    }

    /// Requests cancellation of a running upload.
    ///
    /// Returns `false` when nothing is uploading.
    pub fn cancel(&self) -> bool {
        let state = self.read();
        if state.status != UploadStatus::Uploading {
            return false;
        }
        info!("cancelling upload");
        state.cancel.cancel();
        true
    }

    /// Returns to `Idle`, dropping the file and session identifiers.
    ///
    /// Rejected while uploading; a no-op from `Idle`.
    pub fn reset(&self) -> Result<(), UploadError> {
        {
            let mut state = self.write();
            match state.status {
                UploadStatus::Idle => return Ok(()),
                UploadStatus::Uploading => {
                    return Err(UploadError::InvalidState {
                        action: "reset",
                        state: state.status,
                    });
                }
                UploadStatus::Ready | UploadStatus::Complete | UploadStatus::Error => {
                    *state = ControllerState::default();
                }
            }
        }
        debug!("controller reset");
        self.notify(UploadEvent::StatusChanged {
            status: UploadStatus::Idle,
        });
        Ok(())
    }

    pub fn status(&self) -> UploadStatus {
        self.read().status
    }

    /// Snapshot for display.
    pub fn details(&self) -> UploadDetails {
        let state = self.read();
        let total_parts = state
            .file
            .as_ref()
            .and_then(|f| ChunkPlan::new(f.size, self.config.chunk_size).ok())
            .map(|plan| plan.total_parts())
            .unwrap_or(0);
        UploadDetails {
            upload_id: state.session.as_ref().map(|s| s.session_id.clone()),
            key: state.session.as_ref().map(|s| s.object_key.clone()),
            parts_uploaded: state
                .progress
                .as_ref()
                .map(|p| p.completed_parts())
                .unwrap_or(0),
            total_parts,
        }
    }

    /// The open (or last) session, if initiate succeeded.
    pub fn session(&self) -> Option<UploadSession> {
        let state = self.read();
        let mut session = state.session.clone()?;
        if let Some(progress) = &state.progress {
            session.parts_completed = progress.completed_parts();
        }
        session.status = state.status;
        Some(session)
    }

    pub fn selected_file(&self) -> Option<SelectedFile> {
        self.read().file.clone()
    }

    /// The error that moved the controller to `Error`.
    pub fn last_error(&self) -> Option<UploadError> {
        self.read().last_error.clone()
    }

    /// Final object location once `Complete`.
    pub fn location(&self) -> Option<String> {
        self.read().location.clone()
    }

    /// Opens the session. Not raced against cancellation: a session the
    /// server created must be known so it can be aborted.
    async fn initiate(
        &self,
        file: &SelectedFile,
        content_type: &str,
    ) -> Result<(String, String), UploadError> {
        let control = &self.control;
        let req = InitiateRequest {
            filename: file.name.clone(),
            content_type: content_type.to_string(),
        };
        let resp = self
            .config
            .retry_policy()
            .run("initiate", move || {
                let req = req.clone();
                async move { control.initiate(req).await.map_err(UploadError::Initiation) }
            })
            .await?;

        let total_parts = ChunkPlan::new(file.size, self.config.chunk_size)?.total_parts();
        info!(upload_id = %resp.upload_id, key = %resp.key, total_parts, "upload initiated");
        {
            let mut state = self.write();
            state.session = Some(UploadSession {
                session_id: resp.upload_id.clone(),
                object_key: resp.key.clone(),
                total_parts,
                parts_completed: 0,
                status: UploadStatus::Uploading,
            });
        }
        self.emit(UploadEvent::Initiated {
            upload_id: resp.upload_id.clone(),
            key: resp.key.clone(),
            total_parts,
        })
        .await;
        Ok((resp.upload_id, resp.key))
    }

    /// Uploads every part and finalizes the object.
    async fn upload_parts(
        &self,
        file: &SelectedFile,
        content_type: &str,
        upload_id: &str,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome, UploadError> {
        if cancel.is_cancelled() {
            info!(upload_id, "cancelled while initiating");
            return Err(UploadError::Cancelled);
        }

        let reader = ChunkReader::new(file.source.clone(), self.config.chunk_size)?;
        let total_parts = reader.plan().total_parts();
        let progress = Arc::new(ProgressMeter::new(total_parts, file.size));
        self.write().progress = Some(Arc::clone(&progress));

        let uploader = PartUploader::new(
            Arc::clone(&self.control),
            Arc::clone(&self.storage),
            reader,
            self.config.retry_policy(),
            PartTarget::new(key.to_string(), upload_id.to_string(), content_type),
        );
        let scheduler = PartScheduler::new(
            Arc::new(uploader),
            self.config.max_concurrency,
            progress,
            self.events_tx.clone(),
            cancel.clone(),
        );
        let parts: Vec<CompletedPart> = scheduler
            .run()
            .await?
            .into_iter()
            .map(CompletedPart::from)
            .collect();

        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        debug!(upload_id, parts = parts.len(), "all parts uploaded, completing");
        let control = &self.control;
        let req = CompleteRequest {
            key: key.to_string(),
            upload_id: upload_id.to_string(),
            parts,
        };
        let resp = self
            .config
            .retry_policy()
            .run("complete", move || {
                let req = req.clone();
                async move {
                    control
                        .complete(req)
                        .await
                        .map_err(UploadError::Finalization)
                }
            })
            .await?;

        let mut outcome = UploadOutcome::new(resp, total_parts, file.size);
        if outcome.key.is_empty() {
            outcome.key = key.to_string();
        }
        Ok(outcome)
    }

    /// Best-effort cleanup; failures are logged and swallowed.
    async fn abort_session(&self, upload_id: &str, key: &str) {
        let req = AbortRequest {
            key: key.to_string(),
            upload_id: upload_id.to_string(),
        };
        let success = match self.control.abort(req).await {
            Ok(resp) if resp.ok => {
                info!(upload_id, key, "upload aborted");
                true
            }
            Ok(_) => {
                warn!(upload_id, key, "abort not acknowledged");
                false
            }
            Err(e) => {
                let err = UploadError::Abort(e);
                warn!(upload_id, key, error = %err, "ignoring abort failure");
                false
            }
        };
        self.emit(UploadEvent::Aborted {
            upload_id: upload_id.to_string(),
            key: key.to_string(),
            success,
        })
        .await;
    }

    async fn finish(&self, outcome: &UploadOutcome) {
        {
            let mut state = self.write();
            state.status = UploadStatus::Complete;
            state.location = Some(outcome.location.clone());
            if let Some(session) = state.session.as_mut() {
                session.parts_completed = outcome.total_parts;
                session.status = UploadStatus::Complete;
            }
        }
        info!(location = %outcome.location, parts = outcome.total_parts, "upload complete");
        self.emit(UploadEvent::Completed {
            location: outcome.location.clone(),
        })
        .await;
        self.emit(UploadEvent::StatusChanged {
            status: UploadStatus::Complete,
        })
        .await;
    }

    /// Settles in `Error` and hands `e` back for returning.
    async fn fail(&self, e: UploadError) -> UploadError {
        let had_session = {
            let mut state = self.write();
            state.status = UploadStatus::Error;
            state.last_error = Some(e.clone());
            if let Some(session) = state.session.as_mut() {
                session.status = UploadStatus::Error;
            }
            state.session.is_some()
        };
        if !had_session {
            error!(error = %e, "upload failed before a session was opened");
            self.emit(UploadEvent::Failed { error: e.clone() }).await;
        }
        self.emit(UploadEvent::StatusChanged {
            status: UploadStatus::Error,
        })
        .await;
        e
    }

    async fn emit(&self, event: UploadEvent) {
        emit(&self.events_tx, event).await;
    }

    /// Queues an event from outside an upload, where there is nothing to
    /// hold back; dropped only when the receiver is full or gone.
    fn notify(&self, event: UploadEvent) {
        if let Err(e) = self.events_tx.try_send(event) {
            trace!(error = %e, "status event not queued");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ControllerState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ControllerState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}
