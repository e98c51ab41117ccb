//! Bounded-concurrency part scheduling.
//!
//! A fixed pool of `min(max_concurrency, total_parts)` workers pulls part
//! numbers from a shared cursor. Results funnel back over a channel to the
//! scheduling task, which owns progress accounting and the first failure.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parcel_transfer::ProgressMeter;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::UploadError;
use crate::part::PartUploader;
use crate::types::{PartDescriptor, UploadEvent, emit};

/// Runs every part of one session through a worker pool.
pub struct PartScheduler {
    uploader: Arc<PartUploader>,
    max_concurrency: usize,
    progress: Arc<ProgressMeter>,
    events: mpsc::Sender<UploadEvent>,
    cancel: CancellationToken,
}

impl PartScheduler {
    pub fn new(
        uploader: Arc<PartUploader>,
        max_concurrency: usize,
        progress: Arc<ProgressMeter>,
        events: mpsc::Sender<UploadEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            uploader,
            max_concurrency,
            progress,
            events,
            cancel,
        }
    }

    /// Uploads parts `1..=total_parts` and returns their descriptors sorted
    /// by part number.
    ///
    /// The first failure stops the pool: no new parts are started, in-flight
    /// ones drain and later failures are ignored. Cancelling the token drops
    /// in-flight parts.
    pub async fn run(&self) -> Result<Vec<PartDescriptor>, UploadError> {
        let total = self.uploader.total_parts();
        let workers = self.max_concurrency.max(1).min(total as usize);
        let cursor = Arc::new(AtomicU32::new(1));
        let stop = self.cancel.child_token();
        let (tx, mut rx) = mpsc::channel(workers.max(1) * 2);

        debug!(total_parts = total, workers, "starting part workers");
        let mut pool = JoinSet::new();
        for worker in 0..workers {
            let uploader = Arc::clone(&self.uploader);
            let cursor = Arc::clone(&cursor);
            let stop = stop.clone();
            let cancel = self.cancel.clone();
            let tx = tx.clone();
            pool.spawn(async move {
                loop {
                    if stop.is_cancelled() {
                        break;
                    }
                    let part_number = cursor.fetch_add(1, Ordering::SeqCst);
                    if part_number > total {
                        break;
                    }
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        r = uploader.upload_part(part_number) => r,
                    };
                    let failed = result.is_err();
                    if tx.send(result).await.is_err() || failed {
                        break;
                    }
                }
                debug!(worker, "part worker finished");
            });
        }
        drop(tx);

        let mut parts = Vec::with_capacity(total as usize);
        let mut failure: Option<UploadError> = None;
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled(), if failure.is_none() => {
                    failure = Some(UploadError::Cancelled);
                    stop.cancel();
                }
                msg = rx.recv() => match msg {
                    Some(Ok(part)) if failure.is_none() => self.record(part, &mut parts).await,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        if failure.is_none() {
                            warn!(error = %e, "part failed, stopping workers");
                            failure = Some(e);
                            stop.cancel();
                        }
                    }
                    None => break,
                },
            }
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                if failure.is_none() {
                    failure = Some(UploadError::Worker(e.to_string()));
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => order_parts(parts, total),
        }
    }

    async fn record(&self, part: PartDescriptor, parts: &mut Vec<PartDescriptor>) {
        let bytes = self.uploader.part_len(part.part_number);
        let completed = self.progress.record_part(bytes);
        emit(
            &self.events,
            UploadEvent::PartUploaded {
                part_number: part.part_number,
                bytes,
            },
        )
        .await;
        emit(
            &self.events,
            UploadEvent::Progress {
                parts_completed: completed,
                total_parts: self.progress.total_parts(),
                percent: self.progress.percent(),
                bytes_uploaded: self.progress.uploaded_bytes(),
                total_bytes: self.progress.total_bytes(),
                bytes_per_second: self.progress.bytes_per_second(),
                eta: self.progress.eta(),
            },
        )
        .await;
        parts.push(part);
    }
}

/// Sorts `parts` by part number and checks they are exactly `1..=total`.
pub fn order_parts(
    mut parts: Vec<PartDescriptor>,
    total: u32,
) -> Result<Vec<PartDescriptor>, UploadError> {
    parts.sort_by_key(|p| p.part_number);
    if parts.len() != total as usize {
        return Err(UploadError::IncompleteParts(format!(
            "expected {total} parts, got {}",
            parts.len()
        )));
    }
    for (expected, part) in (1..=total).zip(&parts) {
        if part.part_number != expected {
            return Err(UploadError::IncompleteParts(format!(
                "expected part {expected}, found {}",
                part.part_number
            )));
        }
    }
    Ok(parts)
}
