//! Wires the HTTP transport to the upload controller and drives one upload.

use std::path::Path;
use std::sync::Arc;

use parcel_http::{HttpControlPlane, HttpStorage};
use parcel_protocol::constants::DEFAULT_CONTENT_TYPE;
use parcel_uploader::{UploadController, UploadEvent, UploadOutcome};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::content_type::detect_content_type;

/// Uploads `file`, cancelling on Ctrl-C.
pub async fn run(
    config: Config,
    file: &Path,
    content_type: Option<String>,
) -> anyhow::Result<UploadOutcome> {
    let timeout = config.request_timeout();
    let control = HttpControlPlane::new(&config.server_url, timeout)?;
    let storage = HttpStorage::new(timeout)?;

    let mut controller = UploadController::new(Arc::new(control), Arc::new(storage), config.upload)?;
    let events = controller.take_events();
    let controller = Arc::new(controller);

    controller.select_path(file)?;
    let content_type = content_type
        .or_else(|| detect_content_type(file).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let reporter = events.map(|rx| tokio::spawn(report(rx)));

    let canceller = Arc::clone(&controller);
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling upload");
            canceller.cancel();
        }
    });

    tracing::info!(
        file = %file.display(),
        content_type = %content_type,
        chunk_size = controller.config().chunk_size,
        concurrency = controller.config().max_concurrency,
        "starting upload"
    );
    let result = controller.start(&content_type).await;
    signal.abort();
    let _ = signal.await;
    drop(controller);
    if let Some(reporter) = reporter {
        let _ = reporter.await;
    }

    Ok(result?)
}

/// Logs upload events until the controller goes away.
async fn report(mut rx: mpsc::Receiver<UploadEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            UploadEvent::Initiated {
                upload_id,
                key,
                total_parts,
            } => {
                tracing::info!(upload_id = %upload_id, key = %key, total_parts, "session opened");
            }
            UploadEvent::Progress {
                parts_completed,
                total_parts,
                percent,
                bytes_uploaded,
                total_bytes,
                bytes_per_second,
                eta,
            } => {
                let eta = eta.map_or_else(|| "-".to_string(), |d| format!("{}s", d.as_secs()));
                tracing::info!(
                    bytes = bytes_uploaded,
                    total_bytes,
                    eta = %eta,
                    "{percent}% ({parts_completed}/{total_parts} parts, {:.1} MiB/s)",
                    bytes_per_second / (1024.0 * 1024.0)
                );
            }
            UploadEvent::Aborted { key, success, .. } => {
                tracing::info!(key = %key, success, "session aborted");
            }
            UploadEvent::Failed { error } => {
                tracing::error!(error = %error, "upload failed");
            }
            UploadEvent::StatusChanged { status } => {
                tracing::debug!(status = %status, "status changed");
            }
            UploadEvent::PartUploaded { part_number, bytes } => {
                tracing::debug!(part = part_number, bytes, "part uploaded");
            }
            UploadEvent::Completed { .. } => {}
        }
    }
}
