//! Artifact acquisition through a background transfer facility.
//!
//! `Downloads` mirrors a system download manager: callers enqueue a URL and
//! receive an opaque handle immediately; when the transfer finishes, exactly
//! one completion notice carrying that handle is posted on the facility's
//! shared channel. Notices for other transfers arrive on the same channel,
//! so consumers must filter by handle. There is no cancellation path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use url::Url;

use crate::http_client;

use super::github::USER_AGENT;
use super::{APP_NAME, UpdateError};

const MAX_ARTIFACT_BYTES: usize = 512 * 1024 * 1024;

/// Opaque handle identifying one enqueued transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadId(u64);

#[cfg(test)]
impl DownloadId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// Terminal result of a transfer.
#[derive(Debug, Clone)]
pub enum DownloadOutcome {
    /// The artifact is fully written at the destination path.
    Completed(PathBuf),
    /// The transfer failed; no file exists under the destination name.
    Failed(String),
}

/// Completion notification posted exactly once per enqueued transfer.
#[derive(Debug, Clone)]
pub struct DownloadNotice {
    pub id: DownloadId,
    pub outcome: DownloadOutcome,
}

/// Transient record of the one in-flight artifact transfer.
///
/// Created by an acquire, destroyed when its completion notice is consumed.
#[derive(Debug)]
pub struct DownloadSession {
    /// Handle the completion notice must match.
    pub id: DownloadId,
    /// Release tag the artifact belongs to.
    pub tag: String,
    /// Destination path of the artifact.
    pub dest: PathBuf,
}

/// Background transfer facility with a single shared completion channel.
pub struct Downloads {
    next_id: AtomicU64,
    notice_tx: Sender<DownloadNotice>,
}

impl Downloads {
    /// Create the facility and the receiving end of its completion channel.
    pub fn new() -> (Self, Receiver<DownloadNotice>) {
        let (notice_tx, notice_rx) = mpsc::channel();
        (
            Self {
                next_id: AtomicU64::new(1),
                notice_tx,
            },
            notice_rx,
        )
    }

    /// Enqueue a transfer of `url` to `dest` and return its handle.
    ///
    /// The transfer runs on its own thread; the calling thread never blocks.
    pub fn enqueue(&self, url: String, dest: PathBuf) -> DownloadId {
        let id = DownloadId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let tx = self.notice_tx.clone();
        thread::spawn(move || {
            let outcome = match transfer(&url, &dest) {
                Ok(()) => DownloadOutcome::Completed(dest),
                Err(err) => {
                    tracing::warn!("Artifact transfer failed: {err}");
                    DownloadOutcome::Failed(err.to_string())
                }
            };
            let _ = tx.send(DownloadNotice { id, outcome });
        });
        id
    }
}

/// File name for a release artifact, derived from its tag so a retried
/// download of the same release overwrites cleanly instead of accumulating
/// duplicates. The extension follows the published asset.
pub fn artifact_file_name(tag: &str, download_url: &str) -> String {
    let tag = sanitize_component(tag);
    let extension = Url::parse(download_url)
        .ok()
        .and_then(|url| {
            Path::new(url.path())
                .extension()
                .and_then(|ext| ext.to_str())
                .map(sanitize_component)
        })
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "bin".to_string());
    format!("{APP_NAME}-{tag}.{extension}")
}

/// Delete a leftover artifact from an earlier attempt, tolerating absence.
pub fn remove_stale_artifact(dest: &Path) -> Result<(), io::Error> {
    match fs::remove_file(dest) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

fn sanitize_component(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

// Streams into a temp file beside the destination and persists on success,
// so a failed transfer never leaves a partial file under the final name.
fn transfer(url: &str, dest: &Path) -> Result<(), UpdateError> {
    let dir = dest
        .parent()
        .ok_or_else(|| UpdateError::Download("Destination has no parent directory".into()))?;
    let response = http_client::agent()
        .get(url)
        .set("User-Agent", USER_AGENT)
        .call()
        .map_err(|err| UpdateError::Download(err.to_string()))?;
    let mut staged = tempfile::NamedTempFile::new_in(dir)
        .map_err(|err| UpdateError::Download(format!("Could not stage download: {err}")))?;
    http_client::copy_response_to_writer(response, staged.as_file_mut(), MAX_ARTIFACT_BYTES)
        .map_err(|err| UpdateError::Download(err.to_string()))?;
    staged
        .persist(dest)
        .map_err(|err| UpdateError::Download(format!("Could not place artifact: {err}")))?;
    Ok(())
}
