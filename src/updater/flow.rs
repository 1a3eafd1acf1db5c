//! Per-check state machine and host-facing controller.
//!
//! The check is modeled as an explicit phase value owned by
//! [`UpdateController`]. Fetches and transfers run on worker threads and
//! report back over channels; the host drains those channels from its
//! interactive thread via [`UpdateController::poll`] and renders the
//! returned [`UpdateEvent`]s. Terminal outcomes always return the phase to
//! [`UpdatePhase::Idle`]; nothing in the flow retries itself.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use crate::config::UpdateSettings;

use super::check::{self, CheckMode, UpdateCheckOutcome, UpdateCheckRequest};
use super::download::{
    DownloadNotice, DownloadOutcome, DownloadSession, Downloads, artifact_file_name,
    remove_stale_artifact,
};
use super::github::ReleaseInfo;
use super::install::{self, AuthorizationProbe, PlatformProbe};
use super::UpdateError;

/// Non-terminal states of one check invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    Idle,
    Fetching,
    UpdateAvailable,
    Downloading,
}

/// The three choices offered to the user when a newer release is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateDecision {
    /// Close the prompt and do nothing.
    Dismiss,
    /// Fetch silently; the user finds out when the installer launches.
    BackgroundFetch,
    /// Fetch with a visible progress indicator.
    InteractiveFetch,
}

/// User-visible outcomes emitted by the controller.
///
/// Every surface the flow can show goes through here so hosts render on
/// their interactive thread regardless of which worker produced the event.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEvent {
    /// A newer release exists; present tag and notes with the three choices.
    UpdateAvailable { tag: String, notes: String },
    /// Manual check found nothing newer.
    UpToDate,
    /// Manual check failed. Automatic checks log instead of emitting this.
    CheckFailed { message: String },
    /// An artifact transfer began.
    DownloadStarted { with_progress: bool },
    /// The artifact transfer failed; the flow is idle again.
    DownloadFailed { message: String },
    /// The artifact was handed to the system installer.
    InstallLaunched { artifact: PathBuf },
    /// Authorization must be granted in system settings first; the flow
    /// ended and the user must re-trigger the update afterwards.
    InstallAuthorizationNeeded { settings: String },
    /// The installer could not be started; the artifact stays on disk for a
    /// manual install.
    InstallLaunchFailed { message: String, artifact: PathBuf },
    /// Progress indicator hidden on request; the transfer continues and the
    /// finished file can be picked up at this location.
    ProgressDismissed { location: PathBuf },
}

struct CheckMessage {
    mode: CheckMode,
    result: Result<UpdateCheckOutcome, UpdateError>,
}

/// Drives check, acquire, and install for one host.
pub struct UpdateController {
    repo: String,
    feed_base: String,
    current_version: String,
    download_dir: PathBuf,
    probe: Box<dyn AuthorizationProbe>,
    phase: UpdatePhase,
    available: Option<ReleaseInfo>,
    session: Option<DownloadSession>,
    progress_visible: bool,
    downloads: Downloads,
    download_rx: Receiver<DownloadNotice>,
    check_tx: Sender<CheckMessage>,
    check_rx: Receiver<CheckMessage>,
}

impl UpdateController {
    /// Create a controller for the configured repository.
    ///
    /// `current_version` is the running build's version string, read by the
    /// host at call time; `download_dir` is the application-scoped location
    /// artifacts are placed in.
    pub fn new(
        settings: &UpdateSettings,
        current_version: impl Into<String>,
        download_dir: PathBuf,
    ) -> Self {
        let (downloads, download_rx) = Downloads::new();
        let (check_tx, check_rx) = mpsc::channel();
        Self {
            repo: settings.repo.clone(),
            feed_base: super::RELEASE_FEED_BASE.to_string(),
            current_version: current_version.into(),
            download_dir,
            probe: Box::new(PlatformProbe),
            phase: UpdatePhase::Idle,
            available: None,
            session: None,
            progress_visible: false,
            downloads,
            download_rx,
            check_tx,
            check_rx,
        }
    }

    /// Point the controller at a different release feed host.
    pub fn with_feed_base(mut self, feed_base: impl Into<String>) -> Self {
        self.feed_base = feed_base.into();
        self
    }

    /// Replace the install-authorization probe.
    pub fn with_probe(mut self, probe: Box<dyn AuthorizationProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Current phase of the flow.
    pub fn phase(&self) -> UpdatePhase {
        self.phase
    }

    /// The release awaiting a decision, if any.
    pub fn available_release(&self) -> Option<&ReleaseInfo> {
        self.available.as_ref()
    }

    /// The in-flight download session, if any.
    pub fn active_download(&self) -> Option<&DownloadSession> {
        self.session.as_ref()
    }

    /// Whether the progress indicator should currently be shown.
    pub fn progress_visible(&self) -> bool {
        self.progress_visible
    }

    /// Start a silent background check. Failures are logged, never shown.
    pub fn check_automatically(&mut self) -> Vec<UpdateEvent> {
        self.begin_check(CheckMode::Automatic)
    }

    /// Start a user-requested check. Every outcome is user-visible.
    pub fn check_manually(&mut self) -> Vec<UpdateEvent> {
        self.begin_check(CheckMode::Manual)
    }

    /// Apply the user's decision on an available release.
    pub fn resolve(&mut self, decision: UpdateDecision) -> Vec<UpdateEvent> {
        if self.phase != UpdatePhase::UpdateAvailable {
            return Vec::new();
        }
        let Some(release) = self.available.take() else {
            self.phase = UpdatePhase::Idle;
            return Vec::new();
        };
        match decision {
            UpdateDecision::Dismiss => {
                self.phase = UpdatePhase::Idle;
                Vec::new()
            }
            UpdateDecision::BackgroundFetch => self.begin_acquire(release, false),
            UpdateDecision::InteractiveFetch => self.begin_acquire(release, true),
        }
    }

    /// Hide the progress indicator. Cosmetic only: the transfer continues,
    /// and the event tells the user where the finished file will land.
    pub fn dismiss_progress(&mut self) -> Option<UpdateEvent> {
        if !self.progress_visible {
            return None;
        }
        self.progress_visible = false;
        self.session
            .as_ref()
            .map(|session| UpdateEvent::ProgressDismissed {
                location: session.dest.clone(),
            })
    }

    /// Drain pending worker results and return the events to render.
    ///
    /// Call from the interactive thread; this never blocks.
    pub fn poll(&mut self) -> Vec<UpdateEvent> {
        let mut events = Vec::new();
        while let Ok(message) = self.check_rx.try_recv() {
            self.apply_check_message(message, &mut events);
        }
        while let Ok(notice) = self.download_rx.try_recv() {
            self.apply_notice(notice, &mut events);
        }
        events
    }

    fn begin_check(&mut self, mode: CheckMode) -> Vec<UpdateEvent> {
        match self.phase {
            UpdatePhase::Fetching | UpdatePhase::Downloading => return Vec::new(),
            UpdatePhase::UpdateAvailable => {
                // An undecided prompt wins over a fresh check; re-surface it
                // for a manual request.
                return match (&self.available, mode) {
                    (Some(release), CheckMode::Manual) => vec![UpdateEvent::UpdateAvailable {
                        tag: release.tag.clone(),
                        notes: release.notes.clone(),
                    }],
                    _ => Vec::new(),
                };
            }
            UpdatePhase::Idle => {}
        }
        let mut request =
            UpdateCheckRequest::new(self.repo.clone(), self.current_version.clone(), mode);
        request.feed_base = self.feed_base.clone();
        self.phase = UpdatePhase::Fetching;
        let tx = self.check_tx.clone();
        thread::spawn(move || {
            let result = check::check_for_updates(&request);
            let _ = tx.send(CheckMessage { mode, result });
        });
        Vec::new()
    }

    fn apply_check_message(&mut self, message: CheckMessage, events: &mut Vec<UpdateEvent>) {
        if self.phase != UpdatePhase::Fetching {
            return;
        }
        match message.result {
            Ok(UpdateCheckOutcome::UpdateAvailable(release)) => {
                self.phase = UpdatePhase::UpdateAvailable;
                events.push(UpdateEvent::UpdateAvailable {
                    tag: release.tag.clone(),
                    notes: release.notes.clone(),
                });
                self.available = Some(release);
            }
            Ok(UpdateCheckOutcome::UpToDate) => {
                self.phase = UpdatePhase::Idle;
                match message.mode {
                    CheckMode::Manual => events.push(UpdateEvent::UpToDate),
                    CheckMode::Automatic => tracing::debug!("No newer release found"),
                }
            }
            Err(err) => {
                self.phase = UpdatePhase::Idle;
                match message.mode {
                    CheckMode::Manual => events.push(UpdateEvent::CheckFailed {
                        message: err.to_string(),
                    }),
                    CheckMode::Automatic => {
                        tracing::warn!("Silent update check failed: {err}");
                    }
                }
            }
        }
    }

    fn begin_acquire(&mut self, release: ReleaseInfo, with_progress: bool) -> Vec<UpdateEvent> {
        // Replacing the session wholesale drops any stale handle pairing
        // from an earlier acquire before the new transfer is enqueued.
        self.session = None;
        let dest = self
            .download_dir
            .join(artifact_file_name(&release.tag, &release.download_url));
        if let Err(err) = remove_stale_artifact(&dest) {
            self.phase = UpdatePhase::Idle;
            return vec![UpdateEvent::DownloadFailed {
                message: format!("Could not replace the previous download: {err}"),
            }];
        }
        let id = self
            .downloads
            .enqueue(release.download_url.clone(), dest.clone());
        self.session = Some(DownloadSession {
            id,
            tag: release.tag,
            dest,
        });
        self.phase = UpdatePhase::Downloading;
        self.progress_visible = with_progress;
        vec![UpdateEvent::DownloadStarted { with_progress }]
    }

    fn apply_notice(&mut self, notice: DownloadNotice, events: &mut Vec<UpdateEvent>) {
        if !self
            .session
            .as_ref()
            .is_some_and(|session| session.id == notice.id)
        {
            tracing::debug!("Ignoring completion notice for an untracked download");
            return;
        }
        // Consuming the matching notice destroys the session; the handle
        // pairing ends here and repeated notices no longer match anything.
        self.session = None;
        self.progress_visible = false;
        self.phase = UpdatePhase::Idle;
        match notice.outcome {
            DownloadOutcome::Completed(artifact) => {
                match install::install(&artifact, self.probe.as_ref()) {
                    Ok(()) => events.push(UpdateEvent::InstallLaunched { artifact }),
                    Err(UpdateError::InstallUnauthorized { settings }) => {
                        events.push(UpdateEvent::InstallAuthorizationNeeded { settings });
                    }
                    Err(err) => events.push(UpdateEvent::InstallLaunchFailed {
                        message: err.to_string(),
                        artifact,
                    }),
                }
            }
            DownloadOutcome::Failed(message) => {
                events.push(UpdateEvent::DownloadFailed { message });
            }
        }
    }
}
