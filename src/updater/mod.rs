//! Self-update flow: release discovery, artifact acquisition, and install
//! hand-off.
//!
//! Consumed by the embedded-page bridge (manual checks, version queries) and
//! by hosts that run a silent check at startup. Nothing here persists across
//! process restarts; every check starts from zero state.

mod check;
mod download;
mod flow;
mod github;
mod install;
mod version;

pub use check::{CheckMode, UpdateCheckOutcome, UpdateCheckRequest, check_for_updates};
pub use download::{
    DownloadId, DownloadNotice, DownloadOutcome, DownloadSession, Downloads, artifact_file_name,
    remove_stale_artifact,
};
pub use flow::{UpdateController, UpdateDecision, UpdateEvent, UpdatePhase};
pub use github::ReleaseInfo;
pub use install::{
    AuthorizationProbe, InstallAuthorization, PlatformProbe, install, open_settings,
};
pub use version::{VersionNumber, is_newer};

/// Canonical app name used in artifact file names.
pub const APP_NAME: &str = "loancalc";
/// Canonical GitHub repository slug (`OWNER/REPO`) used for update checks.
pub const REPO_SLUG: &str = "boyprince03/loanCalc";
/// Base URL of the release metadata feed host.
pub const RELEASE_FEED_BASE: &str = "https://api.github.com";

/// Failures of the update flow. All are recovered locally: the check
/// returns to idle and nothing is fatal to the host. An unparseable version
/// tag is deliberately absent here — it is the "not newer" outcome, not an
/// error.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// Network, parse, or missing-field failure while reading the feed.
    #[error("Update check failed: {0}")]
    Fetch(String),
    /// The artifact transfer failed.
    #[error("Download failed: {0}")]
    Download(String),
    /// The system installer could not be started.
    #[error("Could not start the installer: {0}")]
    InstallLaunch(String),
    /// The platform requires user action before installs can proceed.
    #[error("Installing updates is not authorized yet; allow it under {settings}")]
    InstallUnauthorized { settings: String },
}
