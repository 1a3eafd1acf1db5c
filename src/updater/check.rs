use super::github::{self, ReleaseInfo};
use super::{RELEASE_FEED_BASE, UpdateError, version};

/// How a check was initiated. Manual checks always produce a visible
/// outcome; automatic checks fail silently (log only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    Automatic,
    Manual,
}

/// Input for checking whether a newer build exists.
#[derive(Debug, Clone)]
pub struct UpdateCheckRequest {
    /// GitHub repository slug (`OWNER/REPO`).
    pub repo: String,
    /// Base URL of the release feed host.
    pub feed_base: String,
    /// Version string of the running build, read at call time.
    pub current_version: String,
    /// Who initiated the check.
    pub mode: CheckMode,
}

impl UpdateCheckRequest {
    /// Build a request against the canonical release feed host.
    pub fn new(
        repo: impl Into<String>,
        current_version: impl Into<String>,
        mode: CheckMode,
    ) -> Self {
        Self {
            repo: repo.into(),
            feed_base: RELEASE_FEED_BASE.to_string(),
            current_version: current_version.into(),
            mode,
        }
    }
}

/// Result of an update check.
#[derive(Debug, Clone)]
pub enum UpdateCheckOutcome {
    /// No newer release found (including unparseable tags).
    UpToDate,
    /// A newer release is available for acquisition.
    UpdateAvailable(ReleaseInfo),
}

/// Fetch the latest release and decide whether it is newer than the running
/// build. An unparseable tag or local version yields `UpToDate`.
pub fn check_for_updates(request: &UpdateCheckRequest) -> Result<UpdateCheckOutcome, UpdateError> {
    let release = github::fetch_latest_release(&request.feed_base, &request.repo)?;
    if version::is_newer(&release.tag, &request.current_version) {
        Ok(UpdateCheckOutcome::UpdateAvailable(release))
    } else {
        Ok(UpdateCheckOutcome::UpToDate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::test_server::{http_response, serve_once};

    fn release_json(tag: &str) -> String {
        format!(
            r#"{{ "tag_name": "{tag}", "body": "notes", "assets": [ {{ "browser_download_url": "https://example.invalid/pkg.apk" }} ] }}"#
        )
    }

    fn request(feed_base: String, current: &str) -> UpdateCheckRequest {
        let mut request = UpdateCheckRequest::new("acme/loancalc", current, CheckMode::Manual);
        request.feed_base = feed_base;
        request
    }

    #[test]
    fn newer_tag_reports_update_available() {
        let base = serve_once(http_response("200 OK", &release_json("v2.0.0")));
        let outcome = check_for_updates(&request(base, "1.9.9")).unwrap();
        match outcome {
            UpdateCheckOutcome::UpdateAvailable(release) => assert_eq!(release.tag, "v2.0.0"),
            UpdateCheckOutcome::UpToDate => panic!("expected an available update"),
        }
    }

    #[test]
    fn equal_versions_report_up_to_date() {
        let base = serve_once(http_response("200 OK", &release_json("v1.2")));
        let outcome = check_for_updates(&request(base, "1.2.0")).unwrap();
        assert!(matches!(outcome, UpdateCheckOutcome::UpToDate));
    }

    #[test]
    fn malformed_tag_reports_up_to_date() {
        let base = serve_once(http_response("200 OK", &release_json("v1.9-beta")));
        let outcome = check_for_updates(&request(base, "1.0.0")).unwrap();
        assert!(matches!(outcome, UpdateCheckOutcome::UpToDate));
    }

    #[test]
    fn fetch_failure_surfaces_as_error() {
        let base = serve_once(http_response("404 Not Found", "missing"));
        let err = check_for_updates(&request(base, "1.0.0")).unwrap_err();
        assert!(matches!(err, UpdateError::Fetch(_)));
    }
}
