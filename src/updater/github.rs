use serde::Deserialize;
use url::Url;

use crate::http_client;

use super::UpdateError;

const MAX_METADATA_BYTES: usize = 1024 * 1024;

pub(super) const USER_AGENT: &str = "loancalc-updater";

#[derive(Debug, Clone, Deserialize)]
struct ReleaseAsset {
    browser_download_url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Release {
    tag_name: String,
    body: String,
    assets: Vec<ReleaseAsset>,
}

/// The latest published release, fetched per check and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    /// Version label as published (may carry a leading `v`).
    pub tag: String,
    /// Free-text release notes, shown to the user verbatim.
    pub notes: String,
    /// Direct URL to the installable artifact.
    pub download_url: String,
}

/// Fetch the latest release from `{feed_base}/repos/{repo}/releases/latest`.
pub(super) fn fetch_latest_release(feed_base: &str, repo: &str) -> Result<ReleaseInfo, UpdateError> {
    let url = format!("{}/repos/{repo}/releases/latest", feed_base.trim_end_matches('/'));
    let release: Release = get_json(&url)?;
    release_info(release)
}

fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T, UpdateError> {
    let response = http_client::agent()
        .get(url)
        .set("User-Agent", USER_AGENT)
        .set("Accept", "application/vnd.github+json")
        .call()
        .map_err(|err| UpdateError::Fetch(err.to_string()))?;
    let bytes = http_client::read_response_bytes(response, MAX_METADATA_BYTES)
        .map_err(|err| UpdateError::Fetch(err.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|err| UpdateError::Fetch(err.to_string()))
}

// A release without a downloadable asset is indistinguishable from a failed
// fetch for the caller; both end the check the same way.
fn release_info(release: Release) -> Result<ReleaseInfo, UpdateError> {
    let asset = release
        .assets
        .first()
        .ok_or_else(|| UpdateError::Fetch("Release has no downloadable assets".into()))?;
    let download_url = Url::parse(&asset.browser_download_url)
        .map_err(|err| UpdateError::Fetch(format!("Invalid asset URL: {err}")))?;
    Ok(ReleaseInfo {
        tag: release.tag_name.trim().to_string(),
        notes: release.body,
        download_url: download_url.as_str().to_owned(),
    })
}
