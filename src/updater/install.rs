//! Hand-off of a downloaded artifact to the platform install flow.
//!
//! The only genuinely platform-coupled decision in the update flow is
//! whether side-loaded installs need a user-granted authorization first.
//! That decision is isolated behind [`AuthorizationProbe`] as a tri-state
//! capability query instead of a platform-version branch.

use std::path::Path;

use super::UpdateError;

/// Platform capability state for side-loaded package installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallAuthorization {
    /// The platform allows this app to hand packages to its installer.
    Authorized,
    /// The user must grant authorization in system settings before the
    /// install can proceed.
    NeedsPrompt,
    /// The platform has no side-load authorization gate.
    NotApplicable,
}

/// Queries the platform's side-load authorization state.
pub trait AuthorizationProbe {
    /// Current authorization state.
    fn authorization(&self) -> InstallAuthorization;

    /// Settings destination the user should visit when authorization is
    /// missing. Shown verbatim in the explanatory prompt.
    fn settings_destination(&self) -> String;
}

/// Probe for the build's target platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformProbe;

impl AuthorizationProbe for PlatformProbe {
    fn authorization(&self) -> InstallAuthorization {
        // Desktop targets route installs through the OS package handler,
        // which applies its own trust UI; there is no pre-launch gate to
        // query here.
        InstallAuthorization::NotApplicable
    }

    fn settings_destination(&self) -> String {
        "the system's application install settings".to_string()
    }
}

/// Hand a downloaded artifact to the system's package-install flow.
///
/// The flow ends on `InstallUnauthorized`; the user must re-trigger the
/// update after granting authorization. There is no automatic resumption.
pub fn install(artifact: &Path, probe: &dyn AuthorizationProbe) -> Result<(), UpdateError> {
    if !artifact.is_file() {
        return Err(UpdateError::InstallLaunch(format!(
            "Installer file missing at {}",
            artifact.display()
        )));
    }
    if probe.authorization() == InstallAuthorization::NeedsPrompt {
        return Err(UpdateError::InstallUnauthorized {
            settings: probe.settings_destination(),
        });
    }
    open::that(artifact).map_err(|err| UpdateError::InstallLaunch(err.to_string()))
}

/// Best-effort open of a settings destination after an authorization prompt.
pub fn open_settings(destination: &str) -> Result<(), String> {
    open::that(destination).map_err(|err| err.to_string())
}
