//! Update subsystem for the loancalc app shell.
/// Application directory helpers.
pub mod app_dirs;
/// Persisted application preferences.
pub mod config;
/// Logging setup.
pub mod logging;
/// Release checking, artifact download, and install hand-off.
pub mod updater;

pub(crate) mod http_client;
