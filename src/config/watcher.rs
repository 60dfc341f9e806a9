//! Hot reload of the configuration file.
//!
//! The parent directory is watched rather than the file, so saves that
//! replace the file by rename keep triggering reloads. Events for other
//! files in that directory are ignored.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::MiddlewareConfig;

/// Publishes a freshly validated [`MiddlewareConfig`] whenever the file
/// changes. Invalid edits are logged and skipped.
pub struct ConfigWatcher {
    path: PathBuf,
    updates: mpsc::UnboundedSender<MiddlewareConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end of its update channel.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<MiddlewareConfig>) {
        let (updates, receiver) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            updates,
        };
        (watcher, receiver)
    }

    /// Start watching. Reloads stop when the returned handle is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let directory = watched_directory(&self.path);
        let file_name = self.path.file_name().map(OsString::from);
        let path = self.path;
        let updates = self.updates;

        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| match result {
                Ok(event) if touches(&event, file_name.as_deref()) => reload(&path, &updates),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        tracing::info!(directory = %directory.display(), "Config watcher started");
        Ok(watcher)
    }
}

fn watched_directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Whether `event` writes, creates or renames onto the config file.
fn touches(event: &Event, file_name: Option<&OsStr>) -> bool {
    if !(event.kind.is_modify() || event.kind.is_create()) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|p| p.file_name().is_some() && p.file_name() == file_name)
}

fn reload(path: &Path, updates: &mpsc::UnboundedSender<MiddlewareConfig>) {
    match load_config(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "Config file changed, reloading");
            if updates.send(config).is_err() {
                tracing::warn!(
                    path = %path.display(),
                    "Config update dropped, no receiver is listening"
                );
            }
        }
        Err(e) => tracing::error!(
            path = %path.display(),
            error = %e,
            "Failed to reload config, keeping current configuration"
        ),
    }
}
