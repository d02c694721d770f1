//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself, so the watch
//! survives editors that save by writing a temp file and renaming it over the
//! original. Only events naming the config file trigger a reload, and a
//! reload whose result equals the last applied file is dropped.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::RelayConfig;

/// Sends every successfully validated change of one config file.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<RelayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end for validated updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RelayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Updates stop when the returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, update_tx } = self;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let file = path.clone();
        // Raw text of the last file applied.
        let mut last_applied = std::fs::read_to_string(&file).ok();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &file) => {
                    // Missing (mid-rename) or truncated (mid-write): a later event follows.
                    let current = match std::fs::read_to_string(&file) {
                        Ok(text) if !text.trim().is_empty() => text,
                        _ => return,
                    };
                    if last_applied.as_deref() == Some(current.as_str()) {
                        return;
                    }

                    tracing::info!(path = ?file, "Config file changed, reloading");
                    match load_config(&file) {
                        Ok(config) => {
                            last_applied = Some(current);
                            let _ = update_tx.send(config);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Rejected config change, keeping current configuration")
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

/// Whether `event` is a write, create or rename that involves `file`.
fn touches(event: &Event, file: &Path) -> bool {
    let relevant = matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_));
    relevant && event.paths.iter().any(|p| same_file_name(p, file))
}

fn same_file_name(a: &Path, b: &Path) -> bool {
    a.file_name().is_some() && a.file_name() == b.file_name()
}
