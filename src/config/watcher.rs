//! Hot reload of the configuration file and its manifest.
//!
//! Watches the parent directories rather than the files themselves so
//! editors that save by rename keep triggering reloads. Only validated
//! configurations are forwarded; a broken edit leaves the running one in
//! place.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatekeeperConfig;

pub struct ConfigWatcher {
    config_path: PathBuf,
    /// Files whose change triggers a reload.
    watched: Vec<PathBuf>,
    update_tx: mpsc::UnboundedSender<GatekeeperConfig>,
}

impl ConfigWatcher {
    /// `manifest_path` is the JSON manifest named by the config, if any.
    pub fn new(
        config_path: &Path,
        manifest_path: Option<&Path>,
    ) -> (Self, mpsc::UnboundedReceiver<GatekeeperConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watched = std::iter::once(config_path)
            .chain(manifest_path)
            .map(Path::to_path_buf)
            .collect();

        (
            Self {
                config_path: config_path.to_path_buf(),
                watched,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. Events stop when the returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            config_path,
            watched,
            update_tx,
        } = self;
        let directories: BTreeSet<PathBuf> = watched.iter().map(|p| parent_dir(p)).collect();
        let handler_watched = watched.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_relevant(&event, &handler_watched) => {
                    reload(&config_path, &update_tx);
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        for dir in &directories {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
        }

        tracing::info!(files = ?watched, "Config watcher started");
        Ok(watcher)
    }
}

fn reload(config_path: &Path, update_tx: &mpsc::UnboundedSender<GatekeeperConfig>) {
    match load_config(config_path) {
        Ok(config) => {
            tracing::info!(path = %config_path.display(), "Config change detected");
            if update_tx.send(config).is_err() {
                tracing::debug!("Reload receiver gone; dropping update");
            }
        }
        Err(e) => tracing::error!(
            error = %e,
            "Reloaded config rejected; keeping current configuration"
        ),
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// A write, create or rename touching one of the watched files.
fn is_relevant(event: &Event, watched: &[PathBuf]) -> bool {
    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|changed| watched.iter().any(|w| changed.ends_with(w)))
}
