//! Hot reload of the configuration file.
//!
//! Only the URL policy follows reloads, so a reload is forwarded when it
//! parses, validates and changes the storage URL. Anything else is logged
//! and dropped.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::EdgeConfig;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Watches one configuration file and forwards policy-relevant reloads.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<EdgeConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end for reloaded configs.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<EdgeConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching on notify's background thread.
    ///
    /// Dropping the returned handle stops the reloads.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, update_tx } = self;
        let watched = path.clone();
        let mut storage_url = load_config(&path)
            .ok()
            .and_then(|config| config.image_proxy.storage_url);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = ?e, "Config watch error");
                        return;
                    }
                };
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }
                if let Some(config) = reload(&path, &mut storage_url) {
                    let _ = update_tx.send(config);
                }
            },
            Config::default().with_poll_interval(POLL_INTERVAL),
        )?;

        watcher.watch(&watched, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?watched, "Config watcher started");
        Ok(watcher)
    }
}

/// Reload `path`, returning the config when its storage URL differs from
/// `last`. `last` tracks the most recently forwarded value.
fn reload(path: &Path, last: &mut Option<String>) -> Option<EdgeConfig> {
    match load_config(path) {
        Ok(config) if config.image_proxy.storage_url == *last => {
            tracing::debug!(path = ?path, "Config reloaded, URL policy unchanged");
            None
        }
        Ok(config) => {
            tracing::info!(
                path = ?path,
                storage_url = ?config.image_proxy.storage_url,
                "Config reloaded"
            );
            last.clone_from(&config.image_proxy.storage_url);
            Some(config)
        }
        Err(e) => {
            tracing::error!(
                path = ?path,
                error = %e,
                "Failed to reload config, keeping current configuration"
            );
            None
        }
    }
}
