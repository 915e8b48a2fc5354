//! Live settings shared by the engine and the web front end
//!
//! `SettingsStore` publishes the current [`Config`] through a watch channel.
//! Readers take a cheap `Arc` clone per refresh cycle, so a reload is picked
//! up on the next tick without restarting anything.

use crate::config::Config;
use crate::error::Result;
use crate::logging::get_logger;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How often the watcher checks the file's modification time
pub const WATCH_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct SettingsStore {
    tx: watch::Sender<Arc<Config>>,
}

impl SettingsStore {
    pub fn new(config: Config) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(config));
        Self { tx }
    }

    /// Configuration in effect right now
    pub fn current(&self) -> Arc<Config> {
        self.tx.borrow().clone()
    }

    /// Publish a new configuration after validating it
    pub fn replace(&self, config: Config) -> Result<()> {
        config.validate()?;
        self.tx.send_replace(Arc::new(config));
        Ok(())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Config>> {
        self.tx.subscribe()
    }

    /// Reload `path` now, applying environment overrides
    pub fn reload_from(&self, path: &Path) -> Result<()> {
        let config = Config::load_from(Some(path))?;
        self.replace(config)
    }

    /// Poll `path` for changes until `shutdown` flips to true
    ///
    /// At most one reload per poll interval. A file that fails to parse or
    /// validate is logged and the previous configuration stays in effect.
    pub fn spawn_file_watcher(
        &self,
        path: PathBuf,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let logger = get_logger("settings");
            let mut last_seen = modified_at(&path);
            let mut ticker = tokio::time::interval(WATCH_POLL_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                let current = modified_at(&path);
                if current.is_none() || current == last_seen {
                    continue;
                }
                last_seen = current;

                match store.reload_from(&path) {
                    Ok(()) => logger.info(&format!(
                        "Reloaded configuration from {}",
                        path.display()
                    )),
                    Err(e) => logger.error(&format!(
                        "Ignoring configuration change in {}: {}",
                        path.display(),
                        e
                    )),
                }
            }
            logger.debug("Configuration watcher stopped");
        })
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
