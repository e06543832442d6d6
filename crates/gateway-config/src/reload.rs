//! Hot-reload of provider credentials on config-file change.
//!
//! This is "ambient config reload" — picking up a rotated API key or base
//! URL without a restart — not the excluded "plugin hot-reload" (loading
//! new adapter code at runtime). Only [`crate::load_config`] is re-run and
//! swapped in; no code is loaded or unloaded.

use crate::loader::load_config;
use crate::model::GatewayConfig;
use arc_swap::ArcSwap;
use notify::{Event, RecursiveMode, Watcher};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// A live, swappable handle to the current configuration. Cloning shares
/// the same underlying snapshot; callers read via [`ConfigHandle::current`]
/// on every use rather than caching a borrowed reference.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<ArcSwap<GatewayConfig>>,
}

impl ConfigHandle {
    /// Wrap an already-loaded configuration.
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// The current configuration snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<GatewayConfig> {
        self.inner.load_full()
    }

    /// Watch `path` for writes and reload the whole configuration (file +
    /// environment) whenever it changes, swapping it into this handle.
    /// Returns the watcher; dropping it stops the watch.
    ///
    /// # Errors
    /// Returns an error if the underlying OS file watcher cannot be
    /// installed on `path`.
    pub fn watch(&self, path: &std::path::Path) -> notify::Result<notify::RecommendedWatcher> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        })?;
        watcher.watch(path, RecursiveMode::NonRecursive)?;

        let handle = self.clone();
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                match load_config().await {
                    Ok(fresh) => {
                        handle.inner.store(Arc::new(fresh));
                        info!("configuration reloaded from disk");
                    }
                    Err(err) => {
                        warn!(error = %err, "config reload failed, keeping previous configuration");
                    }
                }
            }
            error!("config file watch channel closed");
        });

        Ok(watcher)
    }
}
