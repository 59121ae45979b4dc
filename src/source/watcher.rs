//! Tree file watcher for hot reload.
//!
//! On every modification the file is re-read, diffed against the current
//! tree, and the difference is published as a change batch by the source.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::source::file::load_tree;
use crate::source::memory::InMemorySource;

/// Monitors the configuration tree file and feeds changes into the source.
pub struct SourceWatcher {
    path: PathBuf,
    source: Arc<InMemorySource>,
    poll_interval: Duration,
}

impl SourceWatcher {
    pub fn new(path: &Path, source: Arc<InMemorySource>, poll_interval: Duration) -> Self {
        Self {
            path: path.to_path_buf(),
            source,
            poll_interval,
        }
    }

    /// Re-read the file and apply it. Returns the number of changed paths.
    pub fn reload(&self) -> usize {
        match load_tree(&self.path) {
            Ok(tree) => {
                let batch = self.source.replace_tree(tree);
                tracing::info!(changed = batch.paths.len(), "Configuration tree reloaded");
                batch.paths.len()
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload configuration tree, keeping current tree");
                0
            }
        }
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let poll_interval = self.poll_interval;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Configuration tree change detected, reloading...");
                        self.reload();
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(poll_interval),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Configuration tree watcher started");
        Ok(watcher)
    }
}
