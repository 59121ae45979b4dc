//! Background consumer of change batches.
//!
//! # Data Flow
//! ```text
//! source change channel
//!     → drain every batch already queued (bounded by max_batch_paths)
//!     → ModelCache::invalidate (one merged batch)
//!     → ModelCache::refresh on the blocking pool
//! ```
//!
//! Readers are never blocked by this task: they keep receiving the
//! published model until the refreshed one is swapped in.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::cache::ModelCache;
use crate::source::ChangeBatch;

/// Applies change batches to a [`ModelCache`].
pub struct Invalidator {
    cache: Arc<ModelCache>,
    changes: mpsc::UnboundedReceiver<ChangeBatch>,
    max_batch_paths: usize,
}

impl Invalidator {
    pub fn new(cache: Arc<ModelCache>, changes: mpsc::UnboundedReceiver<ChangeBatch>, max_batch_paths: usize) -> Self {
        Self {
            cache,
            changes,
            max_batch_paths: max_batch_paths.max(1),
        }
    }

    /// Run until the change channel closes or shutdown is signalled.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(max_batch_paths = self.max_batch_paths, "Invalidator started");
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Invalidator stopping");
                    break;
                }
                received = self.changes.recv() => {
                    let Some(first) = received else {
                        tracing::info!("Change channel closed, invalidator stopping");
                        break;
                    };
                    let batch = self.coalesce(first);
                    self.apply(batch).await;
                }
            }
        }
    }

    /// Merge `first` with batches already waiting on the channel.
    fn coalesce(&mut self, first: ChangeBatch) -> ChangeBatch {
        let mut paths = first.paths;
        let mut merged = 1usize;
        while paths.len() < self.max_batch_paths {
            match self.changes.try_recv() {
                Ok(next) => {
                    paths.extend(next.paths);
                    merged += 1;
                }
                Err(_) => break,
            }
        }
        if merged > 1 {
            tracing::debug!(batches = merged, paths = paths.len(), "Coalesced change batches");
        }
        ChangeBatch::new(paths)
    }

    async fn apply(&self, batch: ChangeBatch) {
        let seq = self.cache.invalidate(&batch);
        let cache = self.cache.clone();
        match tokio::task::spawn_blocking(move || cache.refresh()).await {
            Ok(Ok(model)) => {
                tracing::debug!(seq, generation = model.generation(), "Change batch applied");
            }
            Ok(Err(error)) => {
                tracing::warn!(seq, error = %error, "Refresh failed, changes stay pending");
            }
            Err(error) => {
                tracing::error!(seq, error = %error, "Refresh task panicked");
            }
        }
    }
}

/// Spawn an [`Invalidator`] on the current runtime.
pub fn spawn_invalidator(
    cache: Arc<ModelCache>,
    changes: mpsc::UnboundedReceiver<ChangeBatch>,
    max_batch_paths: usize,
    shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(Invalidator::new(cache, changes, max_batch_paths).run(shutdown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::source::InMemorySource;
    use std::time::Duration;

    const DOC: &str = r#"
        ["hst:hst"."hst:hosts".dev.localhost."hst:root"]
        "hst:mountpoint" = "/hst:hst/hst:sites/demo"
        ["hst:hst"."hst:sites".demo]
        ["hst:hst"."hst:configurations".demo."hst:sitemap".home]
        "jcr:primaryType" = "hst:sitemapitem"
    "#;

    #[tokio::test]
    async fn test_committed_change_is_applied_in_background() {
        let source = Arc::new(InMemorySource::from_toml_str(DOC).unwrap());
        let cache = Arc::new(ModelCache::new(source.clone()));
        let shutdown = Shutdown::new();
        let handle = spawn_invalidator(cache.clone(), source.subscribe(), 100, shutdown.subscribe());

        let before = cache.get_virtual_hosts().unwrap();
        source
            .edit(|t| t.set_property("/hst:hst/hst:configurations/demo/hst:sitemap/home", "hst:relativecontentpath", "home"))
            .unwrap();

        let mut published = before.clone();
        for _ in 0..100 {
            published = cache.get_virtual_hosts().unwrap();
            if published.generation() > before.generation() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(published.generation(), 1);
        assert_eq!(cache.pending_changes(), 0);

        shutdown.trigger();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_queued_batches_are_coalesced() {
        let source = Arc::new(InMemorySource::from_toml_str(DOC).unwrap());
        let cache = Arc::new(ModelCache::new(source.clone()));
        let (tx, rx) = mpsc::unbounded_channel();
        let mut invalidator = Invalidator::new(cache, rx, 100);

        tx.send(ChangeBatch::new(vec!["/b".to_string()])).unwrap();
        tx.send(ChangeBatch::new(vec!["/a".to_string(), "/b".to_string()])).unwrap();
        let merged = invalidator.coalesce(ChangeBatch::new(vec!["/c".to_string()]));
        assert_eq!(merged.paths, vec!["/a", "/b", "/c"]);
    }
}
