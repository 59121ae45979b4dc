//! The model cache: owner of the published `VirtualHosts`.
//!
//! # Responsibilities
//! - Publish the hosts model behind a lock-free atomic pointer
//! - Record change batches and rebuild only the configuration roots whose
//!   dependencies they touch
//! - Share one `ComponentsConfiguration` per content key across rebuilds
//! - Contain per-root failures; retain the published model on source failure
//!
//! # Design Decisions
//! - Rebuilds run through a single-flight gate; concurrent callers join the
//!   in-flight build
//! - Every published model carries the change sequence it incorporates and
//!   the pointer only moves to a strictly newer generation
//! - The hosts structure is rebuilt on every rebuild; sites of clean roots
//!   are reused by identity
//! - Components instances are indexed weakly; an instance lives as long as
//!   some published site references it

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::cache::gate::BuildGate;
use crate::cache::observer::{BuildObserver, TelemetryObserver};
use crate::composer::{ComponentsConfiguration, ConfigurationKey, Dependency, HstSite, LoadedRoot};
use crate::error::{BuildError, BuildResult, ModelError, ModelResult, SourceError, SourceResult};
use crate::observability::metrics;
use crate::routing::{build_virtual_hosts, VirtualHosts};
use crate::sitemap::{HandlerConfiguration, HandlerFactory};
use crate::source::{ChangeBatch, ConfigurationSource};

const MODEL_KEY: &str = "<model>";

/// Cached state of one configuration root.
#[derive(Debug)]
struct RootEntry {
    /// Last good site; `None` when the root never built.
    site: Option<Arc<HstSite>>,
    dependencies: Vec<Dependency>,
    /// Failed roots are retried on every rebuild.
    failed: bool,
}

impl RootEntry {
    fn is_dirty(&self, changed: &BTreeSet<String>) -> bool {
        self.failed
            || changed
                .iter()
                .any(|c| self.dependencies.iter().any(|d| d.is_affected_by(c)))
    }
}

/// Builds, caches and publishes the configuration model.
#[derive(Debug)]
pub struct ModelCache {
    source: Arc<dyn ConfigurationSource>,
    published: ArcSwapOption<VirtualHosts>,
    change_seq: AtomicU64,
    pending: Mutex<BTreeSet<String>>,
    roots: DashMap<String, RootEntry>,
    components_by_key: Mutex<HashMap<ConfigurationKey, Weak<ComponentsConfiguration>>>,
    model_gate: BuildGate<ModelResult<Arc<VirtualHosts>>>,
    root_gate: BuildGate<BuildResult<Arc<HstSite>>>,
    handlers: Arc<HandlerFactory>,
    observer: Arc<dyn BuildObserver>,
}

impl ModelCache {
    pub fn new(source: Arc<dyn ConfigurationSource>) -> Self {
        Self::with_observer(source, Arc::new(TelemetryObserver))
    }

    pub fn with_observer(source: Arc<dyn ConfigurationSource>, observer: Arc<dyn BuildObserver>) -> Self {
        Self {
            source,
            published: ArcSwapOption::empty(),
            change_seq: AtomicU64::new(0),
            pending: Mutex::new(BTreeSet::new()),
            roots: DashMap::new(),
            components_by_key: Mutex::new(HashMap::new()),
            model_gate: BuildGate::new(),
            root_gate: BuildGate::new(),
            handlers: Arc::new(HandlerFactory::new()),
            observer,
        }
    }

    /// The latest published model. Blocks only when none was ever built.
    pub fn get_virtual_hosts(&self) -> ModelResult<Arc<VirtualHosts>> {
        if let Some(model) = self.published.load_full() {
            return Ok(model);
        }
        self.refresh()
    }

    /// A model incorporating every change recorded before this call.
    ///
    /// "Recorded" means passed to [`invalidate`](Self::invalidate). A batch
    /// the source has committed but that still waits in the invalidator's
    /// channel is not seen; callers that just edited the source should
    /// invalidate the batch themselves first.
    pub fn get_virtual_hosts_fresh(&self) -> ModelResult<Arc<VirtualHosts>> {
        let target = self.change_seq.load(Ordering::SeqCst);
        loop {
            if let Some(model) = self.published.load_full() {
                if model.generation() >= target {
                    return Ok(model);
                }
            }
            let model = self.refresh()?;
            if model.generation() >= target {
                return Ok(model);
            }
        }
    }

    /// Record a change batch. Returns the change sequence it was given.
    pub fn invalidate(&self, batch: &ChangeBatch) -> u64 {
        if batch.is_empty() {
            return self.change_seq.load(Ordering::SeqCst);
        }
        metrics::record_change_batch(batch.paths.len());

        let mut pending = self.pending.lock();
        pending.extend(batch.paths.iter().cloned());
        let seq = self.change_seq.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(seq, paths = batch.paths.len(), pending = pending.len(), "Change batch recorded");
        seq
    }

    /// Apply pending changes now, joining a rebuild already in flight.
    pub fn refresh(&self) -> ModelResult<Arc<VirtualHosts>> {
        self.model_gate.run(MODEL_KEY, || self.rebuild())
    }

    /// Sequence number of the latest recorded change.
    pub fn change_sequence(&self) -> u64 {
        self.change_seq.load(Ordering::SeqCst)
    }

    pub fn pending_changes(&self) -> usize {
        self.pending.lock().len()
    }

    /// Last good site of a configuration root, if cached.
    pub fn site(&self, root_path: &str) -> Option<Arc<HstSite>> {
        self.roots.get(root_path).and_then(|entry| entry.site.clone())
    }

    pub fn cached_roots(&self) -> Vec<String> {
        let mut roots: Vec<String> = self.roots.iter().map(|e| e.key().clone()).collect();
        roots.sort();
        roots
    }

    /// Live components instances held by the sharing index.
    pub fn shared_components(&self) -> usize {
        self.components_by_key
            .lock()
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    pub fn site_map_item_handler_factory(&self) -> Arc<HandlerFactory> {
        self.handlers.clone()
    }

    pub fn source(&self) -> &Arc<dyn ConfigurationSource> {
        &self.source
    }

    fn rebuild(&self) -> ModelResult<Arc<VirtualHosts>> {
        let started = Instant::now();
        let (changed, generation) = {
            let mut pending = self.pending.lock();
            (std::mem::take(&mut *pending), self.change_seq.load(Ordering::SeqCst))
        };

        let current = self.published.load_full();
        if let Some(current) = &current {
            if changed.is_empty() && current.generation() >= generation {
                return Ok(current.clone());
            }
        }

        // Mounts sharing a root see one site per rebuild.
        let mut resolved: HashMap<String, Option<Arc<HstSite>>> = HashMap::new();
        let mut rebuilt = 0usize;
        let mut sites = |root: &str| -> SourceResult<Option<Arc<HstSite>>> {
            if let Some(site) = resolved.get(root) {
                return Ok(site.clone());
            }
            let clean = self
                .roots
                .get(root)
                .filter(|entry| !entry.is_dirty(&changed))
                .map(|entry| entry.site.clone());
            let site = match clean {
                Some(site) => site,
                None => {
                    rebuilt += 1;
                    self.root_site(root)?
                }
            };
            resolved.insert(root.to_string(), site.clone());
            Ok(site)
        };

        let model = match build_virtual_hosts(self.source.as_ref(), generation, &mut sites) {
            Ok(model) => Arc::new(model),
            Err(error) => {
                if matches!(error, ModelError::Source(SourceError::Unavailable(_))) {
                    self.pending.lock().extend(changed);
                }
                self.observer.model_failed(&error, started.elapsed());
                return Err(error);
            }
        };

        self.retain_in_use(&model);

        let previous = self.published.rcu(|current| match current {
            Some(current) if current.generation() >= model.generation() => Some(current.clone()),
            _ => Some(model.clone()),
        });
        if let Some(previous) = previous.filter(|p| p.generation() >= model.generation()) {
            tracing::debug!(generation, "Model of the same or a newer generation already published");
            return Ok(previous);
        }

        self.observer.model_published(generation, rebuilt, started.elapsed());
        Ok(model)
    }

    /// Site for `root`, rebuilding it. Configuration errors keep the last good
    /// instance; source errors propagate.
    fn root_site(&self, root: &str) -> SourceResult<Option<Arc<HstSite>>> {
        match self.root_gate.run(root, || self.build_root(root)) {
            Ok(site) => Ok(Some(site)),
            Err(BuildError::Source(error)) => Err(error),
            Err(BuildError::Configuration(error)) => {
                self.observer.root_failed(root, &error);
                let previous = self.roots.get(root).and_then(|e| e.site.clone());
                self.roots
                    .entry(root.to_string())
                    .and_modify(|e| e.failed = true)
                    .or_insert_with(|| RootEntry {
                        site: None,
                        dependencies: Vec::new(),
                        failed: true,
                    });
                Ok(previous)
            }
        }
    }

    fn build_root(&self, root: &str) -> BuildResult<Arc<HstSite>> {
        let loaded = LoadedRoot::load(self.source.as_ref(), root)?;
        let (components, shared) = self.components_for(&loaded)?;

        let previous = self.roots.get(root).and_then(|e| e.site.clone());
        let site = match previous {
            Some(previous) if Arc::ptr_eq(previous.components(), &components) && *previous.key() == loaded.site_key() => {
                previous
            }
            _ => Arc::new(HstSite::assemble(&loaded, components)),
        };

        self.roots.insert(
            root.to_string(),
            RootEntry {
                site: Some(site.clone()),
                dependencies: loaded.chain.dependencies.clone(),
                failed: false,
            },
        );
        self.observer.root_built(root, shared);
        Ok(site)
    }

    /// The components instance for the loaded content, reused when an equal
    /// key is still alive.
    fn components_for(&self, loaded: &LoadedRoot) -> BuildResult<(Arc<ComponentsConfiguration>, bool)> {
        let key = loaded.components_key();
        if let Some(existing) = self.components_by_key.lock().get(&key).and_then(Weak::upgrade) {
            return Ok((existing, true));
        }
        let composed = Arc::new(ComponentsConfiguration::compose(loaded)?);
        self.components_by_key.lock().insert(key, Arc::downgrade(&composed));
        Ok((composed, false))
    }

    /// Drop roots, components and handler instances the model no longer uses.
    fn retain_in_use(&self, model: &VirtualHosts) {
        self.roots
            .retain(|root, _| model.sites().contains_key(root) || model.unavailable_roots().contains(root));
        self.components_by_key.lock().retain(|_, w| w.strong_count() > 0);

        let handlers: HashSet<HandlerConfiguration> = model
            .sites()
            .values()
            .flat_map(|site| site.handler_configurations().map(|h| h.as_ref().clone()))
            .collect();
        self.handlers.retain_configurations(&handlers);

        metrics::set_cached_roots(self.roots.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySource;

    const DOC: &str = r#"
        ["hst:hst"."hst:hosts".dev.localhost."hst:root"]
        "hst:mountpoint" = "/hst:hst/hst:sites/demo"
        ["hst:hst"."hst:sites".demo]
        ["hst:hst"."hst:configurations".demo."hst:pages".home]
        "jcr:primaryType" = "hst:component"
        ["hst:hst"."hst:configurations".other."hst:pages".home]
        "jcr:primaryType" = "hst:component"
    "#;

    fn cache() -> (Arc<InMemorySource>, ModelCache) {
        let source = Arc::new(InMemorySource::from_toml_str(DOC).unwrap());
        let cache = ModelCache::new(source.clone());
        (source, cache)
    }

    #[test]
    fn test_stable_period_returns_same_instance() {
        let (_, cache) = cache();
        let a = cache.get_virtual_hosts().unwrap();
        let b = cache.get_virtual_hosts().unwrap();
        let c = cache.get_virtual_hosts_fresh().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_unrelated_change_keeps_components() {
        let (source, cache) = cache();
        let before = cache.get_virtual_hosts().unwrap();
        let components = before.sites()["/hst:hst/hst:configurations/demo"].components().clone();

        let batch = source
            .edit(|t| t.set_property("/hst:hst/hst:configurations/other/hst:pages/home", "hst:label", "x"))
            .map(|_| ChangeBatch::new(vec!["/hst:hst/hst:configurations/other/hst:pages/home/hst:label".to_string()]))
            .unwrap();
        cache.invalidate(&batch);

        let after = cache.get_virtual_hosts_fresh().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(after.generation() > before.generation());
        let site = &after.sites()["/hst:hst/hst:configurations/demo"];
        assert!(Arc::ptr_eq(site.components(), &components));
    }

    #[test]
    fn test_source_unavailable_retains_model_and_requeues() {
        let (source, cache) = cache();
        let before = cache.get_virtual_hosts().unwrap();

        source.set_available(false);
        cache.invalidate(&ChangeBatch::new(vec!["/hst:hst/hst:configurations/demo/hst:pages/home".to_string()]));
        assert!(matches!(
            cache.get_virtual_hosts_fresh(),
            Err(ModelError::Source(SourceError::Unavailable(_)))
        ));
        assert!(Arc::ptr_eq(&cache.get_virtual_hosts().unwrap(), &before));
        assert_eq!(cache.pending_changes(), 1);

        source.set_available(true);
        let after = cache.get_virtual_hosts_fresh().unwrap();
        assert_eq!(after.generation(), 1);
        assert_eq!(cache.pending_changes(), 0);
    }
}
