//! Sitemap item handlers.
//!
//! # Responsibilities
//! - Read handler configurations from the `hst:sitemapitemhandlers` sections
//! - Instantiate handlers by type through registered constructors
//! - Hand out one shared instance per handler configuration
//!
//! # Design Decisions
//! - Instances are cached by the full configuration value, so a changed
//!   property yields a fresh instance while an unchanged one is reused across
//!   rebuilds
//! - Constructors are plain closures; the built-in `redirect`, `notfound` and
//!   `noop` types are registered by [`HandlerFactory::new`]

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::composer::chain::Section;
use crate::composer::key::LoadedRoot;
use crate::error::{HandlerError, HandlerResult};
use crate::sitemap::matcher::resolve_map;
use crate::sitemap::resolved::ResolvedSiteMapItem;
use crate::source::{layout, path, PropertyValue, SourceNode};

/// Stored configuration of one handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct HandlerConfiguration {
    pub id: String,
    pub handler_type: String,
    pub canonical_stored_location: String,
    pub canonical_identifier: String,
    /// Raw properties; values may carry `${n}` placeholders.
    pub properties: BTreeMap<String, String>,
}

impl HandlerConfiguration {
    fn from_node(node: &SourceNode) -> Option<Self> {
        let handler_type = node.non_empty(layout::SITEMAP_ITEM_HANDLER_TYPE)?.to_string();
        let properties = node
            .properties
            .iter()
            .filter(|(name, _)| !name.starts_with("jcr:") && name.as_str() != layout::SITEMAP_ITEM_HANDLER_TYPE)
            .map(|(name, value)| {
                let text = match value {
                    PropertyValue::String(s) => s.clone(),
                    PropertyValue::Strings(values) => values.join(","),
                    PropertyValue::Bool(b) => b.to_string(),
                    PropertyValue::Long(l) => l.to_string(),
                };
                (name.clone(), text)
            })
            .collect();

        Some(Self {
            id: node.name.clone(),
            handler_type,
            canonical_stored_location: node.path.clone(),
            canonical_identifier: node.identifier.clone(),
            properties,
        })
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

/// A handler configuration with placeholders resolved for one match.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedHandlerConfiguration {
    pub configuration: Arc<HandlerConfiguration>,
    pub resolved_properties: BTreeMap<String, String>,
}

impl ResolvedHandlerConfiguration {
    pub fn resolve(configuration: Arc<HandlerConfiguration>, captures: &[String]) -> Self {
        let resolved_properties = resolve_map(&configuration.properties, captures);
        Self {
            configuration,
            resolved_properties,
        }
    }

    pub fn id(&self) -> &str {
        &self.configuration.id
    }

    pub fn handler_type(&self) -> &str {
        &self.configuration.handler_type
    }

    pub fn raw_property(&self, name: &str) -> Option<&str> {
        self.configuration.property(name)
    }

    pub fn resolved_property(&self, name: &str) -> Option<&str> {
        self.resolved_properties.get(name).map(String::as_str)
    }
}

/// Handler configurations of one site, first definition per id wins.
pub fn collect_handler_configurations(loaded: &LoadedRoot) -> BTreeMap<String, Arc<HandlerConfiguration>> {
    let mut out = BTreeMap::new();
    for (node, _) in loaded.top_level(Section::SiteMapItemHandlers) {
        if !node.is_type(layout::NT_SITEMAP_ITEM_HANDLER) {
            continue;
        }
        match HandlerConfiguration::from_node(node) {
            Some(config) => {
                out.insert(config.id.clone(), Arc::new(config));
            }
            None => tracing::warn!(
                handler = %node.path,
                inherited = !path::is_same_or_descendant(&node.path, loaded.root_path()),
                "Sitemap item handler has no type, skipping"
            ),
        }
    }
    out
}

/// What the request pipeline should do after a handler ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HandlerOutcome {
    Continue,
    Redirect { location: String, permanent: bool },
    NotFound,
}

/// A handler run for a matched sitemap item.
pub trait SiteMapItemHandler: Send + Sync + fmt::Debug {
    fn process(
        &self,
        handler: &ResolvedHandlerConfiguration,
        item: &ResolvedSiteMapItem,
    ) -> HandlerResult<HandlerOutcome>;
}

type Constructor = Arc<dyn Fn(&HandlerConfiguration) -> HandlerResult<Arc<dyn SiteMapItemHandler>> + Send + Sync>;

/// Creates handler instances and shares them per configuration.
pub struct HandlerFactory {
    constructors: DashMap<String, Constructor>,
    instances: DashMap<HandlerConfiguration, Arc<dyn SiteMapItemHandler>>,
}

impl fmt::Debug for HandlerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFactory")
            .field("types", &self.constructors.len())
            .field("instances", &self.instances.len())
            .finish()
    }
}

impl Default for HandlerFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerFactory {
    /// Factory with the built-in handler types registered.
    pub fn new() -> Self {
        let factory = Self {
            constructors: DashMap::new(),
            instances: DashMap::new(),
        };
        factory.register("redirect", |_| Ok(Arc::new(RedirectHandler)));
        factory.register("notfound", |_| Ok(Arc::new(NotFoundHandler)));
        factory.register("noop", |_| Ok(Arc::new(NoopHandler)));
        factory
    }

    /// Register (or replace) the constructor of a handler type.
    pub fn register<F>(&self, handler_type: &str, constructor: F)
    where
        F: Fn(&HandlerConfiguration) -> HandlerResult<Arc<dyn SiteMapItemHandler>> + Send + Sync + 'static,
    {
        self.constructors.insert(handler_type.to_string(), Arc::new(constructor));
    }

    /// The handler instance for `config`, created on first request.
    pub fn get_handler(&self, config: &HandlerConfiguration) -> HandlerResult<Arc<dyn SiteMapItemHandler>> {
        if let Some(existing) = self.instances.get(config) {
            return Ok(existing.clone());
        }

        let constructor = self
            .constructors
            .get(&config.handler_type)
            .map(|c| c.clone())
            .ok_or_else(|| HandlerError::UnknownType(config.handler_type.clone()))?;

        let instance = self
            .instances
            .entry(config.clone())
            .or_try_insert_with(|| {
                tracing::debug!(handler = %config.id, handler_type = %config.handler_type, "Instantiating sitemap item handler");
                constructor(config)
            })?;
        Ok(instance.clone())
    }

    /// Drop instances whose configuration is no longer in use.
    pub fn retain_configurations(&self, live: &HashSet<HandlerConfiguration>) {
        self.instances.retain(|config, _| live.contains(config));
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

/// Redirects to `redirect.target`; permanent when `redirect.permanent` is true.
#[derive(Debug)]
struct RedirectHandler;

impl SiteMapItemHandler for RedirectHandler {
    fn process(
        &self,
        handler: &ResolvedHandlerConfiguration,
        _item: &ResolvedSiteMapItem,
    ) -> HandlerResult<HandlerOutcome> {
        let location = handler
            .resolved_property("redirect.target")
            .filter(|t| !t.is_empty())
            .ok_or_else(|| HandlerError::MissingProperty {
                handler: handler.id().to_string(),
                property: "redirect.target".to_string(),
            })?;
        let permanent = handler
            .resolved_property("redirect.permanent")
            .map(|p| p == "true")
            .unwrap_or(false);
        Ok(HandlerOutcome::Redirect {
            location: location.to_string(),
            permanent,
        })
    }
}

#[derive(Debug)]
struct NotFoundHandler;

impl SiteMapItemHandler for NotFoundHandler {
    fn process(&self, _: &ResolvedHandlerConfiguration, _: &ResolvedSiteMapItem) -> HandlerResult<HandlerOutcome> {
        Ok(HandlerOutcome::NotFound)
    }
}

#[derive(Debug)]
struct NoopHandler;

impl SiteMapItemHandler for NoopHandler {
    fn process(&self, _: &ResolvedHandlerConfiguration, _: &ResolvedSiteMapItem) -> HandlerResult<HandlerOutcome> {
        Ok(HandlerOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(id: &str, handler_type: &str, target: &str) -> HandlerConfiguration {
        HandlerConfiguration {
            id: id.to_string(),
            handler_type: handler_type.to_string(),
            canonical_stored_location: format!("/h/{}", id),
            canonical_identifier: id.to_string(),
            properties: [("redirect.target".to_string(), target.to_string())].into(),
        }
    }

    #[test]
    fn test_same_instance_per_configuration() {
        let factory = HandlerFactory::new();
        let a = config("moved", "redirect", "/new/${1}");

        let first = factory.get_handler(&a).unwrap();
        let second = factory.get_handler(&a.clone()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let changed = config("moved", "redirect", "/elsewhere");
        let third = factory.get_handler(&changed).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(factory.instance_count(), 2);

        factory.retain_configurations(&HashSet::from([changed]));
        assert_eq!(factory.instance_count(), 1);
    }

    #[test]
    fn test_unknown_type() {
        let factory = HandlerFactory::new();
        let err = factory.get_handler(&config("x", "custom", "")).unwrap_err();
        assert_eq!(err, HandlerError::UnknownType("custom".into()));

        factory.register("custom", |_| Ok(Arc::new(NoopHandler)));
        assert!(factory.get_handler(&config("x", "custom", "")).is_ok());
    }

    #[test]
    fn test_resolved_properties() {
        let resolved = ResolvedHandlerConfiguration::resolve(
            Arc::new(config("moved", "redirect", "/new/${1}")),
            &["2009".to_string()],
        );
        assert_eq!(resolved.raw_property("redirect.target"), Some("/new/${1}"));
        assert_eq!(resolved.resolved_property("redirect.target"), Some("/new/2009"));
    }
}
