//! A composed site: components, sitemap and handlers of one configuration root.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::composer::chain::ConfigurationChain;
use crate::composer::components::ComponentsConfiguration;
use crate::composer::key::{ConfigurationKey, LoadedRoot};
use crate::error::ResolutionError;
use crate::sitemap::handler::{collect_handler_configurations, HandlerConfiguration};
use crate::sitemap::{ItemDefaults, ResolvedSiteMapItem, SiteMap};

/// Everything a mapped mount needs from its configuration root.
#[derive(Debug, Serialize)]
pub struct HstSite {
    key: ConfigurationKey,
    components: Arc<ComponentsConfiguration>,
    sitemap: SiteMap,
    handlers: BTreeMap<String, Arc<HandlerConfiguration>>,
    #[serde(skip)]
    chain: ConfigurationChain,
}

impl HstSite {
    /// Assemble a site around an (possibly shared) components bundle.
    pub fn assemble(loaded: &LoadedRoot, components: Arc<ComponentsConfiguration>) -> Self {
        Self {
            key: loaded.site_key(),
            sitemap: SiteMap::build(loaded),
            handlers: collect_handler_configurations(loaded),
            chain: loaded.chain.clone(),
            components,
        }
    }

    pub fn configuration_path(&self) -> &str {
        &self.key.root_path
    }

    pub fn key(&self) -> &ConfigurationKey {
        &self.key
    }

    pub fn components(&self) -> &Arc<ComponentsConfiguration> {
        &self.components
    }

    pub fn sitemap(&self) -> &SiteMap {
        &self.sitemap
    }

    pub fn chain(&self) -> &ConfigurationChain {
        &self.chain
    }

    pub fn handler_configuration(&self, id: &str) -> Option<&Arc<HandlerConfiguration>> {
        self.handlers.get(id)
    }

    pub fn handler_configurations(&self) -> impl Iterator<Item = &Arc<HandlerConfiguration>> {
        self.handlers.values()
    }

    /// Match a mount-relative path.
    ///
    /// An empty path resolves the `homepage` item; a miss resolves the
    /// `page_not_found` item, flagged as such.
    pub fn match_site_map_item(
        &self,
        path: &str,
        homepage: Option<&str>,
        page_not_found: Option<&str>,
        defaults: &ItemDefaults,
    ) -> Result<ResolvedSiteMapItem, ResolutionError> {
        let trimmed = path.trim_matches('/');
        let effective = if trimmed.is_empty() { homepage.unwrap_or("") } else { trimmed };

        if let Some(matched) = self.sitemap.match_path(effective) {
            return Ok(ResolvedSiteMapItem::resolve(self, matched, effective, defaults, false));
        }

        let fallback = page_not_found.and_then(|pnf| self.sitemap.match_path(pnf));
        match fallback {
            Some(matched) => {
                tracing::debug!(site = %self.configuration_path(), path = %path, "No sitemap item matched, using page-not-found item");
                Ok(ResolvedSiteMapItem::resolve(self, matched, effective, defaults, true))
            }
            None => Err(ResolutionError::SiteMapItemNotFound(path.to_string())),
        }
    }
}
