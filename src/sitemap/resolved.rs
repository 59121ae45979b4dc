//! Request-scoped sitemap match result.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::composer::component::ComponentConfiguration;
use crate::composer::site::HstSite;
use crate::sitemap::handler::ResolvedHandlerConfiguration;
use crate::sitemap::item::SiteMapItem;
use crate::sitemap::matcher::{resolve_map, resolve_placeholders, SiteMapMatch};

/// Defaults a resolved item falls back to when the item leaves them unset.
#[derive(Debug, Clone, Default)]
pub struct ItemDefaults {
    pub named_pipeline: Option<String>,
    pub locale: Option<String>,
}

/// A sitemap item matched for one request, with placeholders resolved.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSiteMapItem {
    #[serde(skip)]
    item: Arc<SiteMapItem>,
    item_id: String,
    path_info: String,
    captures: Vec<String>,
    relative_content_path: Option<String>,
    parameters: BTreeMap<String, String>,
    local_parameters: BTreeMap<String, String>,
    component_configuration: Option<Arc<ComponentConfiguration>>,
    handlers: Vec<ResolvedHandlerConfiguration>,
    named_pipeline: Option<String>,
    locale: Option<String>,
    page_not_found: bool,
}

impl ResolvedSiteMapItem {
    pub(crate) fn resolve(
        site: &HstSite,
        matched: SiteMapMatch,
        path_info: &str,
        defaults: &ItemDefaults,
        page_not_found: bool,
    ) -> Self {
        let SiteMapMatch { item, captures } = matched;

        let relative_content_path = item
            .relative_content_path()
            .and_then(|template| resolve_placeholders(template, &captures));
        let parameters = resolve_map(item.parameters(), &captures);
        let local_parameters = resolve_map(item.local_parameters(), &captures);

        let component_configuration = item.component_configuration_id().and_then(|id| {
            let found = site.components().component_configuration(id).cloned();
            if found.is_none() {
                tracing::debug!(item = %item.id(), component = %id, "Sitemap item points at an unknown component");
            }
            found
        });

        let handlers = item
            .handler_ids()
            .iter()
            .filter_map(|id| match site.handler_configuration(id) {
                Some(config) => Some(ResolvedHandlerConfiguration::resolve(config.clone(), &captures)),
                None => {
                    tracing::warn!(item = %item.id(), handler = %id, "Sitemap item references an unknown handler");
                    None
                }
            })
            .collect();

        Self {
            item_id: item.id().to_string(),
            path_info: path_info.trim_matches('/').to_string(),
            relative_content_path,
            parameters,
            local_parameters,
            component_configuration,
            handlers,
            named_pipeline: item.named_pipeline().map(str::to_string).or_else(|| defaults.named_pipeline.clone()),
            locale: item.locale().map(str::to_string).or_else(|| defaults.locale.clone()),
            page_not_found,
            captures,
            item,
        }
    }

    pub fn site_map_item(&self) -> &Arc<SiteMapItem> {
        &self.item
    }

    /// The mount-relative path that was matched.
    pub fn path_info(&self) -> &str {
        &self.path_info
    }

    /// Wildcard values, `${1}` first.
    pub fn captures(&self) -> &[String] {
        &self.captures
    }

    pub fn relative_content_path(&self) -> Option<&str> {
        self.relative_content_path.as_deref()
    }

    /// Resolved parameters including those inherited from ancestor items.
    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Resolved parameters defined on the matched item itself.
    pub fn local_parameters(&self) -> &BTreeMap<String, String> {
        &self.local_parameters
    }

    /// Unresolved parameter value as stored.
    pub fn raw_parameter(&self, name: &str) -> Option<&str> {
        self.item.parameters().get(name).map(String::as_str)
    }

    pub fn component_configuration(&self) -> Option<&Arc<ComponentConfiguration>> {
        self.component_configuration.as_ref()
    }

    pub fn handlers(&self) -> &[ResolvedHandlerConfiguration] {
        &self.handlers
    }

    pub fn named_pipeline(&self) -> Option<&str> {
        self.named_pipeline.as_deref()
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// True when this is the page-not-found item standing in for a miss.
    pub fn is_page_not_found(&self) -> bool {
        self.page_not_found
    }
}
