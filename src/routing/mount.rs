//! Mounts: request entry points mapping a host and path prefix to a site.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::composer::HstSite;

/// A mount as seen by the resolvers.
///
/// Implemented by [`LiveMount`] (built from the hosts tree) and by
/// [`PreviewMount`](crate::routing::preview::PreviewMount), which decorates a
/// live mount.
pub trait Mount: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Identifier of the stored mount node.
    fn identifier(&self) -> &str;

    /// Path of the mount below its host's root mount, `""` for the root.
    fn mount_path(&self) -> &str;

    fn context_path(&self) -> Option<&str>;

    fn scheme(&self) -> &str;

    fn host_name(&self) -> &str;

    fn port(&self) -> u16;

    /// Path of the site node this mount points at.
    fn mount_point(&self) -> Option<&str>;

    /// Content root of the site.
    fn content_path(&self) -> Option<&str>;

    fn is_mapped(&self) -> bool;

    fn is_preview(&self) -> bool;

    /// Whether preview responses carry the version header. Only
    /// meaningful when [`is_preview`](Mount::is_preview) is true.
    fn is_version_in_preview_header(&self) -> bool;

    fn named_pipeline(&self) -> Option<&str>;

    fn locale(&self) -> Option<&str>;

    fn homepage(&self) -> Option<&str>;

    fn page_not_found(&self) -> Option<&str>;

    fn alias(&self) -> Option<&str>;

    fn parameters(&self) -> &BTreeMap<String, String>;

    /// The composed site; `None` for unmapped mounts and unavailable sites.
    fn site(&self) -> Option<Arc<HstSite>>;

    /// The site a preview decoration of this mount serves.
    fn preview_site(&self) -> Option<Arc<HstSite>> {
        self.site()
    }

    /// True when the mount is mapped but its site failed to build.
    fn is_site_unavailable(&self) -> bool;

    fn child(&self, name: &str) -> Option<Arc<dyn Mount>>;

    fn children(&self) -> Vec<Arc<dyn Mount>>;
}

/// Settings inherited down the hosts tree; each level may override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSettings {
    pub scheme: String,
    pub context_path: Option<String>,
    pub homepage: Option<String>,
    pub page_not_found: Option<String>,
    pub locale: Option<String>,
    pub named_pipeline: Option<String>,
    pub version_in_preview_header: bool,
}

impl Default for MountSettings {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            context_path: None,
            homepage: None,
            page_not_found: None,
            locale: None,
            named_pipeline: None,
            version_in_preview_header: true,
        }
    }
}

/// A mount built from a stored `hst:mount` node.
#[derive(Debug)]
pub struct LiveMount {
    pub(crate) name: String,
    pub(crate) identifier: String,
    pub(crate) mount_path: String,
    pub(crate) host_name: String,
    pub(crate) port: u16,
    pub(crate) settings: MountSettings,
    pub(crate) mount_point: Option<String>,
    pub(crate) content_path: Option<String>,
    pub(crate) is_mapped: bool,
    pub(crate) alias: Option<String>,
    pub(crate) parameters: BTreeMap<String, String>,
    pub(crate) site: Option<Arc<HstSite>>,
    /// Site used when this mount is decorated as preview.
    pub(crate) preview_site: Option<Arc<HstSite>>,
    pub(crate) site_unavailable: bool,
    pub(crate) children: BTreeMap<String, Arc<dyn Mount>>,
}

impl Mount for LiveMount {
    fn name(&self) -> &str {
        &self.name
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn mount_path(&self) -> &str {
        &self.mount_path
    }

    fn context_path(&self) -> Option<&str> {
        self.settings.context_path.as_deref()
    }

    fn scheme(&self) -> &str {
        &self.settings.scheme
    }

    fn host_name(&self) -> &str {
        &self.host_name
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn mount_point(&self) -> Option<&str> {
        self.mount_point.as_deref()
    }

    fn content_path(&self) -> Option<&str> {
        self.content_path.as_deref()
    }

    fn is_mapped(&self) -> bool {
        self.is_mapped
    }

    fn is_preview(&self) -> bool {
        false
    }

    fn is_version_in_preview_header(&self) -> bool {
        self.settings.version_in_preview_header
    }

    fn named_pipeline(&self) -> Option<&str> {
        self.settings.named_pipeline.as_deref()
    }

    fn locale(&self) -> Option<&str> {
        self.settings.locale.as_deref()
    }

    fn homepage(&self) -> Option<&str> {
        self.settings.homepage.as_deref()
    }

    fn page_not_found(&self) -> Option<&str> {
        self.settings.page_not_found.as_deref()
    }

    fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    fn site(&self) -> Option<Arc<HstSite>> {
        self.site.clone()
    }

    fn preview_site(&self) -> Option<Arc<HstSite>> {
        self.preview_site.clone().or_else(|| self.site.clone())
    }

    fn is_site_unavailable(&self) -> bool {
        self.site_unavailable
    }

    fn child(&self, name: &str) -> Option<Arc<dyn Mount>> {
        self.children.get(name).cloned()
    }

    fn children(&self) -> Vec<Arc<dyn Mount>> {
        self.children.values().cloned().collect()
    }
}
