//! Preview decoration of live mounts.
//!
//! # Design Decisions
//! - A preview mount never owns a separate tree; it wraps a live mount and
//!   delegates every structural lookup to it
//! - Children are decorated on first access and then reused
//! - The site served is the live mount's preview site, which is the live
//!   site itself unless a `-preview` configuration root exists

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use crate::composer::HstSite;
use crate::routing::mount::Mount;

/// Wrap `mount` as its preview variant. Preview mounts are returned as-is.
pub fn decorate_mount_as_preview(mount: Arc<dyn Mount>) -> Arc<dyn Mount> {
    if mount.is_preview() {
        return mount;
    }
    Arc::new(PreviewMount {
        inner: mount,
        children: OnceLock::new(),
    })
}

/// A live mount seen through preview.
#[derive(Debug)]
pub struct PreviewMount {
    inner: Arc<dyn Mount>,
    children: OnceLock<BTreeMap<String, Arc<dyn Mount>>>,
}

impl PreviewMount {
    /// The decorated live mount.
    pub fn live(&self) -> &Arc<dyn Mount> {
        &self.inner
    }

    fn decorated_children(&self) -> &BTreeMap<String, Arc<dyn Mount>> {
        self.children.get_or_init(|| {
            self.inner
                .children()
                .into_iter()
                .map(|child| (child.name().to_string(), decorate_mount_as_preview(child)))
                .collect()
        })
    }
}

impl Mount for PreviewMount {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn identifier(&self) -> &str {
        self.inner.identifier()
    }

    fn mount_path(&self) -> &str {
        self.inner.mount_path()
    }

    fn context_path(&self) -> Option<&str> {
        self.inner.context_path()
    }

    fn scheme(&self) -> &str {
        self.inner.scheme()
    }

    fn host_name(&self) -> &str {
        self.inner.host_name()
    }

    fn port(&self) -> u16 {
        self.inner.port()
    }

    fn mount_point(&self) -> Option<&str> {
        self.inner.mount_point()
    }

    fn content_path(&self) -> Option<&str> {
        self.inner.content_path()
    }

    fn is_mapped(&self) -> bool {
        self.inner.is_mapped()
    }

    fn is_preview(&self) -> bool {
        true
    }

    fn is_version_in_preview_header(&self) -> bool {
        self.inner.is_version_in_preview_header()
    }

    fn named_pipeline(&self) -> Option<&str> {
        self.inner.named_pipeline()
    }

    fn locale(&self) -> Option<&str> {
        self.inner.locale()
    }

    fn homepage(&self) -> Option<&str> {
        self.inner.homepage()
    }

    fn page_not_found(&self) -> Option<&str> {
        self.inner.page_not_found()
    }

    fn alias(&self) -> Option<&str> {
        self.inner.alias()
    }

    fn parameters(&self) -> &BTreeMap<String, String> {
        self.inner.parameters()
    }

    fn site(&self) -> Option<Arc<HstSite>> {
        self.inner.preview_site()
    }

    fn preview_site(&self) -> Option<Arc<HstSite>> {
        self.inner.preview_site()
    }

    fn is_site_unavailable(&self) -> bool {
        self.inner.is_site_unavailable()
    }

    fn child(&self, name: &str) -> Option<Arc<dyn Mount>> {
        self.decorated_children().get(name).cloned()
    }

    fn children(&self) -> Vec<Arc<dyn Mount>> {
        self.decorated_children().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::build_site;
    use crate::routing::mount::{LiveMount, MountSettings};
    use crate::source::InMemorySource;

    fn live(name: &str, site: Option<Arc<HstSite>>, children: Vec<Arc<dyn Mount>>) -> Arc<dyn Mount> {
        Arc::new(LiveMount {
            name: name.to_string(),
            identifier: format!("id-{}", name),
            mount_path: String::new(),
            host_name: "localhost".to_string(),
            port: 0,
            settings: MountSettings::default(),
            mount_point: Some("/hst:hst/hst:sites/demo".to_string()),
            content_path: None,
            is_mapped: true,
            alias: None,
            parameters: [("p".to_string(), "v".to_string())].into(),
            site,
            preview_site: None,
            site_unavailable: false,
            children: children.into_iter().map(|c| (c.name().to_string(), c)).collect(),
        })
    }

    fn site() -> Arc<HstSite> {
        let source = InMemorySource::from_toml_str(
            r#"
            ["hst:hst"."hst:configurations".demo."hst:pages".home]
            "jcr:primaryType" = "hst:component"
            "#,
        )
        .unwrap();
        Arc::new(build_site(&source, "/hst:hst/hst:configurations/demo").unwrap())
    }

    #[test]
    fn test_preview_delegates_to_live() {
        let site = site();
        let mount = live("hst:root", Some(site.clone()), vec![live("api", None, vec![])]);
        let preview = decorate_mount_as_preview(mount.clone());

        assert!(preview.is_preview());
        assert!(!mount.is_preview());
        assert!(preview.is_version_in_preview_header());
        assert_eq!(preview.parameters(), mount.parameters());
        assert!(Arc::ptr_eq(&preview.site().unwrap(), &site));

        let child = preview.child("api").unwrap();
        assert!(child.is_preview());
        assert!(Arc::ptr_eq(&child, &preview.child("api").unwrap()));
        assert!(preview.child("missing").is_none());
    }

    #[test]
    fn test_decorating_preview_is_identity() {
        let preview = decorate_mount_as_preview(live("hst:root", None, vec![]));
        let again = decorate_mount_as_preview(preview.clone());
        assert!(Arc::ptr_eq(&preview, &again));
    }
}
