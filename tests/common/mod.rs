//! Shared fixture for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use site_routing::cache::ModelCache;
use site_routing::source::{InMemorySource, SourceResult, TreeEditor};

pub const CONFIGS: &str = "/hst:hst/hst:configurations";
pub const DEMO: &str = "/hst:hst/hst:configurations/demo";
pub const DEMO_PREVIEW: &str = "/hst:hst/hst:configurations/demo-preview";
pub const INTRANET: &str = "/hst:hst/hst:configurations/intranet";
pub const COMMON_WORKSPACE: &str = "/hst:hst/hst:configurations/common/hst:workspace";

/// Hosts, sites and configurations of a small installation.
///
/// - `localhost` serves the demo site on any port and its preview on 8081
/// - `intranet.org` serves an unrelated site
/// - `demo` and `demo-preview` share the `common` workspace pages and
///   containers
pub const FIXTURE: &str = r#"
["hst:hst"."hst:hosts"]
"hst:defaulthostname" = "localhost"
"hst:homepage" = "home"
"hst:pagenotfound" = "pagenotfound"
"hst:prefixexclusions" = ["/binaries/"]
"hst:suffixexclusions" = [".ico"]

["hst:hst"."hst:hosts".dev.localhost."hst:root"]
"hst:mountpoint" = "/hst:hst/hst:sites/demo"
"hst:locale" = "en_US"

["hst:hst"."hst:hosts".dev.localhost."hst:root".api]
"hst:ismapped" = false

["hst:hst"."hst:hosts".dev.localhost."8081"."hst:root"]
"hst:mountpoint" = "/hst:hst/hst:sites/demo"
"hst:type" = "preview"

["hst:hst"."hst:hosts".dev.org.intranet."hst:root"]
"hst:mountpoint" = "/hst:hst/hst:sites/intranet"

["hst:hst"."hst:sites".demo]
"hst:content" = "/content/documents/demo"

["hst:hst"."hst:sites".intranet]
"hst:content" = "/content/documents/intranet"

["hst:hst"."hst:configurations"."hst:default"."hst:templates".fallback]
"jcr:primaryType" = "hst:template"
"hst:renderpath" = "webfile:/fallback.ftl"

["hst:hst"."hst:configurations".common."hst:templates".layout]
"jcr:primaryType" = "hst:template"
"hst:renderpath" = "webfile:/layout.ftl"

["hst:hst"."hst:configurations".common."hst:workspace"."hst:containers".myReferenceableContainer]
"jcr:primaryType" = "hst:containercomponent"
"hst:xtype" = "hst.vbox"

["hst:hst"."hst:configurations".common."hst:workspace"."hst:containers".myReferenceableContainer.banner]
"jcr:primaryType" = "hst:containeritemcomponent"
"hst:label" = "Banner"

["hst:hst"."hst:configurations".common."hst:workspace"."hst:pages".article]
"jcr:primaryType" = "hst:component"
"hst:template" = "layout"

["hst:hst"."hst:configurations".demo]
"hst:inheritsfrom" = ["../common", "../common/hst:workspace"]

["hst:hst"."hst:configurations".demo."hst:pages".home]
"jcr:primaryType" = "hst:component"
"hst:template" = "layout"

["hst:hst"."hst:configurations".demo."hst:pages".home.containerReferencePreserveMyName]
"jcr:primaryType" = "hst:containercomponentreference"
"hst:referencecomponent" = "myReferenceableContainer"

["hst:hst"."hst:configurations".demo."hst:pages".newsoverview]
"jcr:primaryType" = "hst:component"
"hst:referencecomponent" = "hst:pages/home"

["hst:hst"."hst:configurations".demo."hst:pages".pagenotfound]
"jcr:primaryType" = "hst:component"
"hst:template" = "fallback"

["hst:hst"."hst:configurations".demo."hst:sitemap".home]
"jcr:primaryType" = "hst:sitemapitem"
"hst:componentconfigurationid" = "hst:pages/home"
"hst:relativecontentpath" = "common/homepage"

["hst:hst"."hst:configurations".demo."hst:sitemap".news]
"jcr:primaryType" = "hst:sitemapitem"
"hst:componentconfigurationid" = "hst:pages/newsoverview"
"hst:relativecontentpath" = "News"
"hst:parameternames" = ["section"]
"hst:parametervalues" = ["news"]

["hst:hst"."hst:configurations".demo."hst:sitemap".news._default_]
"jcr:primaryType" = "hst:sitemapitem"
"hst:componentconfigurationid" = "hst:pages/newsoverview"
"hst:relativecontentpath" = "News/${1}"
"hst:parameternames" = ["year"]
"hst:parametervalues" = ["${1}"]

["hst:hst"."hst:configurations".demo."hst:sitemap".news._default_."_default_.html"]
"jcr:primaryType" = "hst:sitemapitem"
"hst:relativecontentpath" = "News/${1}/${2}"

["hst:hst"."hst:configurations".demo."hst:sitemap".old]
"jcr:primaryType" = "hst:sitemapitem"

["hst:hst"."hst:configurations".demo."hst:sitemap".old._any_]
"jcr:primaryType" = "hst:sitemapitem"
"hst:sitemapitemhandlerids" = ["moved"]

["hst:hst"."hst:configurations".demo."hst:sitemap".pagenotfound]
"jcr:primaryType" = "hst:sitemapitem"
"hst:componentconfigurationid" = "hst:pages/pagenotfound"

["hst:hst"."hst:configurations".demo."hst:sitemapitemhandlers".moved]
"jcr:primaryType" = "hst:sitemapitemhandler"
"hst:sitemapitemhandlertype" = "redirect"
"redirect.target" = "/news/${1}"
"redirect.permanent" = true

["hst:hst"."hst:configurations"."demo-preview"]
"hst:inheritsfrom" = ["../demo", "../common/hst:workspace"]

["hst:hst"."hst:configurations"."demo-preview"."hst:sitemap".home]
"jcr:primaryType" = "hst:sitemapitem"
"hst:componentconfigurationid" = "hst:pages/home"
"hst:relativecontentpath" = "preview/homepage"

["hst:hst"."hst:configurations".intranet."hst:pages".home]
"jcr:primaryType" = "hst:component"

["hst:hst"."hst:configurations".intranet."hst:sitemap".home]
"jcr:primaryType" = "hst:sitemapitem"
"hst:componentconfigurationid" = "hst:pages/home"

["hst:hst"."hst:channels".demo]
"jcr:primaryType" = "hst:channel"
"hst:name" = "Demo"
"hst:type" = "website"

["hst:hst"."hst:blueprints".intranet]
"jcr:primaryType" = "hst:blueprint"
"hst:name" = "Intranet"
"hst:description" = "Company intranet"
"#;

pub fn source() -> Arc<InMemorySource> {
    Arc::new(InMemorySource::from_toml_str(FIXTURE).expect("fixture parses"))
}

pub fn cache() -> (Arc<InMemorySource>, Arc<ModelCache>) {
    let source = source();
    let cache = Arc::new(ModelCache::new(source.clone()));
    (source, cache)
}

pub fn path(relative: &str) -> String {
    format!("{}/{}", CONFIGS, relative)
}

/// Apply an edit and feed the resulting change batch to the cache.
pub fn commit<F>(source: &InMemorySource, cache: &ModelCache, edit: F)
where
    F: FnOnce(&mut TreeEditor<'_>) -> SourceResult<()>,
{
    let mut changes = source.subscribe();
    source.edit(edit).expect("edit applies");
    while let Ok(batch) = changes.try_recv() {
        cache.invalidate(&batch);
    }
}
