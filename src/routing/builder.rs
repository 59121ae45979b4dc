//! Builds [`VirtualHosts`] from the stored hosts tree.
//!
//! # Data Flow
//! ```text
//! /hst:hst/hst:hosts
//!     → host groups → host name segments (reversed, `com/example/www`)
//!     → hst:root (any port) | <port> portmount → hst:root
//!     → mounts → mount point (site node) → configuration root
//!     → SiteProvider supplies the composed HstSite per root
//! ```
//!
//! Host and mount settings (scheme, homepage, context path, ...) are
//! inherited from the hosts node down to every mount and may be overridden
//! at any level.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::composer::{build_site, HstSite};
use crate::error::{BuildError, ModelError, ModelResult, SourceResult};
use crate::routing::hosts::{Blueprint, Channel, VirtualHost, VirtualHosts};
use crate::routing::mount::{LiveMount, Mount, MountSettings};
use crate::routing::preview::decorate_mount_as_preview;
use crate::source::{layout, path, ConfigurationSource, PropertyValue, SourceNode};

/// Supplies the composed site of a configuration root.
pub trait SiteProvider {
    /// `Ok(None)` when the root cannot be built; the mount is then marked
    /// site-unavailable. A source error aborts the whole model build.
    fn site(&mut self, root_path: &str) -> SourceResult<Option<Arc<HstSite>>>;
}

impl<F> SiteProvider for F
where
    F: FnMut(&str) -> SourceResult<Option<Arc<HstSite>>>,
{
    fn site(&mut self, root_path: &str) -> SourceResult<Option<Arc<HstSite>>> {
        self(root_path)
    }
}

/// Builds every requested root once, without caching across builds.
#[derive(Debug)]
pub struct UncachedSites<'a> {
    source: &'a dyn ConfigurationSource,
    built: HashMap<String, Option<Arc<HstSite>>>,
}

impl<'a> UncachedSites<'a> {
    pub fn new(source: &'a dyn ConfigurationSource) -> Self {
        Self {
            source,
            built: HashMap::new(),
        }
    }
}

impl SiteProvider for UncachedSites<'_> {
    fn site(&mut self, root_path: &str) -> SourceResult<Option<Arc<HstSite>>> {
        if let Some(done) = self.built.get(root_path) {
            return Ok(done.clone());
        }
        let site = match build_site(self.source, root_path) {
            Ok(site) => Some(Arc::new(site)),
            Err(BuildError::Source(e)) => return Err(e),
            Err(BuildError::Configuration(e)) => {
                tracing::warn!(root = %root_path, error = %e, "Configuration root failed to build");
                None
            }
        };
        self.built.insert(root_path.to_string(), site.clone());
        Ok(site)
    }
}

/// Read the hosts tree and assemble a [`VirtualHosts`] model.
pub fn build_virtual_hosts(
    source: &dyn ConfigurationSource,
    generation: u64,
    sites: &mut dyn SiteProvider,
) -> ModelResult<VirtualHosts> {
    let hosts_path = path::join(layout::HST_ROOT, layout::HOSTS);
    let hosts_node = source
        .node(&hosts_path)?
        .ok_or_else(|| ModelError::MissingHosts(hosts_path.clone()))?;

    let mut builder = HostsBuilder {
        source,
        sites,
        hosts: HashMap::new(),
        wildcard_hosts: Vec::new(),
        used_sites: BTreeMap::new(),
        unavailable_roots: BTreeSet::new(),
    };

    let base = inherit_settings(&MountSettings::default(), &hosts_node);
    for group in source.child_nodes(&hosts_path)? {
        let settings = inherit_settings(&base, &group);
        for host in source.child_nodes(&group.path)? {
            builder.walk_host(&group.name, &host, vec![host.name.clone()], &settings)?;
        }
    }

    let mut wildcard_hosts = builder.wildcard_hosts;
    wildcard_hosts.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let model = VirtualHosts {
        generation,
        hosts: builder.hosts,
        wildcard_hosts,
        default_hostname: hosts_node.non_empty(layout::DEFAULT_HOSTNAME).map(str::to_ascii_lowercase),
        default_context_path: hosts_node.non_empty(layout::DEFAULT_CONTEXT_PATH).map(str::to_string),
        matching_ignored_prefix: hosts_node
            .non_empty(layout::MATCHING_IGNORED_PREFIX)
            .map(|p| p.trim_matches('/').to_string()),
        prefix_exclusions: hosts_node.strings(layout::PREFIX_EXCLUSIONS),
        suffix_exclusions: hosts_node.strings(layout::SUFFIX_EXCLUSIONS),
        channels: read_channels(source)?,
        blueprints: read_blueprints(source)?,
        sites: builder.used_sites,
        unavailable_roots: builder.unavailable_roots,
    };

    tracing::debug!(
        generation,
        hosts = model.hosts.len() + model.wildcard_hosts.len(),
        sites = model.sites.len(),
        "Virtual hosts built"
    );
    Ok(model)
}

struct HostsBuilder<'a, 'p> {
    source: &'a dyn ConfigurationSource,
    sites: &'p mut dyn SiteProvider,
    hosts: HashMap<String, Arc<VirtualHost>>,
    wildcard_hosts: Vec<(String, Arc<VirtualHost>)>,
    used_sites: BTreeMap<String, Arc<HstSite>>,
    unavailable_roots: BTreeSet<String>,
}

impl HostsBuilder<'_, '_> {
    /// `labels` holds the host name segments from the top-level domain down.
    fn walk_host(
        &mut self,
        group: &str,
        node: &SourceNode,
        labels: Vec<String>,
        parent: &MountSettings,
    ) -> ModelResult<()> {
        let settings = inherit_settings(parent, node);
        let host_name = labels.iter().rev().cloned().collect::<Vec<_>>().join(".").to_ascii_lowercase();
        let mut root_mounts: BTreeMap<u16, Arc<dyn Mount>> = BTreeMap::new();

        for child in self.source.child_nodes(&node.path)? {
            if child.name == layout::ROOT_MOUNT {
                let mount = self.build_mount(&child, &host_name, 0, String::new(), &settings)?;
                root_mounts.insert(0, mount);
            } else if let Ok(port) = child.name.parse::<u16>() {
                let port_settings = inherit_settings(&settings, &child);
                let root = self.source.node(&path::join(&child.path, layout::ROOT_MOUNT))?;
                match root {
                    Some(root) => {
                        let mount = self.build_mount(&root, &host_name, port, String::new(), &port_settings)?;
                        root_mounts.insert(port, mount);
                    }
                    None => tracing::warn!(host = %host_name, port, "Port mount has no root mount"),
                }
            } else {
                let mut child_labels = labels.clone();
                child_labels.push(child.name.clone());
                self.walk_host(group, &child, child_labels, &settings)?;
            }
        }

        if root_mounts.is_empty() {
            return Ok(());
        }

        let host = Arc::new(VirtualHost {
            name: host_name.clone(),
            group: group.to_string(),
            root_mounts,
        });

        match wildcard_suffix(&host_name) {
            Some(suffix) => self.wildcard_hosts.push((suffix, host)),
            None => {
                if self.hosts.insert(host_name.clone(), host).is_some() {
                    tracing::warn!(host = %host_name, "Host defined twice, last definition wins");
                }
            }
        }
        Ok(())
    }

    fn build_mount(
        &mut self,
        node: &SourceNode,
        host_name: &str,
        port: u16,
        mount_path: String,
        parent: &MountSettings,
    ) -> ModelResult<Arc<dyn Mount>> {
        let settings = inherit_settings(parent, node);

        let mut children: BTreeMap<String, Arc<dyn Mount>> = BTreeMap::new();
        for child in self.source.child_nodes(&node.path)? {
            let child_path = format!("{}/{}", mount_path, child.name);
            let mount = self.build_mount(&child, host_name, port, child_path, &settings)?;
            children.insert(child.name.clone(), mount);
        }

        let is_mapped = node.boolean(layout::IS_MAPPED).unwrap_or(true);
        let mount_point = node.non_empty(layout::MOUNT_POINT).map(str::to_string);
        let mut content_path = None;
        let mut site = None;
        let mut preview_site = None;
        let mut site_unavailable = false;

        if is_mapped {
            match self.site_node(mount_point.as_deref())? {
                Some(site_node) => {
                    content_path = site_node.non_empty(layout::CONTENT).map(str::to_string);
                    let root = configuration_root(&site_node);
                    site = self.site(&root)?;
                    site_unavailable = site.is_none();

                    let preview_root = format!("{}{}", root, layout::PREVIEW_SUFFIX);
                    if self.source.exists(&preview_root)? {
                        preview_site = self.site(&preview_root)?;
                    }
                }
                None => {
                    tracing::warn!(
                        host = %host_name,
                        mount = %node.path,
                        mount_point = ?mount_point,
                        "Mapped mount points at no site"
                    );
                    site_unavailable = true;
                }
            }
        }

        let live = LiveMount {
            name: node.name.clone(),
            identifier: node.identifier.clone(),
            mount_path,
            host_name: host_name.to_string(),
            port,
            settings,
            mount_point,
            content_path,
            is_mapped,
            alias: node.non_empty(layout::ALIAS).map(str::to_string),
            parameters: node.parameters(layout::PARAMETER_NAMES, layout::PARAMETER_VALUES),
            site,
            preview_site,
            site_unavailable,
            children,
        };

        let mount: Arc<dyn Mount> = Arc::new(live);
        if node.string(layout::MOUNT_TYPE) == Some(layout::MOUNT_TYPE_PREVIEW) {
            return Ok(decorate_mount_as_preview(mount));
        }
        Ok(mount)
    }

    fn site_node(&self, mount_point: Option<&str>) -> ModelResult<Option<SourceNode>> {
        match mount_point {
            Some(mount_point) => Ok(self.source.node(mount_point)?),
            None => Ok(None),
        }
    }

    fn site(&mut self, root: &str) -> ModelResult<Option<Arc<HstSite>>> {
        let site = self.sites.site(root)?;
        match &site {
            Some(site) => {
                self.used_sites.insert(root.to_string(), site.clone());
            }
            None => {
                self.unavailable_roots.insert(root.to_string());
            }
        }
        Ok(site)
    }
}

/// `hst:configurationpath` of the site node, else the configuration root
/// named after the site.
fn configuration_root(site_node: &SourceNode) -> String {
    match site_node.non_empty(layout::CONFIGURATION_PATH) {
        Some(configured) => configured.trim_end_matches('/').to_string(),
        None => path::join(
            &path::join(layout::HST_ROOT, layout::CONFIGURATIONS),
            &site_node.name,
        ),
    }
}

/// Suffix matched by a wildcard host (`_default_.example.com` → `.example.com`).
fn wildcard_suffix(host_name: &str) -> Option<String> {
    let (first, rest) = match host_name.split_once('.') {
        Some((first, rest)) => (first, Some(rest)),
        None => (host_name, None),
    };
    if first != layout::WILDCARD && first != "*" {
        return None;
    }
    Some(rest.map(|r| format!(".{}", r)).unwrap_or_default())
}

fn inherit_settings(parent: &MountSettings, node: &SourceNode) -> MountSettings {
    let mut settings = parent.clone();
    if let Some(scheme) = node.non_empty(layout::SCHEME) {
        settings.scheme = scheme.to_string();
    }
    if let Some(context_path) = node
        .string(layout::CONTEXT_PATH)
        .or_else(|| node.string(layout::DEFAULT_CONTEXT_PATH))
    {
        settings.context_path = Some(context_path.to_string());
    }
    let overrides = [
        (layout::HOMEPAGE, &mut settings.homepage),
        (layout::PAGE_NOT_FOUND, &mut settings.page_not_found),
        (layout::LOCALE, &mut settings.locale),
        (layout::NAMED_PIPELINE, &mut settings.named_pipeline),
    ];
    for (property, slot) in overrides {
        if let Some(value) = node.non_empty(property) {
            *slot = Some(value.to_string());
        }
    }
    if let Some(version) = node.boolean(layout::VERSION_IN_PREVIEW_HEADER) {
        settings.version_in_preview_header = version;
    }
    settings
}

fn read_channels(source: &dyn ConfigurationSource) -> ModelResult<BTreeMap<String, Channel>> {
    let channels_path = path::join(layout::HST_ROOT, layout::CHANNELS);
    let mut channels = BTreeMap::new();
    for node in source.child_nodes(&channels_path)? {
        let properties = node
            .properties
            .iter()
            .filter(|(name, _)| !name.starts_with("jcr:"))
            .filter_map(|(name, value)| match value {
                PropertyValue::String(s) => Some((name.clone(), s.clone())),
                PropertyValue::Bool(b) => Some((name.clone(), b.to_string())),
                PropertyValue::Long(l) => Some((name.clone(), l.to_string())),
                PropertyValue::Strings(_) => None,
            })
            .collect();
        let channel = Channel {
            id: node.name.clone(),
            name: node.non_empty(layout::NAME).unwrap_or(&node.name).to_string(),
            properties,
        };
        channels.insert(channel.id.clone(), channel);
    }
    Ok(channels)
}

fn read_blueprints(source: &dyn ConfigurationSource) -> ModelResult<BTreeMap<String, Blueprint>> {
    let blueprints_path = path::join(layout::HST_ROOT, layout::BLUEPRINTS);
    let mut blueprints = BTreeMap::new();
    for node in source.child_nodes(&blueprints_path)? {
        let blueprint = Blueprint {
            id: node.name.clone(),
            name: node.non_empty(layout::NAME).unwrap_or(&node.name).to_string(),
            description: node.non_empty(layout::DESCRIPTION).map(str::to_string),
        };
        blueprints.insert(blueprint.id.clone(), blueprint);
    }
    Ok(blueprints)
}
