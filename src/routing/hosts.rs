//! Virtual hosts model and mount matching.
//!
//! # Responsibilities
//! - Resolve a request host by exact name, then by wildcard domain
//! - Pick the mount tree registered for the request port, else port 0
//! - Strip the matching-ignored prefix and walk child mounts by segment
//! - Expose global defaults, channels and blueprints
//!
//! # Design Decisions
//! - Immutable after construction; a new instance is published per rebuild
//! - Host names compare case-insensitively, paths case-sensitively
//! - Longest wildcard suffix wins; a bare wildcard host matches any name

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;

use crate::composer::HstSite;
use crate::error::ResolutionError;
use crate::routing::mount::Mount;
use crate::sitemap::{ItemDefaults, ResolvedSiteMapItem};

/// One host name with its mount trees per port.
#[derive(Debug)]
pub struct VirtualHost {
    pub(crate) name: String,
    pub(crate) group: String,
    /// Root mount per port; port 0 accepts any port.
    pub(crate) root_mounts: BTreeMap<u16, Arc<dyn Mount>>,
}

impl VirtualHost {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Root mount for `port`, falling back to the any-port tree.
    pub fn root_mount(&self, port: u16) -> Option<&Arc<dyn Mount>> {
        self.root_mounts.get(&port).or_else(|| self.root_mounts.get(&0))
    }

    pub fn ports(&self) -> impl Iterator<Item = u16> + '_ {
        self.root_mounts.keys().copied()
    }
}

/// A channel registered below `hst:channels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

/// A site blueprint registered below `hst:blueprints`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blueprint {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// The published, immutable hosts model.
#[derive(Debug)]
pub struct VirtualHosts {
    pub(crate) generation: u64,
    pub(crate) hosts: HashMap<String, Arc<VirtualHost>>,
    /// `(suffix, host)` sorted by descending suffix length.
    pub(crate) wildcard_hosts: Vec<(String, Arc<VirtualHost>)>,
    pub(crate) default_hostname: Option<String>,
    pub(crate) default_context_path: Option<String>,
    pub(crate) matching_ignored_prefix: Option<String>,
    pub(crate) prefix_exclusions: Vec<String>,
    pub(crate) suffix_exclusions: Vec<String>,
    pub(crate) channels: BTreeMap<String, Channel>,
    pub(crate) blueprints: BTreeMap<String, Blueprint>,
    /// Sites in use by configuration root path.
    pub(crate) sites: BTreeMap<String, Arc<HstSite>>,
    /// Mapped roots whose site could not be built.
    pub(crate) unavailable_roots: BTreeSet<String>,
}

impl VirtualHosts {
    /// Change sequence this model incorporates.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn default_hostname(&self) -> Option<&str> {
        self.default_hostname.as_deref()
    }

    pub fn default_context_path(&self) -> Option<&str> {
        self.default_context_path.as_deref()
    }

    pub fn matching_ignored_prefix(&self) -> Option<&str> {
        self.matching_ignored_prefix.as_deref()
    }

    /// True when the request pipeline must leave `path` alone.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.prefix_exclusions.iter().any(|p| path.starts_with(p.as_str()))
            || self.suffix_exclusions.iter().any(|s| path.ends_with(s.as_str()))
    }

    pub fn channels(&self) -> Vec<&Channel> {
        self.channels.values().collect()
    }

    pub fn blueprints(&self) -> Vec<&Blueprint> {
        self.blueprints.values().collect()
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Arc<VirtualHost>> {
        self.hosts.values().chain(self.wildcard_hosts.iter().map(|(_, h)| h))
    }

    pub fn site(&self, root_path: &str) -> Option<&Arc<HstSite>> {
        self.sites.get(root_path)
    }

    pub fn sites(&self) -> &BTreeMap<String, Arc<HstSite>> {
        &self.sites
    }

    pub fn unavailable_roots(&self) -> &BTreeSet<String> {
        &self.unavailable_roots
    }

    /// Host entry for a request host name (port already stripped).
    pub fn virtual_host(&self, host: &str) -> Option<&Arc<VirtualHost>> {
        let host = host.to_ascii_lowercase();
        if let Some(exact) = self.hosts.get(&host) {
            return Some(exact);
        }
        self.wildcard_hosts
            .iter()
            .find(|(suffix, _)| suffix.is_empty() || (host.len() > suffix.len() && host.ends_with(suffix.as_str())))
            .map(|(_, h)| h)
    }

    /// Resolve a request to a mount.
    ///
    /// `host` may carry a port (`localhost:8081`); without one the any-port
    /// tree is used.
    pub fn match_mount(&self, host: &str, context_path: &str, path: &str) -> Result<ResolvedMount, ResolutionError> {
        let (host_name, port) = split_host_port(host);
        let virtual_host = self
            .virtual_host(host_name)
            .ok_or_else(|| ResolutionError::HostNotFound(host_name.to_string()))?;
        let root = virtual_host
            .root_mount(port)
            .ok_or_else(|| ResolutionError::MountNotFound {
                host: host_name.to_string(),
                port,
            })?;

        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut ignored_prefix = None;
        if let Some(prefix) = self.matching_ignored_prefix.as_deref() {
            if segments.first() == Some(&prefix) {
                segments.remove(0);
                ignored_prefix = Some(prefix.to_string());
            }
        }

        // Descend as far as child mounts exist, then back off to the deepest
        // one whose context path matches.
        let mut descent = vec![root.clone()];
        while let Some(segment) = segments.get(descent.len() - 1) {
            match descent.last().and_then(|m| m.child(segment)) {
                Some(child) => descent.push(child),
                None => break,
            }
        }
        let consumed = descent
            .iter()
            .skip(1)
            .rposition(|m| context_path_matches(m.as_ref(), context_path))
            .map_or(0, |i| i + 1);
        let mount = descent.swap_remove(consumed);

        tracing::trace!(
            host = %host_name,
            port,
            mount = %mount.mount_path(),
            preview = mount.is_preview(),
            "Mount matched"
        );

        Ok(ResolvedMount {
            mount,
            host_name: host_name.to_ascii_lowercase(),
            port,
            context_path: context_path.to_string(),
            resolved_mount_path: join_segments(&segments[..consumed]),
            remaining_path: join_segments(&segments[consumed..]),
            matching_ignored_prefix: ignored_prefix,
        })
    }
}

/// A request matched to a mount.
#[derive(Debug, Clone)]
pub struct ResolvedMount {
    mount: Arc<dyn Mount>,
    host_name: String,
    port: u16,
    context_path: String,
    resolved_mount_path: String,
    remaining_path: String,
    matching_ignored_prefix: Option<String>,
}

impl ResolvedMount {
    pub fn mount(&self) -> &Arc<dyn Mount> {
        &self.mount
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Path segments consumed by the mount, `""` for a root mount.
    pub fn resolved_mount_path(&self) -> &str {
        &self.resolved_mount_path
    }

    /// Path left for sitemap matching.
    pub fn remaining_path(&self) -> &str {
        &self.remaining_path
    }

    pub fn matching_ignored_prefix(&self) -> Option<&str> {
        self.matching_ignored_prefix.as_deref()
    }

    /// Match a mount-relative path against the mount's sitemap.
    pub fn match_site_map_item(&self, path: &str) -> Result<ResolvedSiteMapItem, ResolutionError> {
        if !self.mount.is_mapped() {
            return Err(ResolutionError::UnmappedMount(self.mount.mount_path().to_string()));
        }
        let site = self
            .mount
            .site()
            .ok_or_else(|| ResolutionError::SiteUnavailable(self.mount.mount_path().to_string()))?;

        let defaults = ItemDefaults {
            named_pipeline: self.mount.named_pipeline().map(str::to_string),
            locale: self.mount.locale().map(str::to_string),
        };
        site.match_site_map_item(path, self.mount.homepage(), self.mount.page_not_found(), &defaults)
    }
}

fn split_host_port(host: &str) -> (&str, u16) {
    match host.rsplit_once(':') {
        Some((name, port)) => match port.parse() {
            Ok(port) => (name, port),
            Err(_) => (host, 0),
        },
        None => (host, 0),
    }
}

fn context_path_matches(mount: &dyn Mount, context_path: &str) -> bool {
    match mount.context_path() {
        Some(expected) => expected.trim_matches('/') == context_path.trim_matches('/'),
        None => true,
    }
}

fn join_segments(segments: &[&str]) -> String {
    if segments.is_empty() {
        String::new()
    } else {
        format!("/{}", segments.join("/"))
    }
}
