//! Loading of a root's contributing sections and cache-key fingerprinting.
//!
//! # Fingerprint
//! A SHA-256 over the canonical text of every node read for the root: the
//! section path, then for each node in pre-order its path, primary type,
//! identifier, properties (sorted by name) and child order. Two builds with
//! equal [`ConfigurationKey`]s read byte-identical inputs, so they can share
//! one composed instance.

use std::collections::HashMap;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::composer::chain::{ConfigurationChain, Contributor, Section};
use crate::error::BuildResult;
use crate::source::{ConfigurationSource, SourceNode};

/// Identity of a composed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ConfigurationKey {
    pub root_path: String,
    /// Contributor paths in composition order.
    pub chain: Vec<String>,
    /// Hex SHA-256 of the contributing content.
    pub fingerprint: String,
}

/// Nodes of one section read from one contributor.
#[derive(Debug, Clone)]
pub struct LoadedSection {
    pub contributor: usize,
    pub section: Section,
    pub path: String,
    /// Pre-order node paths, empty when the section does not exist.
    pub node_paths: Vec<String>,
}

/// Everything read from the source to build one configuration root.
#[derive(Debug, Clone)]
pub struct LoadedRoot {
    pub chain: ConfigurationChain,
    pub sections: Vec<LoadedSection>,
    nodes: HashMap<String, SourceNode>,
}

impl LoadedRoot {
    /// Resolve the chain and read every contributing section.
    pub fn load(source: &dyn ConfigurationSource, root_path: &str) -> BuildResult<Self> {
        let chain = ConfigurationChain::resolve(source, root_path)?;
        let mut sections = Vec::new();
        let mut nodes = HashMap::new();

        for (index, contributor) in chain.contributors.iter().enumerate() {
            for section in all_sections() {
                let Some(section_path) = contributor.section_path(section) else {
                    continue;
                };
                let subtree = source.subtree(&section_path)?;
                let node_paths = subtree.iter().map(|n| n.path.clone()).collect();
                for node in subtree {
                    nodes.entry(node.path.clone()).or_insert(node);
                }
                sections.push(LoadedSection {
                    contributor: index,
                    section,
                    path: section_path,
                    node_paths,
                });
            }
        }

        tracing::trace!(root = %root_path, nodes = nodes.len(), "Configuration root loaded");
        Ok(Self {
            chain,
            sections,
            nodes,
        })
    }

    pub fn root_path(&self) -> &str {
        &self.chain.root_path
    }

    pub fn node(&self, path: &str) -> Option<&SourceNode> {
        self.nodes.get(path)
    }

    pub fn contributor(&self, index: usize) -> &Contributor {
        &self.chain.contributors[index]
    }

    /// Loaded sections of one kind, in contributor order.
    pub fn sections_of(&self, section: Section) -> impl Iterator<Item = &LoadedSection> {
        self.sections.iter().filter(move |s| s.section == section)
    }

    /// Direct children of a loaded node, in stored order.
    pub fn children(&self, node: &SourceNode) -> Vec<&SourceNode> {
        node.children
            .iter()
            .filter_map(|name| self.nodes.get(&node.child_path(name)))
            .collect()
    }

    /// First definition per name of the top-level nodes of `section`.
    pub fn top_level(&self, section: Section) -> Vec<(&SourceNode, &LoadedSection)> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for loaded in self.sections_of(section) {
            let Some(section_node) = self.nodes.get(&loaded.path) else {
                continue;
            };
            for child in self.children(section_node) {
                if seen.insert(child.name.clone()) {
                    out.push((child, loaded));
                }
            }
        }
        out
    }

    /// Every loaded node of the given sections, in section then pre-order.
    pub fn nodes_of<'a>(&'a self, filter: impl Fn(Section) -> bool + 'a) -> impl Iterator<Item = &'a SourceNode> + 'a {
        self.sections
            .iter()
            .filter(move |s| filter(s.section))
            .flat_map(move |s| s.node_paths.iter().filter_map(move |p| self.nodes.get(p)))
    }

    /// Key of the components bundle: component sections only.
    pub fn components_key(&self) -> ConfigurationKey {
        self.key(Section::is_component_section)
    }

    /// Key of the whole site: every section.
    pub fn site_key(&self) -> ConfigurationKey {
        self.key(|_| true)
    }

    fn key(&self, filter: impl Fn(Section) -> bool) -> ConfigurationKey {
        let mut hasher = Sha256::new();
        for loaded in self.sections.iter().filter(|s| filter(s.section)) {
            hasher.update(b"section\0");
            hasher.update(loaded.path.as_bytes());
            for node_path in &loaded.node_paths {
                if let Some(node) = self.nodes.get(node_path) {
                    hash_node(&mut hasher, node);
                }
            }
        }

        ConfigurationKey {
            root_path: self.chain.root_path.clone(),
            chain: self.chain.contributor_paths(),
            fingerprint: hex::encode(hasher.finalize().to_vec()),
        }
    }
}

fn all_sections() -> [Section; 7] {
    [
        Section::Pages,
        Section::Components,
        Section::Templates,
        Section::Catalog,
        Section::Containers,
        Section::SiteMap,
        Section::SiteMapItemHandlers,
    ]
}

fn hash_node(hasher: &mut Sha256, node: &SourceNode) {
    hasher.update(b"\0node\0");
    hasher.update(node.path.as_bytes());
    hasher.update(b"\0");
    hasher.update(node.primary_type.as_bytes());
    hasher.update(b"\0");
    hasher.update(node.identifier.as_bytes());
    for (name, value) in &node.properties {
        hasher.update(b"\0p\0");
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.canonical().as_bytes());
    }
    hasher.update(b"\0c\0");
    hasher.update(node.children.join("/").as_bytes());
}
