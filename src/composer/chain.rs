//! Inheritance chain of a configuration root.
//!
//! # Responsibilities
//! - Expand `hst:inheritsfrom` depth-first in declared order
//! - Classify every entry as an inherited root or an inherited workspace path
//! - Append the reserved default root last
//! - Record the dependency paths whose change invalidates the root
//!
//! # Design Decisions
//! - Inheritance is transitive; a root revisited on the current path is a cycle
//! - A root reached twice through different branches contributes once, at its
//!   first position
//! - Missing inherited roots are skipped with a warning but still recorded as
//!   dependencies so their later creation triggers a rebuild

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{BuildResult, ConfigurationError};
use crate::source::{layout, path, ConfigurationSource, SourceNode};

/// A section of a configuration root that the builders read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Section {
    Pages,
    Components,
    Templates,
    Catalog,
    Containers,
    SiteMap,
    SiteMapItemHandlers,
}

impl Section {
    pub fn node_name(self) -> &'static str {
        match self {
            Section::Pages => layout::PAGES,
            Section::Components => layout::COMPONENTS,
            Section::Templates => layout::TEMPLATES,
            Section::Catalog => layout::CATALOG,
            Section::Containers => layout::CONTAINERS,
            Section::SiteMap => layout::SITEMAP,
            Section::SiteMapItemHandlers => layout::SITEMAP_ITEM_HANDLERS,
        }
    }

    fn from_node_name(name: &str) -> Option<Self> {
        ROOT_SECTIONS
            .iter()
            .chain(WORKSPACE_SECTIONS.iter())
            .copied()
            .find(|s| s.node_name() == name)
    }

    /// Sections that take part in the components fingerprint.
    pub fn is_component_section(self) -> bool {
        !matches!(self, Section::SiteMap | Section::SiteMapItemHandlers)
    }
}

/// Sections read from the root node of a configuration.
pub const ROOT_SECTIONS: [Section; 6] = [
    Section::Pages,
    Section::Components,
    Section::Templates,
    Section::Catalog,
    Section::SiteMap,
    Section::SiteMapItemHandlers,
];

/// Sections read from a `hst:workspace` node.
pub const WORKSPACE_SECTIONS: [Section; 3] = [Section::Pages, Section::Containers, Section::SiteMap];

/// How a contributor takes part in the composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ContributorKind {
    /// The requesting root's non-workspace sections.
    Own,
    /// The requesting root's own workspace.
    OwnWorkspace,
    /// Another root's non-workspace sections.
    InheritedRoot,
    /// Another root's workspace, or a sub-path of it, listed explicitly.
    InheritedWorkspace,
}

/// One entry of the composition order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contributor {
    pub path: String,
    pub kind: ContributorKind,
    /// Path of the `hst:workspace` node for workspace contributors.
    pub workspace: Option<String>,
}

impl Contributor {
    /// Path of `section` for this contributor, if it provides that section.
    pub fn section_path(&self, section: Section) -> Option<String> {
        match self.kind {
            ContributorKind::Own | ContributorKind::InheritedRoot => ROOT_SECTIONS
                .contains(&section)
                .then(|| path::join(&self.path, section.node_name())),
            ContributorKind::OwnWorkspace | ContributorKind::InheritedWorkspace => {
                let workspace = self.workspace.as_deref()?;
                if !WORKSPACE_SECTIONS.contains(&section) {
                    return None;
                }
                if self.path == workspace {
                    return Some(path::join(workspace, section.node_name()));
                }
                let section_root = path::join(workspace, section.node_name());
                if self.path == section_root {
                    return Some(section_root);
                }
                // Deeper paths are only meaningful for container folders.
                (section == Section::Containers && path::is_same_or_descendant(&self.path, &section_root))
                    .then(|| self.path.clone())
            }
        }
    }

    /// Root of the containers namespace references are resolved against.
    pub fn containers_root(&self) -> Option<String> {
        self.workspace
            .as_deref()
            .map(|w| path::join(w, layout::CONTAINERS))
    }
}

/// How a dependency path is matched against changed paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DependencyScope {
    /// Any change at, above or below the path.
    Subtree,
    /// The node itself, its ancestors, and its direct properties or children.
    Node,
}

/// A path whose change invalidates a configuration root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub path: String,
    pub scope: DependencyScope,
}

impl Dependency {
    pub fn subtree(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            scope: DependencyScope::Subtree,
        }
    }

    pub fn node(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            scope: DependencyScope::Node,
        }
    }

    pub fn is_affected_by(&self, changed: &str) -> bool {
        match self.scope {
            DependencyScope::Subtree => path::overlaps(&self.path, changed),
            DependencyScope::Node => {
                path::is_same_or_descendant(&self.path, changed)
                    || path::parent(changed) == Some(self.path.as_str())
            }
        }
    }
}

/// The ordered contributors of one configuration root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationChain {
    pub root_path: String,
    pub contributors: Vec<Contributor>,
    pub dependencies: Vec<Dependency>,
}

impl ConfigurationChain {
    /// Resolve the chain of `root_path` against the source.
    pub fn resolve(source: &dyn ConfigurationSource, root_path: &str) -> BuildResult<Self> {
        let root = source
            .node(root_path)?
            .ok_or_else(|| ConfigurationError::MissingRoot(root_path.to_string()))?;
        let collection = path::parent(root_path).unwrap_or("/").to_string();
        let own_workspace = path::join(root_path, layout::WORKSPACE);

        let mut resolver = ChainResolver {
            source,
            root_path,
            collection: &collection,
            chain: ConfigurationChain {
                root_path: root_path.to_string(),
                contributors: vec![
                    Contributor {
                        path: root_path.to_string(),
                        kind: ContributorKind::Own,
                        workspace: None,
                    },
                    Contributor {
                        path: own_workspace.clone(),
                        kind: ContributorKind::OwnWorkspace,
                        workspace: Some(own_workspace),
                    },
                ],
                dependencies: vec![Dependency::subtree(root_path)],
            },
            seen: HashSet::from([root_path.to_string()]),
            visiting: vec![root_path.to_string()],
        };

        resolver.follow(&root)?;

        let default_root = path::join(&collection, layout::DEFAULT_CONFIGURATION);
        if !resolver.seen.contains(&default_root) {
            resolver.inherit_root(&default_root)?;
        }

        Ok(resolver.chain)
    }

    /// Contributor paths in order, used as part of the cache key.
    pub fn contributor_paths(&self) -> Vec<String> {
        self.contributors.iter().map(|c| c.path.clone()).collect()
    }

    /// True when any of `changed` intersects this chain's dependencies.
    pub fn is_affected_by<'a>(&self, mut changed: impl Iterator<Item = &'a str>) -> bool {
        changed.any(|c| self.dependencies.iter().any(|d| d.is_affected_by(c)))
    }
}

struct ChainResolver<'a> {
    source: &'a dyn ConfigurationSource,
    root_path: &'a str,
    collection: &'a str,
    chain: ConfigurationChain,
    seen: HashSet<String>,
    visiting: Vec<String>,
}

impl ChainResolver<'_> {
    fn follow(&mut self, node: &SourceNode) -> BuildResult<()> {
        for entry in node.strings(layout::INHERITS_FROM) {
            let target = path::resolve(&node.path, &entry).ok_or_else(|| {
                ConfigurationError::InvalidInheritsFrom {
                    root: node.path.clone(),
                    entry: entry.clone(),
                }
            })?;

            if path::parent(&target) == Some(self.collection) {
                self.inherit_root(&target)?;
            } else if let Some(workspace) = self.workspace_of(&target) {
                self.inherit_workspace(target, workspace);
            } else {
                tracing::warn!(
                    root = %self.root_path,
                    entry = %entry,
                    "Ignoring inherits-from entry that is neither a configuration nor a workspace path"
                );
            }
        }
        Ok(())
    }

    fn inherit_root(&mut self, target: &str) -> BuildResult<()> {
        if self.visiting.iter().any(|v| v == target) {
            return Err(ConfigurationError::InheritanceCycle {
                root: self.root_path.to_string(),
                path: target.to_string(),
            }
            .into());
        }
        if !self.seen.insert(target.to_string()) {
            return Ok(());
        }

        self.chain.dependencies.push(Dependency::node(target));
        for section in ROOT_SECTIONS {
            self.chain
                .dependencies
                .push(Dependency::subtree(path::join(target, section.node_name())));
        }

        let Some(node) = self.source.node(target)? else {
            tracing::warn!(root = %self.root_path, inherited = %target, "Inherited configuration does not exist");
            return Ok(());
        };

        self.chain.contributors.push(Contributor {
            path: target.to_string(),
            kind: ContributorKind::InheritedRoot,
            workspace: None,
        });

        self.visiting.push(target.to_string());
        let result = self.follow(&node);
        self.visiting.pop();
        result
    }

    fn inherit_workspace(&mut self, target: String, workspace: String) {
        // The own workspace is always part of the chain.
        if path::is_same_or_descendant(&target, &path::join(self.root_path, layout::WORKSPACE)) {
            return;
        }
        if !self.seen.insert(target.clone()) {
            return;
        }
        self.chain.dependencies.push(Dependency::subtree(target.clone()));
        self.chain.contributors.push(Contributor {
            path: target,
            kind: ContributorKind::InheritedWorkspace,
            workspace: Some(workspace),
        });
    }

    /// `…/<root>/hst:workspace` when `target` lies in a workspace.
    fn workspace_of(&self, target: &str) -> Option<String> {
        let rest = target.strip_prefix(self.collection)?.strip_prefix('/')?;
        let mut segments = rest.split('/');
        let root_name = segments.next()?;
        if segments.next()? != layout::WORKSPACE {
            return None;
        }
        if let Some(section) = segments.next() {
            Section::from_node_name(section).filter(|s| WORKSPACE_SECTIONS.contains(s))?;
        }
        Some(path::join(&path::join(self.collection, root_name), layout::WORKSPACE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use crate::source::InMemorySource;

    const CONFIGS: &str = "/hst:hst/hst:configurations";

    fn source(doc: &str) -> InMemorySource {
        InMemorySource::from_toml_str(doc).unwrap()
    }

    #[test]
    fn test_declared_order_and_default_last() {
        let source = source(
            r#"
            ["hst:hst"."hst:configurations".project]
            "hst:inheritsfrom" = ["../common", "../common/hst:workspace", "../base"]
            ["hst:hst"."hst:configurations".common]
            "hst:inheritsfrom" = ["../base"]
            ["hst:hst"."hst:configurations".base]
            ["hst:hst"."hst:configurations"."hst:default"]
            "#,
        );

        let chain = ConfigurationChain::resolve(&source, &format!("{}/project", CONFIGS)).unwrap();
        let paths: Vec<String> = chain
            .contributor_paths()
            .into_iter()
            .map(|p| p.trim_start_matches(CONFIGS).to_string())
            .collect();
        assert_eq!(
            paths,
            vec![
                "/project",
                "/project/hst:workspace",
                "/common",
                "/base",
                "/common/hst:workspace",
                "/hst:default",
            ]
        );
    }

    #[test]
    fn test_cycle_is_configuration_error() {
        let source = source(
            r#"
            ["hst:hst"."hst:configurations".a]
            "hst:inheritsfrom" = ["../b"]
            ["hst:hst"."hst:configurations".b]
            "hst:inheritsfrom" = ["../a"]
            "#,
        );

        let err = ConfigurationChain::resolve(&source, &format!("{}/a", CONFIGS)).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Configuration(ConfigurationError::InheritanceCycle { .. })
        ));
    }

    #[test]
    fn test_missing_root_is_error() {
        let source = source("[\"hst:hst\".\"hst:configurations\".a]");
        let err = ConfigurationChain::resolve(&source, &format!("{}/zzz", CONFIGS)).unwrap_err();
        assert!(matches!(err, BuildError::Configuration(ConfigurationError::MissingRoot(_))));
    }

    #[test]
    fn test_workspace_section_paths() {
        let workspace = format!("{}/common/hst:workspace", CONFIGS);
        let whole = Contributor {
            path: workspace.clone(),
            kind: ContributorKind::InheritedWorkspace,
            workspace: Some(workspace.clone()),
        };
        assert_eq!(
            whole.section_path(Section::Pages),
            Some(format!("{}/hst:pages", workspace))
        );
        assert_eq!(whole.section_path(Section::Components), None);

        let folder = Contributor {
            path: format!("{}/hst:containers/shared", workspace),
            kind: ContributorKind::InheritedWorkspace,
            workspace: Some(workspace.clone()),
        };
        assert_eq!(folder.section_path(Section::Pages), None);
        assert_eq!(
            folder.section_path(Section::Containers),
            Some(format!("{}/hst:containers/shared", workspace))
        );
    }

    #[test]
    fn test_dependency_matching() {
        let node = Dependency::node("/c/common");
        assert!(node.is_affected_by("/c/common/hst:inheritsfrom"));
        assert!(node.is_affected_by("/c"));
        assert!(!node.is_affected_by("/c/common/hst:workspace/hst:pages/home"));

        let subtree = Dependency::subtree("/c/common/hst:workspace");
        assert!(subtree.is_affected_by("/c/common/hst:workspace/hst:pages/home"));
        assert!(!subtree.is_affected_by("/c/common/hst:pages/home"));
    }
}
