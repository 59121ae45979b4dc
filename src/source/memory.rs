//! In-memory configuration tree.
//!
//! # Responsibilities
//! - Hold the node tree behind a read/write lock
//! - Apply edits atomically and publish the changed paths as one batch
//! - Compute the change set between two tree versions (file reload)
//!
//! # Design Decisions
//! - An edit works on a copy and is committed only when the closure succeeds
//! - Property changes are reported as `<node path>/<property name>`
//! - Identifiers of loaded nodes are derived from their path so reloading an
//!   unchanged document yields an identical tree

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{SourceError, SourceResult};
use crate::source::layout;
use crate::source::node::{PropertyValue, SourceNode};
use crate::source::path;
use crate::source::{ChangeBatch, ConfigurationSource};

const ROOT_TYPE: &str = "rep:root";

/// A complete configuration tree indexed by absolute path.
#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: HashMap<String, SourceNode>,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    /// Create a tree holding only the root node.
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), SourceNode::new("/", ROOT_TYPE, stable_identifier("/")));
        Self { nodes }
    }

    /// Parse a TOML document where every table is a node.
    ///
    /// `jcr:primaryType` and `jcr:uuid` keys set the node type and identifier;
    /// every other non-table key becomes a property.
    pub fn from_toml_str(document: &str) -> SourceResult<Self> {
        let table: toml::Table = document
            .parse()
            .map_err(|e: toml::de::Error| SourceError::InvalidDocument(e.to_string()))?;

        let mut tree = Self::new();
        tree.load_table("/", &table)?;
        Ok(tree)
    }

    fn load_table(&mut self, node_path: &str, table: &toml::Table) -> SourceResult<()> {
        for (key, value) in table {
            match value {
                toml::Value::Table(child) => {
                    let primary_type = child
                        .get(layout::PRIMARY_TYPE)
                        .and_then(toml::Value::as_str)
                        .unwrap_or(layout::NT_UNSTRUCTURED);
                    let child_path = path::join(node_path, key);
                    let identifier = child
                        .get(layout::IDENTIFIER)
                        .and_then(toml::Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| stable_identifier(&child_path));
                    self.insert_node(node_path, key, primary_type, identifier)?;
                    self.load_table(&child_path, child)?;
                }
                _ if key == layout::PRIMARY_TYPE || key == layout::IDENTIFIER => {}
                other => {
                    let property = convert_value(node_path, key, other)?;
                    if let Some(node) = self.nodes.get_mut(node_path) {
                        node.properties.insert(key.clone(), property);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&SourceNode> {
        self.nodes.get(path)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn insert_node(
        &mut self,
        parent: &str,
        name: &str,
        primary_type: &str,
        identifier: String,
    ) -> SourceResult<String> {
        let child_path = path::join(parent, name);
        if self.nodes.contains_key(&child_path) {
            return Err(SourceError::AlreadyExists(child_path));
        }
        let parent_node = self
            .nodes
            .get_mut(parent)
            .ok_or_else(|| SourceError::NotFound(parent.to_string()))?;
        parent_node.children.push(name.to_string());
        self.nodes
            .insert(child_path.clone(), SourceNode::new(&child_path, primary_type, identifier));
        Ok(child_path)
    }

    fn remove_subtree(&mut self, node_path: &str) -> SourceResult<()> {
        if node_path == "/" {
            return Err(SourceError::InvalidDocument("cannot remove the root node".into()));
        }
        if !self.nodes.contains_key(node_path) {
            return Err(SourceError::NotFound(node_path.to_string()));
        }
        self.nodes.retain(|p, _| !path::is_same_or_descendant(p, node_path));
        if let Some(parent) = path::parent(node_path).and_then(|p| self.nodes.get_mut(p)) {
            let name = path::name(node_path);
            parent.children.retain(|c| c != name);
        }
        Ok(())
    }

    fn node_mut(&mut self, node_path: &str) -> SourceResult<&mut SourceNode> {
        self.nodes
            .get_mut(node_path)
            .ok_or_else(|| SourceError::NotFound(node_path.to_string()))
    }

    /// Paths that differ between `self` (old) and `other` (new).
    ///
    /// Added and removed nodes are reported by node path, modified
    /// properties by property path. Descendants of an added or removed node
    /// are folded into that node's entry.
    pub fn diff(&self, other: &NodeTree) -> BTreeSet<String> {
        let mut structural: BTreeSet<String> = BTreeSet::new();
        for p in self.nodes.keys() {
            if !other.nodes.contains_key(p) {
                structural.insert(p.clone());
            }
        }
        for p in other.nodes.keys() {
            if !self.nodes.contains_key(p) {
                structural.insert(p.clone());
            }
        }

        let mut changed: BTreeSet<String> = BTreeSet::new();
        for p in &structural {
            let covered = path::parent(p)
                .map(|parent| structural.iter().any(|s| s != p && path::is_same_or_descendant(parent, s)))
                .unwrap_or(false);
            if !covered {
                changed.insert(p.clone());
            }
        }

        for (p, old) in &self.nodes {
            let Some(new) = other.nodes.get(p) else {
                continue;
            };
            if old.primary_type != new.primary_type || old.identifier != new.identifier {
                changed.insert(p.clone());
                continue;
            }
            let names: BTreeSet<&String> =
                old.properties.keys().chain(new.properties.keys()).collect();
            for name in names {
                if old.properties.get(name) != new.properties.get(name) {
                    changed.insert(path::join(p, name));
                }
            }
            if old.children != new.children {
                let existing_both = old.children.iter().all(|c| new.children.contains(c))
                    && new.children.iter().all(|c| old.children.contains(c));
                // Pure reorder: the adds/removes above do not cover it.
                if existing_both {
                    changed.insert(p.clone());
                }
            }
        }
        changed
    }
}

fn stable_identifier(node_path: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, node_path.as_bytes()).to_string()
}

fn convert_value(node_path: &str, key: &str, value: &toml::Value) -> SourceResult<PropertyValue> {
    match value {
        toml::Value::String(s) => Ok(PropertyValue::String(s.clone())),
        toml::Value::Boolean(b) => Ok(PropertyValue::Bool(*b)),
        toml::Value::Integer(i) => Ok(PropertyValue::Long(*i)),
        toml::Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(PropertyValue::Strings)
            .ok_or_else(|| {
                SourceError::InvalidDocument(format!(
                    "property '{}' on '{}' must be an array of strings",
                    key, node_path
                ))
            }),
        _ => Err(SourceError::InvalidDocument(format!(
            "unsupported value for property '{}' on '{}'",
            key, node_path
        ))),
    }
}

/// Records mutations made during one [`InMemorySource::edit`] call.
pub struct TreeEditor<'a> {
    tree: &'a mut NodeTree,
    changed: BTreeSet<String>,
}

impl<'a> TreeEditor<'a> {
    fn new(tree: &'a mut NodeTree) -> Self {
        Self {
            tree,
            changed: BTreeSet::new(),
        }
    }

    /// Add a child node and return its path.
    pub fn add_node(&mut self, parent: &str, name: &str, primary_type: &str) -> SourceResult<String> {
        let child_path =
            self.tree
                .insert_node(parent, name, primary_type, Uuid::new_v4().to_string())?;
        self.changed.insert(child_path.clone());
        Ok(child_path)
    }

    pub fn set_property(
        &mut self,
        node_path: &str,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> SourceResult<()> {
        self.tree
            .node_mut(node_path)?
            .properties
            .insert(name.to_string(), value.into());
        self.changed.insert(path::join(node_path, name));
        Ok(())
    }

    pub fn remove_property(&mut self, node_path: &str, name: &str) -> SourceResult<()> {
        if self.tree.node_mut(node_path)?.properties.remove(name).is_some() {
            self.changed.insert(path::join(node_path, name));
        }
        Ok(())
    }

    /// Remove a node with its whole subtree.
    pub fn remove_node(&mut self, node_path: &str) -> SourceResult<()> {
        self.tree.remove_subtree(node_path)?;
        self.changed.insert(node_path.to_string());
        Ok(())
    }

    pub fn node(&self, node_path: &str) -> Option<&SourceNode> {
        self.tree.get(node_path)
    }
}

/// A [`ConfigurationSource`] backed by an in-memory [`NodeTree`].
#[derive(Debug)]
pub struct InMemorySource {
    tree: RwLock<NodeTree>,
    available: AtomicBool,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ChangeBatch>>>,
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new(NodeTree::new())
    }
}

impl InMemorySource {
    pub fn new(tree: NodeTree) -> Self {
        Self {
            tree: RwLock::new(tree),
            available: AtomicBool::new(true),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn from_toml_str(document: &str) -> SourceResult<Self> {
        Ok(Self::new(NodeTree::from_toml_str(document)?))
    }

    /// Register a consumer of change batches.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ChangeBatch> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Simulate transient read failures.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Apply a set of mutations atomically.
    ///
    /// The tree is only replaced when `edit` succeeds; the changed paths are
    /// then published as a single batch.
    pub fn edit<T, F>(&self, edit: F) -> SourceResult<T>
    where
        F: FnOnce(&mut TreeEditor<'_>) -> SourceResult<T>,
    {
        let (out, changed) = {
            let mut guard = self.tree.write();
            let mut working = guard.clone();
            let mut editor = TreeEditor::new(&mut working);
            let out = edit(&mut editor)?;
            let changed = editor.changed;
            *guard = working;
            (out, changed)
        };

        if !changed.is_empty() {
            self.publish(ChangeBatch::new(changed));
        }
        Ok(out)
    }

    /// Swap in a whole new tree and publish the difference.
    pub fn replace_tree(&self, tree: NodeTree) -> ChangeBatch {
        let changed = {
            let mut guard = self.tree.write();
            let changed = guard.diff(&tree);
            *guard = tree;
            changed
        };
        let batch = ChangeBatch::new(changed);
        if !batch.is_empty() {
            self.publish(batch.clone());
        }
        batch
    }

    fn publish(&self, batch: ChangeBatch) {
        tracing::debug!(paths = batch.paths.len(), "Publishing configuration change batch");
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(batch.clone()).is_ok());
    }
}

impl ConfigurationSource for InMemorySource {
    fn node(&self, node_path: &str) -> SourceResult<Option<SourceNode>> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable(format!("read of '{}' failed", node_path)));
        }
        Ok(self.tree.read().get(node_path).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
        ["hst:hst"]
        "jcr:primaryType" = "hst:hst"

        ["hst:hst"."hst:configurations".demo]
        "hst:inheritsfrom" = ["../common"]
        "jcr:primaryType" = "hst:configuration"

        ["hst:hst"."hst:configurations".common]
        "jcr:primaryType" = "hst:configuration"
    "#;

    #[test]
    fn test_load_toml_tree() {
        let tree = NodeTree::from_toml_str(DOC).unwrap();
        let demo = tree.get("/hst:hst/hst:configurations/demo").unwrap();
        assert_eq!(demo.primary_type, "hst:configuration");
        assert_eq!(demo.strings("hst:inheritsfrom"), vec!["../common".to_string()]);

        let configurations = tree.get("/hst:hst/hst:configurations").unwrap();
        assert_eq!(configurations.children, vec!["demo".to_string(), "common".to_string()]);
    }

    #[test]
    fn test_reload_is_stable() {
        let a = NodeTree::from_toml_str(DOC).unwrap();
        let b = NodeTree::from_toml_str(DOC).unwrap();
        assert!(a.diff(&b).is_empty());
    }

    #[test]
    fn test_diff_reports_properties_and_removals() {
        let old = NodeTree::from_toml_str(DOC).unwrap();
        let new = NodeTree::from_toml_str(
            r#"
            ["hst:hst"]
            "jcr:primaryType" = "hst:hst"

            ["hst:hst"."hst:configurations".demo]
            "hst:inheritsfrom" = ["../other"]
            "jcr:primaryType" = "hst:configuration"
        "#,
        )
        .unwrap();

        let changed = old.diff(&new);
        assert!(changed.contains("/hst:hst/hst:configurations/demo/hst:inheritsfrom"));
        assert!(changed.contains("/hst:hst/hst:configurations/common"));
    }

    #[test]
    fn test_edit_publishes_batch() {
        let source = InMemorySource::from_toml_str(DOC).unwrap();
        let mut rx = source.subscribe();

        source
            .edit(|tree| {
                tree.remove_node("/hst:hst/hst:configurations/common")?;
                tree.set_property("/hst:hst/hst:configurations/demo", "hst:inheritsfrom", Vec::<String>::new())
            })
            .unwrap();

        let batch = rx.try_recv().unwrap();
        assert_eq!(batch.paths.len(), 2);
        assert!(source.node("/hst:hst/hst:configurations/common").unwrap().is_none());
    }

    #[test]
    fn test_failed_edit_is_not_committed() {
        let source = InMemorySource::from_toml_str(DOC).unwrap();
        let result = source.edit(|tree| {
            tree.remove_node("/hst:hst/hst:configurations/common")?;
            tree.remove_node("/does/not/exist")
        });
        assert!(result.is_err());
        assert!(source.node("/hst:hst/hst:configurations/common").unwrap().is_some());
    }

    #[test]
    fn test_unavailable_source() {
        let source = InMemorySource::from_toml_str(DOC).unwrap();
        source.set_available(false);
        assert!(matches!(source.node("/hst:hst"), Err(SourceError::Unavailable(_))));
    }
}
