//! Configuration source boundary.
//!
//! # Data Flow
//! ```text
//! repository layer (external)
//!     → ConfigurationSource::node / child_nodes (bounded reads)
//!     → model builders (hosts, sitemap, composer)
//!
//! committed change
//!     → ChangeBatch { paths } on an mpsc channel
//!     → cache::invalidator consumes the batch
//! ```
//!
//! # Design Decisions
//! - The engine never writes through this interface
//! - Change notifications are an explicit channel, not registered callbacks
//! - `memory` and `file` implementations exist for tests and standalone runs

pub mod file;
pub mod layout;
pub mod memory;
pub mod node;
pub mod path;
pub mod watcher;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use crate::error::{SourceError, SourceResult};
pub use memory::{InMemorySource, NodeTree, TreeEditor};
pub use node::{PropertyValue, SourceNode};

/// Read-only access to the persisted configuration tree.
pub trait ConfigurationSource: Send + Sync + fmt::Debug {
    /// Read a single node. `Ok(None)` when the path does not exist.
    fn node(&self, path: &str) -> SourceResult<Option<SourceNode>>;

    /// Read the direct children of a node in stored order.
    fn child_nodes(&self, node_path: &str) -> SourceResult<Vec<SourceNode>> {
        let Some(node) = self.node(node_path)? else {
            return Ok(Vec::new());
        };
        let mut children = Vec::with_capacity(node.children.len());
        for name in &node.children {
            if let Some(child) = self.node(&path::join(node_path, name))? {
                children.push(child);
            }
        }
        Ok(children)
    }

    fn exists(&self, node_path: &str) -> SourceResult<bool> {
        Ok(self.node(node_path)?.is_some())
    }

    /// Pre-order walk of a subtree, root included.
    fn subtree(&self, node_path: &str) -> SourceResult<Vec<SourceNode>> {
        let mut out = Vec::new();
        let mut stack = match self.node(node_path)? {
            Some(node) => vec![node],
            None => return Ok(out),
        };
        while let Some(node) = stack.pop() {
            let children = self.child_nodes(&node.path)?;
            out.push(node);
            stack.extend(children.into_iter().rev());
        }
        Ok(out)
    }
}

/// Absolute paths touched by one committed change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    pub paths: Vec<String>,
}

impl ChangeBatch {
    pub fn new(paths: impl IntoIterator<Item = String>) -> Self {
        let unique: BTreeSet<String> = paths.into_iter().collect();
        Self {
            paths: unique.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtree_is_pre_order() {
        let source = InMemorySource::from_toml_str(
            r#"
            [a.b.c]
            [a.d]
            "#,
        )
        .unwrap();

        let paths: Vec<String> = source.subtree("/a").unwrap().into_iter().map(|n| n.path).collect();
        assert_eq!(paths, vec!["/a", "/a/b", "/a/b/c", "/a/d"]);
        assert!(source.subtree("/missing").unwrap().is_empty());
    }

    #[test]
    fn test_change_batch_dedup() {
        let batch = ChangeBatch::new(vec!["/b".to_string(), "/a".to_string(), "/b".to_string()]);
        assert_eq!(batch.paths, vec!["/a", "/b"]);
    }
}
