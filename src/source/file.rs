//! Configuration tree loading from disk.

use std::fs;
use std::path::Path;

use crate::error::{SourceError, SourceResult};
use crate::source::memory::{InMemorySource, NodeTree};

/// Load a configuration tree from a TOML document on disk.
pub fn load_tree(path: &Path) -> SourceResult<NodeTree> {
    let content = fs::read_to_string(path).map_err(|e| {
        SourceError::Unavailable(format!("cannot read '{}': {}", path.display(), e))
    })?;
    let tree = NodeTree::from_toml_str(&content)?;

    tracing::debug!(path = %path.display(), nodes = tree.len(), "Configuration tree loaded");
    Ok(tree)
}

/// Build an [`InMemorySource`] seeded from a file.
pub fn load_source(path: &Path) -> SourceResult<InMemorySource> {
    Ok(InMemorySource::new(load_tree(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ConfigurationSource;
    use std::io::Write;

    #[test]
    fn test_load_source_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[\"hst:hst\".\"hst:hosts\"]\n\"hst:defaulthostname\" = \"localhost\"").unwrap();

        let source = load_source(file.path()).unwrap();
        let hosts = source.node("/hst:hst/hst:hosts").unwrap().unwrap();
        assert_eq!(hosts.string("hst:defaulthostname"), Some("localhost"));
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let err = load_tree(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
    }
}
