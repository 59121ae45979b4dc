//! Absolute path helpers for the configuration tree.
//!
//! Paths are `/`-separated, absolute, and never end with a slash (except the
//! root path `/` itself).

/// Join a child name onto a parent path.
pub fn join(parent: &str, name: &str) -> String {
    if parent == "/" || parent.is_empty() {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// The parent of `path`, or `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path == "/" || path.is_empty() {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Last segment of `path`.
pub fn name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Non-empty segments of a path.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// True when `path` equals `ancestor` or lies below it.
pub fn is_same_or_descendant(path: &str, ancestor: &str) -> bool {
    if ancestor == "/" {
        return true;
    }
    path == ancestor
        || (path.len() > ancestor.len()
            && path.starts_with(ancestor)
            && path.as_bytes()[ancestor.len()] == b'/')
}

/// True when one path contains the other.
pub fn overlaps(a: &str, b: &str) -> bool {
    is_same_or_descendant(a, b) || is_same_or_descendant(b, a)
}

/// Resolve `relative` against `base`, honouring `.` and `..` segments.
///
/// Absolute input is normalised and returned as-is. Returns `None` when the
/// relative path climbs above the root.
pub fn resolve(base: &str, relative: &str) -> Option<String> {
    let mut stack: Vec<&str> = if relative.starts_with('/') {
        Vec::new()
    } else {
        segments(base).collect()
    };

    for segment in segments(relative) {
        match segment {
            "." => {}
            ".." => {
                stack.pop()?;
            }
            other => stack.push(other),
        }
    }

    if stack.is_empty() {
        Some("/".to_string())
    } else {
        Some(format!("/{}", stack.join("/")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_and_parent() {
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a", "b"), "/a/b");
        assert_eq!(parent("/a/b"), Some("/a"));
        assert_eq!(parent("/a"), Some("/"));
        assert_eq!(parent("/"), None);
        assert_eq!(name("/a/b"), "b");
    }

    #[test]
    fn test_descendant_checks() {
        assert!(is_same_or_descendant("/a/b", "/a"));
        assert!(is_same_or_descendant("/a", "/a"));
        assert!(!is_same_or_descendant("/ab", "/a"));
        assert!(overlaps("/a", "/a/b/c"));
        assert!(!overlaps("/a/b", "/a/c"));
    }

    #[test]
    fn test_resolve_relative() {
        let base = "/hst:hst/hst:configurations/project";
        assert_eq!(
            resolve(base, "../common").as_deref(),
            Some("/hst:hst/hst:configurations/common")
        );
        assert_eq!(
            resolve(base, "../common/hst:workspace").as_deref(),
            Some("/hst:hst/hst:configurations/common/hst:workspace")
        );
        assert_eq!(resolve(base, "/x/./y").as_deref(), Some("/x/y"));
        assert_eq!(resolve("/", ".."), None);
    }
}
