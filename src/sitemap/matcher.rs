//! Sitemap path matching and placeholder resolution.
//!
//! # Responsibilities
//! - Descend the sitemap segment by segment
//! - Prefer literal > suffix wildcard > wildcard > any-remainder at each level
//! - Capture wildcard values left to right along the successful branch
//! - Substitute `${n}` placeholders with captured values
//!
//! # Design Decisions
//! - Backtracking: a literal branch that dead-ends deeper falls back to the
//!   wildcard siblings of the same level
//! - A value that is exactly one placeholder without a captured group is
//!   dropped; a placeholder embedded in longer text becomes empty

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use crate::composer::chain::Section;
use crate::composer::key::LoadedRoot;
use crate::sitemap::item::{SegmentMatcher, SiteMapItem};
use crate::source::{layout, SourceNode};

/// A matched item with its captured wildcard values.
#[derive(Debug, Clone)]
pub struct SiteMapMatch {
    pub item: Arc<SiteMapItem>,
    pub captures: Vec<String>,
}

/// The composed sitemap of one configuration root.
#[derive(Debug, Default, Serialize)]
pub struct SiteMap {
    items: Vec<Arc<SiteMapItem>>,
    #[serde(skip)]
    by_id: HashMap<String, Arc<SiteMapItem>>,
}

impl SiteMap {
    /// Build from the first definition per top-level item name.
    pub fn build(loaded: &LoadedRoot) -> Self {
        let children_of = |node: &SourceNode| loaded.children(node);
        let mut items: Vec<Arc<SiteMapItem>> = loaded
            .top_level(Section::SiteMap)
            .into_iter()
            .filter(|(node, _)| node.is_type(layout::NT_SITEMAP_ITEM))
            .map(|(node, _)| {
                Arc::new(SiteMapItem::build(
                    node,
                    None,
                    &BTreeMap::new(),
                    loaded.root_path(),
                    &children_of,
                ))
            })
            .collect();
        items.sort_by_key(|i| i.matcher.rank());

        let mut by_id = HashMap::new();
        let mut stack: Vec<Arc<SiteMapItem>> = items.clone();
        while let Some(item) = stack.pop() {
            stack.extend(item.children.iter().cloned());
            by_id.insert(item.id.clone(), item);
        }

        Self { items, by_id }
    }

    pub fn items(&self) -> &[Arc<SiteMapItem>] {
        &self.items
    }

    pub fn item_by_id(&self, id: &str) -> Option<&Arc<SiteMapItem>> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Match a mount-relative path. `None` for an empty path or no match.
    pub fn match_path(&self, path: &str) -> Option<SiteMapMatch> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return None;
        }
        let mut captures = Vec::new();
        let item = match_level(&self.items, &segments, &mut captures)?;
        Some(SiteMapMatch { item, captures })
    }
}

fn match_level(
    items: &[Arc<SiteMapItem>],
    segments: &[&str],
    captures: &mut Vec<String>,
) -> Option<Arc<SiteMapItem>> {
    let (head, rest) = segments.split_first()?;

    // Items are sorted by rank, so this walks literal matches first.
    for item in items {
        let captured = match &item.matcher {
            SegmentMatcher::Literal(value) if value == head => None,
            SegmentMatcher::Literal(_) => continue,
            SegmentMatcher::WildcardWithSuffix(suffix) => {
                match head.strip_suffix(suffix.as_str()).filter(|s| !s.is_empty()) {
                    Some(stem) => Some(stem.to_string()),
                    None => continue,
                }
            }
            SegmentMatcher::Wildcard => Some(head.to_string()),
            SegmentMatcher::Any => {
                captures.push(segments.join("/"));
                return Some(item.clone());
            }
        };

        let pushed = captured.is_some();
        if let Some(value) = captured {
            captures.push(value);
        }
        if rest.is_empty() {
            return Some(item.clone());
        }
        if let Some(found) = match_level(&item.children, rest, captures) {
            return Some(found);
        }
        if pushed {
            captures.pop();
        }
    }
    None
}

/// Substitute `${n}` placeholders (1-based) with captured values.
///
/// Returns `None` when `value` is exactly one placeholder whose group was not
/// captured.
pub fn resolve_placeholders(value: &str, captures: &[String]) -> Option<String> {
    if let Some(index) = sole_placeholder(value) {
        return captures.get(index.checked_sub(1)?).cloned();
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let token = &after[..end];
                match token.parse::<usize>() {
                    Ok(n) if n >= 1 => {
                        if let Some(captured) = captures.get(n - 1) {
                            out.push_str(captured);
                        }
                    }
                    // Not a group reference; keep it literally.
                    _ => {
                        out.push_str("${");
                        out.push_str(token);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    Some(out)
}

/// Resolve every value of a map, dropping values that resolve to nothing.
pub fn resolve_map(raw: &BTreeMap<String, String>, captures: &[String]) -> BTreeMap<String, String> {
    raw.iter()
        .filter_map(|(k, v)| resolve_placeholders(v, captures).map(|r| (k.clone(), r)))
        .collect()
}

fn sole_placeholder(value: &str) -> Option<usize> {
    value.strip_prefix("${")?.strip_suffix('}')?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySource;

    const ROOT: &str = "/hst:hst/hst:configurations/demo";

    fn sitemap(doc: &str) -> SiteMap {
        let source = InMemorySource::from_toml_str(doc).unwrap();
        SiteMap::build(&LoadedRoot::load(&source, ROOT).unwrap())
    }

    const DOC: &str = r#"
        ["hst:hst"."hst:configurations".demo."hst:sitemap".news]
        "jcr:primaryType" = "hst:sitemapitem"
        "hst:relativecontentpath" = "News"
        ["hst:hst"."hst:configurations".demo."hst:sitemap".news._default_]
        "jcr:primaryType" = "hst:sitemapitem"
        "hst:relativecontentpath" = "News/${1}"
        ["hst:hst"."hst:configurations".demo."hst:sitemap".news._default_.archive]
        "jcr:primaryType" = "hst:sitemapitem"
        ["hst:hst"."hst:configurations".demo."hst:sitemap".news.latest]
        "jcr:primaryType" = "hst:sitemapitem"
        ["hst:hst"."hst:configurations".demo."hst:sitemap".news.latest.page]
        "jcr:primaryType" = "hst:sitemapitem"
        ["hst:hst"."hst:configurations".demo."hst:sitemap".docs._any_]
        "jcr:primaryType" = "hst:sitemapitem"
        ["hst:hst"."hst:configurations".demo."hst:sitemap".docs]
        "jcr:primaryType" = "hst:sitemapitem"
        ["hst:hst"."hst:configurations".demo."hst:sitemap".files."_default_.pdf"]
        "jcr:primaryType" = "hst:sitemapitem"
        ["hst:hst"."hst:configurations".demo."hst:sitemap".files]
        "jcr:primaryType" = "hst:sitemapitem"
    "#;

    #[test]
    fn test_wildcard_capture() {
        let map = sitemap(DOC);
        let m = map.match_path("/news/2009").unwrap();
        assert_eq!(m.item.id(), "news/_default_");
        assert_eq!(m.captures, vec!["2009"]);
        assert_eq!(
            resolve_placeholders(m.item.relative_content_path().unwrap(), &m.captures).as_deref(),
            Some("News/2009")
        );
    }

    #[test]
    fn test_literal_preferred_and_backtracking() {
        let map = sitemap(DOC);
        assert_eq!(map.match_path("news/latest").unwrap().item.id(), "news/latest");
        assert_eq!(map.match_path("news/latest/page").unwrap().item.id(), "news/latest/page");

        // `latest/archive` dead-ends on the literal branch and falls back.
        let m = map.match_path("news/latest/archive").unwrap();
        assert_eq!(m.item.id(), "news/_default_/archive");
        assert_eq!(m.captures, vec!["latest"]);
    }

    #[test]
    fn test_any_and_suffix_matchers() {
        let map = sitemap(DOC);
        let m = map.match_path("docs/a/b/c").unwrap();
        assert_eq!(m.item.id(), "docs/_any_");
        assert_eq!(m.captures, vec!["a/b/c"]);

        let m = map.match_path("files/report.pdf").unwrap();
        assert_eq!(m.captures, vec!["report"]);
        assert!(map.match_path("files/report.doc").is_none());
        assert!(map.match_path("unknown").is_none());
        assert!(map.match_path("/").is_none());
    }

    #[test]
    fn test_placeholder_resolution_rules() {
        let captures = vec!["a".to_string()];
        assert_eq!(resolve_placeholders("${1}", &captures).as_deref(), Some("a"));
        assert_eq!(resolve_placeholders("${2}", &captures), None);
        assert_eq!(resolve_placeholders("x/${2}/y", &captures).as_deref(), Some("x//y"));
        assert_eq!(resolve_placeholders("${name}", &captures).as_deref(), Some("${name}"));
        assert_eq!(resolve_placeholders("plain", &captures).as_deref(), Some("plain"));

        let raw: BTreeMap<String, String> =
            [("a".to_string(), "${1}".to_string()), ("b".to_string(), "${3}".to_string())].into();
        let resolved = resolve_map(&raw, &captures);
        assert_eq!(resolved.get("a").map(String::as_str), Some("a"));
        assert!(!resolved.contains_key("b"));
    }

    #[test]
    fn test_item_lookup_by_id() {
        let map = sitemap(DOC);
        assert!(map.item_by_id("news/latest/page").is_some());
        assert_eq!(map.len(), 9);
    }
}
