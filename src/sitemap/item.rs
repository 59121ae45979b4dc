//! Sitemap item tree.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::source::{layout, path, SourceNode};

/// How a sitemap item's name matches one path segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SegmentMatcher {
    Literal(String),
    /// `_default_.html`: any segment ending with the suffix.
    WildcardWithSuffix(String),
    /// `_default_` or `*`: any single segment.
    Wildcard,
    /// `_any_` or `**`: the whole remainder of the path.
    Any,
}

impl SegmentMatcher {
    pub fn parse(name: &str) -> Self {
        if name == layout::WILDCARD || name == "*" {
            return SegmentMatcher::Wildcard;
        }
        if name == layout::ANY || name == "**" {
            return SegmentMatcher::Any;
        }
        if let Some(suffix) = name
            .strip_prefix(layout::WILDCARD)
            .or_else(|| name.strip_prefix('*'))
            .filter(|s| s.starts_with('.'))
        {
            return SegmentMatcher::WildcardWithSuffix(suffix.to_string());
        }
        SegmentMatcher::Literal(name.to_string())
    }

    /// Match preference; lower is tried first.
    pub fn rank(&self) -> u8 {
        match self {
            SegmentMatcher::Literal(_) => 0,
            SegmentMatcher::WildcardWithSuffix(_) => 1,
            SegmentMatcher::Wildcard => 2,
            SegmentMatcher::Any => 3,
        }
    }
}

/// One node of the sitemap. Immutable once built.
#[derive(Debug, Serialize)]
pub struct SiteMapItem {
    pub(crate) id: String,
    pub(crate) value: String,
    pub(crate) matcher: SegmentMatcher,
    pub(crate) canonical_stored_location: String,
    pub(crate) canonical_identifier: String,
    pub(crate) inherited: bool,
    pub(crate) relative_content_path: Option<String>,
    pub(crate) component_configuration_id: Option<String>,
    pub(crate) named_pipeline: Option<String>,
    pub(crate) locale: Option<String>,
    /// Own parameters merged over the ancestors' (closest wins). Unresolved.
    pub(crate) parameters: BTreeMap<String, String>,
    pub(crate) local_parameters: BTreeMap<String, String>,
    pub(crate) handler_ids: Vec<String>,
    pub(crate) children: Vec<Arc<SiteMapItem>>,
}

impl SiteMapItem {
    /// Build an item subtree from loaded nodes.
    pub(crate) fn build<'n>(
        node: &'n SourceNode,
        parent_id: Option<&str>,
        inherited_parameters: &BTreeMap<String, String>,
        root_path: &str,
        children_of: &dyn Fn(&'n SourceNode) -> Vec<&'n SourceNode>,
    ) -> SiteMapItem {
        let id = match parent_id {
            Some(parent) => format!("{}/{}", parent, node.name),
            None => node.name.clone(),
        };
        let local_parameters = node.parameters(layout::PARAMETER_NAMES, layout::PARAMETER_VALUES);
        let mut parameters = inherited_parameters.clone();
        parameters.extend(local_parameters.clone());

        let mut children: Vec<Arc<SiteMapItem>> = children_of(node)
            .into_iter()
            .filter(|c| c.is_type(layout::NT_SITEMAP_ITEM))
            .map(|c| Arc::new(SiteMapItem::build(c, Some(&id), &parameters, root_path, children_of)))
            .collect();
        // Stable sort keeps stored order within one rank.
        children.sort_by_key(|c| c.matcher.rank());

        SiteMapItem {
            matcher: SegmentMatcher::parse(&node.name),
            value: node.name.clone(),
            canonical_stored_location: node.path.clone(),
            canonical_identifier: node.identifier.clone(),
            inherited: !path::is_same_or_descendant(&node.path, root_path),
            relative_content_path: node.non_empty(layout::RELATIVE_CONTENT_PATH).map(str::to_string),
            component_configuration_id: node.non_empty(layout::COMPONENT_CONFIGURATION_ID).map(str::to_string),
            named_pipeline: node.non_empty(layout::NAMED_PIPELINE).map(str::to_string),
            locale: node.non_empty(layout::LOCALE).map(str::to_string),
            handler_ids: node.strings(layout::SITEMAP_ITEM_HANDLER_IDS),
            parameters,
            local_parameters,
            children,
            id,
        }
    }

    /// Path-like id, e.g. `news/_default_`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The stored segment name.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn matcher(&self) -> &SegmentMatcher {
        &self.matcher
    }

    pub fn canonical_stored_location(&self) -> &str {
        &self.canonical_stored_location
    }

    pub fn canonical_identifier(&self) -> &str {
        &self.canonical_identifier
    }

    pub fn is_inherited(&self) -> bool {
        self.inherited
    }

    /// Template with `${n}` placeholders.
    pub fn relative_content_path(&self) -> Option<&str> {
        self.relative_content_path.as_deref()
    }

    pub fn component_configuration_id(&self) -> Option<&str> {
        self.component_configuration_id.as_deref()
    }

    pub fn named_pipeline(&self) -> Option<&str> {
        self.named_pipeline.as_deref()
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Parameters including inherited ones, placeholders unresolved.
    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn local_parameters(&self) -> &BTreeMap<String, String> {
        &self.local_parameters
    }

    pub fn handler_ids(&self) -> &[String] {
        &self.handler_ids
    }

    pub fn children(&self) -> &[Arc<SiteMapItem>] {
        &self.children
    }

    pub fn child(&self, value: &str) -> Option<&Arc<SiteMapItem>> {
        self.children.iter().find(|c| c.value == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_matcher_parse() {
        assert_eq!(SegmentMatcher::parse("news"), SegmentMatcher::Literal("news".into()));
        assert_eq!(SegmentMatcher::parse("_default_"), SegmentMatcher::Wildcard);
        assert_eq!(SegmentMatcher::parse("*"), SegmentMatcher::Wildcard);
        assert_eq!(SegmentMatcher::parse("_any_"), SegmentMatcher::Any);
        assert_eq!(
            SegmentMatcher::parse("_default_.html"),
            SegmentMatcher::WildcardWithSuffix(".html".into())
        );
        assert_eq!(
            SegmentMatcher::parse("_default_x"),
            SegmentMatcher::Literal("_default_x".into())
        );
    }
}
