//! Composed component configuration nodes.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::source::{layout, SourceNode};

/// Kind of a component node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentType {
    /// Top-level node of the pages section.
    Page,
    /// Any other plain component.
    Component,
    ContainerComponent,
    ContainerItemComponent,
    ContainerComponentReference,
}

impl ComponentType {
    /// Classify a stored node. `None` for nodes that are not components.
    pub fn of(node: &SourceNode, top_level_page: bool) -> Option<Self> {
        match node.primary_type.as_str() {
            layout::NT_COMPONENT if top_level_page => Some(ComponentType::Page),
            layout::NT_COMPONENT => Some(ComponentType::Component),
            layout::NT_CONTAINER => Some(ComponentType::ContainerComponent),
            layout::NT_CONTAINER_ITEM => Some(ComponentType::ContainerItemComponent),
            layout::NT_CONTAINER_REFERENCE => Some(ComponentType::ContainerComponentReference),
            _ => None,
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, ComponentType::ContainerComponent)
    }
}

/// One node of a composed component tree. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentConfiguration {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) canonical_stored_location: String,
    pub(crate) canonical_identifier: String,
    pub(crate) component_type: ComponentType,
    pub(crate) inherited: bool,
    pub(crate) component_class_name: Option<String>,
    pub(crate) template: Option<String>,
    pub(crate) render_path: Option<String>,
    pub(crate) xtype: Option<String>,
    pub(crate) label: Option<String>,
    /// Container path a reference was resolved to.
    pub(crate) referenced_container: Option<String>,
    pub(crate) parameters: BTreeMap<String, String>,
    pub(crate) children: Vec<Arc<ComponentConfiguration>>,
}

impl ComponentConfiguration {
    /// Path-like id, e.g. `hst:pages/home/main/banner`.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute path of the node this configuration originates from.
    pub fn canonical_stored_location(&self) -> &str {
        &self.canonical_stored_location
    }

    /// Identifier of the node this configuration originates from.
    pub fn canonical_identifier(&self) -> &str {
        &self.canonical_identifier
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    pub fn is_inherited(&self) -> bool {
        self.inherited
    }

    pub fn component_class_name(&self) -> Option<&str> {
        self.component_class_name.as_deref()
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn render_path(&self) -> Option<&str> {
        self.render_path.as_deref()
    }

    pub fn xtype(&self) -> Option<&str> {
        self.xtype.as_deref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn referenced_container(&self) -> Option<&str> {
        self.referenced_container.as_deref()
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    pub fn children(&self) -> &[Arc<ComponentConfiguration>] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&Arc<ComponentConfiguration>> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Find a descendant by its path relative to this node (`main/banner`).
    pub fn descendant(&self, relative: &str) -> Option<&ComponentConfiguration> {
        let mut current = self;
        for segment in relative.split('/').filter(|s| !s.is_empty()) {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// This node and all descendants in pre-order.
    pub fn flatten(&self) -> Vec<&ComponentConfiguration> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.flatten());
        }
        out
    }

    /// Copy of this subtree with ids rooted at `id`.
    pub(crate) fn rebased(&self, id: &str) -> ComponentConfiguration {
        let mut copy = self.clone();
        copy.id = id.to_string();
        copy.children = self
            .children
            .iter()
            .map(|c| Arc::new(c.rebased(&format!("{}/{}", id, c.name))))
            .collect();
        copy
    }

    /// Merge a referenced base component under this one.
    ///
    /// Own values win; base children not present by name are appended, and
    /// same-named children are merged recursively.
    pub(crate) fn merged_with(mut self, base: &ComponentConfiguration) -> ComponentConfiguration {
        let mut parameters = base.parameters.clone();
        parameters.extend(std::mem::take(&mut self.parameters));
        self.parameters = parameters;

        if self.component_class_name.is_none() {
            self.component_class_name = base.component_class_name.clone();
        }
        if self.template.is_none() {
            self.template = base.template.clone();
            self.render_path = base.render_path.clone();
        }
        if self.xtype.is_none() {
            self.xtype = base.xtype.clone();
        }
        if self.label.is_none() {
            self.label = base.label.clone();
        }

        let mut children: Vec<Arc<ComponentConfiguration>> = Vec::with_capacity(self.children.len());
        for own in &self.children {
            match base.child(&own.name) {
                Some(base_child) => children.push(Arc::new(own.as_ref().clone().merged_with(base_child))),
                None => children.push(own.clone()),
            }
        }
        for base_child in &base.children {
            if self.child(&base_child.name).is_none() {
                children.push(Arc::new(base_child.rebased(&format!("{}/{}", self.id, base_child.name))));
            }
        }
        self.children = children;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, params: &[(&str, &str)], children: Vec<ComponentConfiguration>) -> ComponentConfiguration {
        ComponentConfiguration {
            id: id.to_string(),
            name: id.rsplit('/').next().unwrap().to_string(),
            canonical_stored_location: format!("/store/{}", id),
            canonical_identifier: id.to_string(),
            component_type: ComponentType::Component,
            inherited: false,
            component_class_name: None,
            template: None,
            render_path: None,
            xtype: None,
            label: None,
            referenced_container: None,
            parameters: params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            children: children.into_iter().map(Arc::new).collect(),
        }
    }

    #[test]
    fn test_merge_own_wins_and_base_children_appended() {
        let base = node(
            "hst:pages/base",
            &[("a", "base"), ("b", "base")],
            vec![node("hst:pages/base/header", &[], vec![]), node("hst:pages/base/main", &[("x", "1")], vec![])],
        );
        let own = node(
            "hst:pages/home",
            &[("a", "own")],
            vec![node("hst:pages/home/main", &[("y", "2")], vec![])],
        );

        let merged = own.merged_with(&base);
        assert_eq!(merged.parameter("a"), Some("own"));
        assert_eq!(merged.parameter("b"), Some("base"));
        let names: Vec<&str> = merged.children().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["main", "header"]);
        assert_eq!(merged.child("header").unwrap().id(), "hst:pages/home/header");

        let main = merged.child("main").unwrap();
        assert_eq!(main.parameter("x"), Some("1"));
        assert_eq!(main.parameter("y"), Some("2"));
    }

    #[test]
    fn test_descendant_lookup() {
        let tree = node(
            "hst:pages/home",
            &[],
            vec![node("hst:pages/home/main", &[], vec![node("hst:pages/home/main/banner", &[], vec![])])],
        );
        assert_eq!(tree.descendant("main/banner").unwrap().id(), "hst:pages/home/main/banner");
        assert!(tree.descendant("main/missing").is_none());
        assert_eq!(tree.flatten().len(), 3);
    }
}
