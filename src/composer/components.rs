//! Composition of a root's pages, components, templates and catalog.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::composer::chain::Section;
use crate::composer::component::{ComponentConfiguration, ComponentType};
use crate::composer::key::{ConfigurationKey, LoadedRoot};
use crate::error::{BuildResult, ConfigurationError};
use crate::source::{layout, path, SourceNode};

/// A template a component can render with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    pub name: String,
    pub render_path: Option<String>,
    pub canonical_stored_location: String,
    pub inherited: bool,
}

/// The composed, immutable component bundle of one configuration root.
#[derive(Debug, Serialize)]
pub struct ComponentsConfiguration {
    key: ConfigurationKey,
    /// Top-level components by id (`hst:pages/home`, `hst:components/header`).
    components: BTreeMap<String, Arc<ComponentConfiguration>>,
    templates: BTreeMap<String, Template>,
    /// Catalog item packages by name.
    catalog: BTreeMap<String, Vec<Arc<ComponentConfiguration>>>,
}

impl ComponentsConfiguration {
    /// Compose the bundle for a loaded root.
    pub fn compose(loaded: &LoadedRoot) -> BuildResult<Self> {
        validate_constraints(loaded)?;

        let templates = collect_templates(loaded);
        let mut composer = Composer::new(loaded, &templates);

        let mut ids = Vec::new();
        for section in [Section::Pages, Section::Components] {
            for (node, _) in loaded.top_level(section) {
                let id = format!("{}/{}", section.node_name(), node.name);
                composer.definitions.insert(id.clone(), (node, section == Section::Pages));
                ids.push(id);
            }
        }

        let mut components = BTreeMap::new();
        for id in ids {
            if let Some(built) = composer.top_level(&id)? {
                components.insert(id, built);
            }
        }

        let catalog = composer.catalog()?;

        tracing::debug!(
            root = %loaded.root_path(),
            components = components.len(),
            templates = templates.len(),
            "Components configuration composed"
        );

        Ok(Self {
            key: loaded.components_key(),
            components,
            templates,
            catalog,
        })
    }

    pub fn key(&self) -> &ConfigurationKey {
        &self.key
    }

    pub fn root_path(&self) -> &str {
        &self.key.root_path
    }

    /// Top-level component by id, e.g. `hst:pages/home`.
    pub fn component_configuration(&self, id: &str) -> Option<&Arc<ComponentConfiguration>> {
        self.components.get(id)
    }

    /// Any component by full id, e.g. `hst:pages/home/main/banner`.
    pub fn find(&self, id: &str) -> Option<&ComponentConfiguration> {
        let mut segments = id.splitn(3, '/');
        let top = format!("{}/{}", segments.next()?, segments.next()?);
        let component = self.components.get(&top)?;
        match segments.next() {
            Some(rest) => component.descendant(rest),
            None => Some(component.as_ref()),
        }
    }

    pub fn component_configurations(&self) -> impl Iterator<Item = &Arc<ComponentConfiguration>> {
        self.components.values()
    }

    pub fn pages(&self) -> impl Iterator<Item = &Arc<ComponentConfiguration>> {
        self.components
            .values()
            .filter(|c| c.component_type() == ComponentType::Page)
    }

    pub fn templates(&self) -> &BTreeMap<String, Template> {
        &self.templates
    }

    pub fn catalog(&self) -> &BTreeMap<String, Vec<Arc<ComponentConfiguration>>> {
        &self.catalog
    }
}

/// Containers may not name a reference component; references must.
fn validate_constraints(loaded: &LoadedRoot) -> BuildResult<()> {
    for node in loaded.nodes_of(Section::is_component_section) {
        let has_reference = node.non_empty(layout::REFERENCE_COMPONENT).is_some();
        if node.is_type(layout::NT_CONTAINER) && node.has_property(layout::REFERENCE_COMPONENT) {
            return Err(ConfigurationError::ContainerWithReference(node.path.clone()).into());
        }
        if node.is_type(layout::NT_CONTAINER_REFERENCE) && !has_reference {
            return Err(ConfigurationError::MissingReference(node.path.clone()).into());
        }
    }
    Ok(())
}

fn collect_templates(loaded: &LoadedRoot) -> BTreeMap<String, Template> {
    loaded
        .top_level(Section::Templates)
        .into_iter()
        .map(|(node, _)| {
            let template = Template {
                name: node.name.clone(),
                render_path: node.non_empty(layout::RENDER_PATH).map(str::to_string),
                canonical_stored_location: node.path.clone(),
                inherited: !path::is_same_or_descendant(&node.path, loaded.root_path()),
            };
            (node.name.clone(), template)
        })
        .collect()
}

struct Composer<'a> {
    loaded: &'a LoadedRoot,
    templates: &'a BTreeMap<String, Template>,
    /// Referenceable containers by path relative to `hst:containers`.
    containers: HashMap<String, &'a SourceNode>,
    /// Top-level definitions by id, with their "is page" flag.
    definitions: HashMap<String, (&'a SourceNode, bool)>,
    built: HashMap<String, Option<Arc<ComponentConfiguration>>>,
    visiting: HashSet<String>,
}

impl<'a> Composer<'a> {
    fn new(loaded: &'a LoadedRoot, templates: &'a BTreeMap<String, Template>) -> Self {
        let mut containers = HashMap::new();
        for section in loaded.sections_of(Section::Containers) {
            let Some(root) = loaded.contributor(section.contributor).containers_root() else {
                continue;
            };
            for node_path in &section.node_paths {
                let Some(node) = loaded.node(node_path) else {
                    continue;
                };
                if !node.is_type(layout::NT_CONTAINER) {
                    continue;
                }
                if let Some(relative) = node_path.strip_prefix(&root).map(|r| r.trim_start_matches('/')) {
                    containers.entry(relative.to_string()).or_insert(node);
                }
            }
        }

        Self {
            loaded,
            templates,
            containers,
            definitions: HashMap::new(),
            built: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    /// Build (once) the top-level component `id`.
    fn top_level(&mut self, id: &str) -> BuildResult<Option<Arc<ComponentConfiguration>>> {
        if let Some(done) = self.built.get(id) {
            return Ok(done.clone());
        }
        let Some(&(node, is_page)) = self.definitions.get(id) else {
            return Ok(None);
        };
        if !self.visiting.insert(id.to_string()) {
            return Err(ConfigurationError::ReferenceCycle(node.path.clone()).into());
        }

        let result = self.build(node, id, is_page);
        self.visiting.remove(id);
        let built = result?.map(Arc::new);
        self.built.insert(id.to_string(), built.clone());
        Ok(built)
    }

    fn build(&mut self, node: &'a SourceNode, id: &str, is_page: bool) -> BuildResult<Option<ComponentConfiguration>> {
        let Some(component_type) = ComponentType::of(node, is_page) else {
            return Ok(None);
        };

        if component_type == ComponentType::ContainerComponentReference {
            return self.splice_reference(node, id);
        }

        let mut children = Vec::new();
        for child in self.loaded.children(node) {
            let child_id = format!("{}/{}", id, child.name);
            if let Some(built) = self.build(child, &child_id, false)? {
                children.push(Arc::new(built));
            }
        }

        let mut component = self.plain(node, id, component_type, children);

        if let Some(reference) = node.non_empty(layout::REFERENCE_COMPONENT) {
            let base_id = reference.to_string();
            match self.top_level(&base_id)? {
                Some(base) => component = component.merged_with(&base),
                None => tracing::warn!(
                    component = %node.path,
                    reference = %base_id,
                    "Referenced component not found, using component as-is"
                ),
            }
        }
        Ok(Some(component))
    }

    /// Replace a container reference by the referenced container, keeping the
    /// reference node's name. Unresolvable references are dropped.
    fn splice_reference(&mut self, node: &'a SourceNode, id: &str) -> BuildResult<Option<ComponentConfiguration>> {
        let reference = node
            .non_empty(layout::REFERENCE_COMPONENT)
            .ok_or_else(|| ConfigurationError::MissingReference(node.path.clone()))?;

        let Some(&container) = self.containers.get(reference.trim_matches('/')) else {
            tracing::warn!(
                reference = %node.path,
                target = %reference,
                "Container reference cannot be resolved, dropping it"
            );
            return Ok(None);
        };

        let mut children = Vec::new();
        for child in self.loaded.children(container) {
            let child_id = format!("{}/{}", id, child.name);
            if let Some(built) = self.build(child, &child_id, false)? {
                children.push(Arc::new(built));
            }
        }

        let mut spliced = self.plain(container, id, ComponentType::ContainerComponent, children);
        spliced.name = node.name.clone();
        spliced.referenced_container = Some(reference.to_string());
        Ok(Some(spliced))
    }

    fn plain(
        &self,
        node: &SourceNode,
        id: &str,
        component_type: ComponentType,
        children: Vec<Arc<ComponentConfiguration>>,
    ) -> ComponentConfiguration {
        let template = node.non_empty(layout::TEMPLATE).map(str::to_string);
        let render_path = template
            .as_ref()
            .and_then(|t| self.templates.get(t))
            .and_then(|t| t.render_path.clone());

        ComponentConfiguration {
            id: id.to_string(),
            name: node.name.clone(),
            canonical_stored_location: node.path.clone(),
            canonical_identifier: node.identifier.clone(),
            component_type,
            inherited: !path::is_same_or_descendant(&node.path, self.loaded.root_path()),
            component_class_name: node.non_empty(layout::COMPONENT_CLASS_NAME).map(str::to_string),
            template,
            render_path,
            xtype: node.non_empty(layout::XTYPE).map(str::to_string),
            label: node.non_empty(layout::LABEL).map(str::to_string),
            referenced_container: None,
            parameters: node.parameters(layout::PARAMETER_NAMES, layout::PARAMETER_VALUES),
            children,
        }
    }

    /// Catalog packages, first definition per package name.
    fn catalog(&mut self) -> BuildResult<BTreeMap<String, Vec<Arc<ComponentConfiguration>>>> {
        let mut catalog = BTreeMap::new();
        for (package, _) in self.loaded.top_level(Section::Catalog) {
            let mut items = Vec::new();
            for item in self.loaded.children(package) {
                let id = format!("{}/{}/{}", layout::CATALOG, package.name, item.name);
                if let Some(built) = self.build(item, &id, false)? {
                    items.push(Arc::new(built));
                }
            }
            catalog.insert(package.name.clone(), items);
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use crate::source::InMemorySource;

    const ROOT: &str = "/hst:hst/hst:configurations/demo";

    fn compose(doc: &str) -> BuildResult<ComponentsConfiguration> {
        let source = InMemorySource::from_toml_str(doc).unwrap();
        let loaded = LoadedRoot::load(&source, ROOT)?;
        ComponentsConfiguration::compose(&loaded)
    }

    #[test]
    fn test_reference_component_inheritance() {
        let config = compose(
            r#"
            ["hst:hst"."hst:configurations".demo."hst:pages".base]
            "jcr:primaryType" = "hst:component"
            "hst:template" = "layout"
            ["hst:hst"."hst:configurations".demo."hst:pages".base.header]
            "jcr:primaryType" = "hst:component"
            ["hst:hst"."hst:configurations".demo."hst:pages".home]
            "jcr:primaryType" = "hst:component"
            "hst:referencecomponent" = "hst:pages/base"
            ["hst:hst"."hst:configurations".demo."hst:templates".layout]
            "jcr:primaryType" = "hst:template"
            "hst:renderpath" = "webfile:/layout.ftl"
            "#,
        )
        .unwrap();

        let home = config.component_configuration("hst:pages/home").unwrap();
        assert_eq!(home.component_type(), ComponentType::Page);
        assert_eq!(home.render_path(), Some("webfile:/layout.ftl"));
        assert!(config.find("hst:pages/home/header").is_some());
        assert_eq!(config.pages().count(), 2);
    }

    #[test]
    fn test_reference_cycle_is_error() {
        let err = compose(
            r#"
            ["hst:hst"."hst:configurations".demo."hst:pages".a]
            "jcr:primaryType" = "hst:component"
            "hst:referencecomponent" = "hst:pages/b"
            ["hst:hst"."hst:configurations".demo."hst:pages".b]
            "jcr:primaryType" = "hst:component"
            "hst:referencecomponent" = "hst:pages/a"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::Configuration(ConfigurationError::ReferenceCycle(_))));
    }

    #[test]
    fn test_catalog_packages() {
        let config = compose(
            r#"
            ["hst:hst"."hst:configurations".demo."hst:catalog".essentials.banner]
            "jcr:primaryType" = "hst:containeritemcomponent"
            "hst:label" = "Banner"
            "#,
        )
        .unwrap();

        let items = config.catalog().get("essentials").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id(), "hst:catalog/essentials/banner");
        assert_eq!(items[0].label(), Some("Banner"));
        assert!(!items[0].is_inherited());
    }
}
