//! Component configuration composer.
//!
//! # Responsibilities
//! - Resolve the inheritance chain of a configuration root
//! - Merge pages, components, templates, catalog and containers first-wins
//! - Splice container references and validate component constraints
//! - Fingerprint the contributing content so equal inputs share one instance
//!
//! # Data Flow
//! ```text
//! root path
//!     → ConfigurationChain::resolve   (own, own workspace, inherits-from…, hst:default)
//!     → LoadedRoot::load              (bounded reads of contributing sections)
//!     → ComponentsConfiguration::compose
//!     → HstSite::assemble             (sitemap + handlers around the bundle)
//! ```

pub mod chain;
pub mod component;
pub mod components;
pub mod key;
pub mod site;

use std::sync::Arc;

pub use chain::{ConfigurationChain, Contributor, ContributorKind, Dependency, Section};
pub use component::{ComponentConfiguration, ComponentType};
pub use components::{ComponentsConfiguration, Template};
pub use key::{ConfigurationKey, LoadedRoot};
pub use site::HstSite;

use crate::error::BuildResult;
use crate::source::ConfigurationSource;

/// Compose the components bundle of one configuration root.
pub fn compose(source: &dyn ConfigurationSource, root_path: &str) -> BuildResult<ComponentsConfiguration> {
    let loaded = LoadedRoot::load(source, root_path)?;
    ComponentsConfiguration::compose(&loaded)
}

/// Compose a whole site without any instance sharing.
pub fn build_site(source: &dyn ConfigurationSource, root_path: &str) -> BuildResult<HstSite> {
    let loaded = LoadedRoot::load(source, root_path)?;
    let components = Arc::new(ComponentsConfiguration::compose(&loaded)?);
    Ok(HstSite::assemble(&loaded, components))
}
