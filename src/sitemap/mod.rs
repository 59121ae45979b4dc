//! Sitemap model and matching.
//!
//! # Data Flow
//! ```text
//! LoadedRoot (hst:sitemap sections, first wins)
//!     → SiteMap { ranked item tree }
//!     → SiteMap::match_path(remaining path) → SiteMapMatch { item, captures }
//!     → ResolvedSiteMapItem (placeholders substituted, component + handlers bound)
//! ```

pub mod handler;
pub mod item;
pub mod matcher;
pub mod resolved;

pub use handler::{
    HandlerConfiguration, HandlerFactory, HandlerOutcome, ResolvedHandlerConfiguration, SiteMapItemHandler,
};
pub use item::{SegmentMatcher, SiteMapItem};
pub use matcher::{resolve_placeholders, SiteMap, SiteMapMatch};
pub use resolved::{ItemDefaults, ResolvedSiteMapItem};
