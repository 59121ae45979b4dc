//! Site routing engine library.
//!
//! Builds a cached, immutable routing model from a hierarchical
//! configuration tree and resolves requests against it.
//!
//! # Layout
//!
//! ```text
//!   configuration tree ──▶ source ──▶ composer ──▶ sitemap
//!          │                              │            │
//!          │ change batches               ▼            ▼
//!          └──────────▶ cache ◀────── routing (hosts, mounts, preview)
//!                         │
//!                         ▼
//!                  published VirtualHosts ──▶ http diagnostics API
//! ```

pub mod admin;
pub mod cache;
pub mod composer;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod sitemap;
pub mod source;

pub use cache::ModelCache;
pub use config::EngineConfig;
pub use error::{BuildError, ConfigurationError, HandlerError, ModelError, ResolutionError, SourceError};
pub use http::DiagnosticsServer;
pub use lifecycle::Shutdown;
pub use routing::{Mount, VirtualHosts};
pub use source::{ChangeBatch, ConfigurationSource, InMemorySource};
