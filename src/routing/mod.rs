//! Mount resolution.
//!
//! # Data Flow
//! ```text
//! Incoming request (host[:port], context path, path)
//!     → hosts.rs   (host by name or wildcard, port tree, ignored prefix, child mounts)
//!     → ResolvedMount
//!     → ResolvedMount::match_site_map_item (sitemap of the mount's site)
//!
//! Model build (per published generation):
//!     hosts tree → builder.rs → LiveMount tree (+ preview decoration)
//!     → VirtualHosts, frozen and shared behind an Arc
//! ```
//!
//! # Design Decisions
//! - Immutable at runtime; rebuilds publish a new model
//! - Preview is a decoration of a live mount, never a stored copy
//! - Deterministic: the same request always resolves the same mount

pub mod builder;
pub mod hosts;
pub mod mount;
pub mod preview;

pub use builder::{build_virtual_hosts, SiteProvider, UncachedSites};
pub use hosts::{Blueprint, Channel, ResolvedMount, VirtualHost, VirtualHosts};
pub use mount::{LiveMount, Mount, MountSettings};
pub use preview::{decorate_mount_as_preview, PreviewMount};
