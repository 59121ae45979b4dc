//! Diagnostics HTTP API.
//!
//! # Data Flow
//! ```text
//! GET /resolve?host=&context_path=&path=
//!     → ModelCache::get_virtual_hosts
//!     → VirtualHosts::match_mount
//!     → ResolvedMount::match_site_map_item
//!     → sitemap item handlers
//!     → JSON summary
//!
//! GET /admin/*
//!     → model and cache state as JSON
//! ```

pub mod resolve;
pub mod server;

pub use server::{router, AppState, DiagnosticsServer, X_REQUEST_ID};
