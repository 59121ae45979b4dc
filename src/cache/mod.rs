//! Model cache subsystem.
//!
//! # Data Flow
//! ```text
//! request path
//!     → ModelCache::get_virtual_hosts (atomic load, no lock)
//!
//! committed change
//!     → Invalidator (coalesce batches)
//!     → ModelCache::invalidate (pending paths, change sequence)
//!     → ModelCache::refresh
//!         → BuildGate (one rebuild in flight)
//!         → dirty roots rebuilt, clean roots reused
//!         → publish if strictly newer
//! ```
//!
//! # Design Decisions
//! - Published models are immutable; a change produces a new model
//! - Per-root failures never replace a good site with nothing
//! - Build outcomes are reported through a [`BuildObserver`]

pub mod gate;
pub mod invalidator;
pub mod model_cache;
pub mod observer;

pub use gate::BuildGate;
pub use invalidator::{spawn_invalidator, Invalidator};
pub use model_cache::ModelCache;
pub use observer::{BuildObserver, TelemetryObserver};
