//! Process lifecycle.
//!
//! # Data Flow
//! ```text
//! SIGTERM / SIGINT → Shutdown::trigger → invalidator, watcher, server exit
//! SIGHUP           → ModelCache::get_virtual_hosts_fresh
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::handle_signals;
