//! Build outcome reporting.

use std::fmt;
use std::time::Duration;

use crate::error::{ConfigurationError, ModelError};
use crate::observability::metrics;

/// Receives build outcomes from the model cache.
///
/// All methods default to no-ops so implementors pick what they need.
pub trait BuildObserver: Send + Sync + fmt::Debug {
    /// A configuration root was composed. `shared` is true when an existing
    /// components instance with an equal key was reused.
    fn root_built(&self, _root: &str, _shared: bool) {}

    /// A configuration root failed; its previous instance stays published.
    fn root_failed(&self, _root: &str, _error: &ConfigurationError) {}

    fn model_published(&self, _generation: u64, _roots_rebuilt: usize, _elapsed: Duration) {}

    /// The whole rebuild was abandoned; the previous model stays published.
    fn model_failed(&self, _error: &ModelError, _elapsed: Duration) {}
}

/// Reports through `tracing` and the metrics facade.
#[derive(Debug, Default)]
pub struct TelemetryObserver;

impl BuildObserver for TelemetryObserver {
    fn root_built(&self, root: &str, shared: bool) {
        tracing::debug!(root = %root, shared, "Configuration root built");
        metrics::record_root_build(if shared { "shared" } else { "built" });
    }

    fn root_failed(&self, root: &str, error: &ConfigurationError) {
        tracing::error!(root = %root, error = %error, "Configuration root failed to build, keeping previous instance");
        metrics::record_root_build("failed");
    }

    fn model_published(&self, generation: u64, roots_rebuilt: usize, elapsed: Duration) {
        tracing::info!(
            generation,
            roots_rebuilt,
            elapsed_ms = elapsed.as_millis() as u64,
            "Virtual hosts model published"
        );
        metrics::record_model_rebuild("published", elapsed);
        metrics::set_model_generation(generation);
    }

    fn model_failed(&self, error: &ModelError, elapsed: Duration) {
        tracing::warn!(error = %error, "Model rebuild abandoned, previous model retained");
        metrics::record_model_rebuild("failed", elapsed);
    }
}
