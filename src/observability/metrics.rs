//! Metrics collection and exposition.
//!
//! # Metrics
//! - `site_routing_model_rebuilds_total` (counter): model rebuilds by outcome
//! - `site_routing_model_rebuild_seconds` (histogram): rebuild duration
//! - `site_routing_root_builds_total` (counter): root builds by outcome
//!   (`built`, `shared`, `failed`)
//! - `site_routing_change_batches_total` (counter): change batches received
//! - `site_routing_changed_paths_total` (counter): changed paths received
//! - `site_routing_cached_roots` (gauge): configuration roots held
//! - `site_routing_model_generation` (gauge): published generation
//! - `site_routing_resolutions_total` (counter): API resolutions by outcome
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is optional

use std::net::SocketAddr;
use std::sync::Once;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the Prometheus exporter listening on `address`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(address: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(address).install()?;
    describe_metrics();
    tracing::info!(address = %address, "Prometheus exporter listening");
    Ok(())
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!("site_routing_model_rebuilds_total", Unit::Count, "Model rebuilds by outcome.");
        describe_histogram!("site_routing_model_rebuild_seconds", Unit::Seconds, "Model rebuild duration.");
        describe_counter!("site_routing_root_builds_total", Unit::Count, "Configuration root builds by outcome.");
        describe_counter!("site_routing_change_batches_total", Unit::Count, "Change batches received.");
        describe_counter!("site_routing_changed_paths_total", Unit::Count, "Changed paths received.");
        describe_gauge!("site_routing_cached_roots", Unit::Count, "Configuration roots held by the cache.");
        describe_gauge!("site_routing_model_generation", Unit::Count, "Generation of the published model.");
        describe_counter!("site_routing_resolutions_total", Unit::Count, "Resolutions served by outcome.");
    });
}

pub fn record_model_rebuild(outcome: &'static str, elapsed: Duration) {
    counter!("site_routing_model_rebuilds_total", "outcome" => outcome).increment(1);
    histogram!("site_routing_model_rebuild_seconds").record(elapsed.as_secs_f64());
}

pub fn record_root_build(outcome: &'static str) {
    counter!("site_routing_root_builds_total", "outcome" => outcome).increment(1);
}

pub fn record_change_batch(paths: usize) {
    counter!("site_routing_change_batches_total").increment(1);
    counter!("site_routing_changed_paths_total").increment(paths as u64);
}

pub fn set_cached_roots(count: usize) {
    gauge!("site_routing_cached_roots").set(count as f64);
}

pub fn set_model_generation(generation: u64) {
    gauge!("site_routing_model_generation").set(generation as f64);
}

pub fn record_resolution(outcome: &'static str) {
    counter!("site_routing_resolutions_total", "outcome" => outcome).increment(1);
}
