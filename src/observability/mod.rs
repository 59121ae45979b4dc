//! Logging and metrics for model builds and resolution.
//!
//! # Data Flow
//! ```text
//! Build and request paths emit:
//!     → tracing events with structured fields (logging.rs installs the subscriber)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured `tracing` events, optionally rendered as JSON
//! - Request ID flows through the diagnostics API via tower-http
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
