//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! listener, queue, store and stages produce:
//!     → tracing events (structured logs, correlation id attached)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout via tracing-subscriber)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod metrics;
