//! Asynchronous HTTP ingress/egress for a flow-processing pipeline.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌────────────────────────────────────────────────┐
//!                    │                   FLOWGATE                      │
//!                    │                                                 │
//!   Client Request   │  ┌──────────┐   ┌───────────┐   ┌───────────┐  │
//!   ─────────────────┼─▶│ listener │──▶│ admission │──▶│ admission │  │
//!                    │  │  (axum)  │   │  filter   │   │   queue   │  │
//!                    │  └──────────┘   └───────────┘   └─────┬─────┘  │
//!                    │        suspended connection           │        │
//!                    │        ┌─────────────┐          ingest tick    │
//!                    │        │ correlation │◀───────────────┤        │
//!                    │        │    store    │                ▼        │
//!                    │        └──────┬──────┘          WorkUnit ──────┼─▶ downstream
//!                    │               │                                │   pipeline
//!   Client Response  │        completion tick                         │
//!   ◀────────────────┼───────────────┴◀───────────── CompletionRequest┼─── later,
//!                    │                                                │    elsewhere
//!                    └────────────────────────────────────────────────┘
//! ```
//!
//! The listener admits requests and suspends their connections; the
//! ingest stage drains the queue on a scheduler's cadence and emits work
//! units stamped with a correlation identifier; the completion stage
//! resolves an identifier back to its suspended connection and writes the
//! outcome. Backpressure is the bounded admission queue; correlation is
//! exactly-once in both directions.

// Core subsystems
pub mod config;
pub mod correlation;
pub mod http;
pub mod pipeline;

// Cross-cutting concerns
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::IngressConfig;
pub use correlation::{CorrelationError, CorrelationId, CorrelationStore};
pub use http::{HttpIngress, IngressError};
pub use lifecycle::Shutdown;
pub use pipeline::{CompletionRequest, CompletionStage, IngestStage, WorkUnit};
