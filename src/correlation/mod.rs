//! Correlation of suspended connections across pipeline stages.
//!
//! # Data Flow
//! ```text
//! ingest stage
//!     → mint CorrelationId
//!     → register(id, suspended response)      (insert-if-absent)
//!
//! completion stage (later, elsewhere)
//!     → lookup(id)                            (write outcome data)
//!     → complete(id)                          (remove + resume connection)
//! ```
//!
//! Per identifier the legal state sequence is
//! `unregistered → registered → completed`; re-entering a state fails
//! loudly rather than being silently ignored.

pub mod store;

pub use store::{CorrelationError, CorrelationId, CorrelationStore};
