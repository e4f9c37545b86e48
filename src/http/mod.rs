//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted request
//!     → admission.rs (method allow-set, path pattern → 405/404)
//!     → exchange.rs (suspend the connection)
//!     → queue.rs (bounded FIFO → 503 when full)
//!     → [ingest stage drains on its own cadence]
//!     → [completion stage resumes the connection later]
//! ```

pub mod admission;
pub mod exchange;
pub mod queue;
pub mod server;

pub use admission::{AdmissionDecision, AdmissionFilter};
pub use exchange::{PeerCertificate, PeerInfo, PendingExchange, RequestHead, SuspendedResponse};
pub use queue::AdmissionQueue;
pub use server::{HttpIngress, IngressError};
