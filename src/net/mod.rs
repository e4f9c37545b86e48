//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → tls.rs (optional TLS handshake, client-certificate modes)
//!     → HTTP layer (axum handler, admission, suspension)
//! ```

pub mod tls;
