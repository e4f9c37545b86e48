//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Build ingress → Bind listener → Spawn reaper
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain suspended connections → Exit
//! ```
//!
//! The ingress is an explicit instance with its own start/stop, not
//! process-wide state; multiple listeners can coexist and be torn down
//! independently.

pub mod shutdown;

pub use shutdown::Shutdown;
