//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → IngressConfig (validated, immutable)
//!     → shared with the listener and pipeline stages
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdmissionConfig, ClientAuthMode, IngressConfig, ListenerConfig, MethodConfig,
    ObservabilityConfig, TlsConfig,
};
pub use validation::{validate_config, ValidationError};
