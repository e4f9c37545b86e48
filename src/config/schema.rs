//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the ingress.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the HTTP ingress.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct IngressConfig {
    /// Listener configuration (bind host/port, TLS).
    pub listener: ListenerConfig,

    /// Allowed HTTP methods.
    pub methods: MethodConfig,

    /// Admission and backpressure settings.
    pub admission: AdmissionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Hostname to bind to. If not specified, binds to all interfaces.
    pub host: Option<String>,

    /// Port to listen on for incoming HTTP requests. 0 picks an
    /// ephemeral port.
    pub port: u16,

    /// Optional TLS configuration. When present the listener accepts
    /// only HTTPS requests.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 8080,
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate chain file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,

    /// Client certificate authentication mode.
    #[serde(default)]
    pub client_auth: ClientAuthMode,

    /// Path to the trust anchors used to verify client certificates
    /// (PEM). Required when `client_auth` is `want` or `need`.
    pub ca_path: Option<String>,
}

/// Whether and how the listener authenticates clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClientAuthMode {
    /// Clients are not asked for a certificate.
    #[default]
    None,
    /// Clients are asked for a certificate but may connect without one.
    Want,
    /// Clients must present a certificate trusted by the configured CA.
    Need,
}

/// Allowed HTTP methods.
///
/// Standard methods are toggled individually; non-standard methods can be
/// supplied as a comma-separated list and are normalized to upper case.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MethodConfig {
    pub allow_get: bool,
    pub allow_post: bool,
    pub allow_put: bool,
    pub allow_delete: bool,
    pub allow_head: bool,
    pub allow_options: bool,

    /// Comma-separated list of additional methods to allow (e.g. "PATCH").
    pub additional: String,
}

impl Default for MethodConfig {
    fn default() -> Self {
        Self {
            allow_get: true,
            allow_post: true,
            allow_put: true,
            allow_delete: true,
            allow_head: false,
            allow_options: false,
            additional: String::new(),
        }
    }
}

/// Admission and backpressure settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Regular expression that request paths must fully match to be
    /// admitted. Non-matching paths receive 404. When unset all paths
    /// are admitted.
    pub allowed_paths: Option<String>,

    /// Maximum number of admitted requests waiting to be ingested.
    /// Requests arriving while the queue is full receive 503.
    pub queue_capacity: usize,

    /// Maximum request body size read during ingest, in bytes.
    pub max_body_bytes: usize,

    /// Seconds after which a registered-but-never-completed exchange is
    /// expired and its client receives 503. 0 disables expiration.
    pub request_expiration_secs: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            allowed_paths: None,
            queue_capacity: 50,
            max_body_bytes: 2 * 1024 * 1024,
            request_expiration_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
