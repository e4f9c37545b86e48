//! Configuration validation.
//!
//! Serde handles syntactic validation; this module performs the semantic
//! checks. Validation is a pure function and returns every violation it
//! finds, not just the first.

use crate::config::schema::{ClientAuthMode, IngressConfig};

/// A single semantic violation found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `admission.queue_capacity` must be at least 1.
    QueueCapacityZero,
    /// `admission.max_body_bytes` must be at least 1.
    BodyLimitZero,
    /// `admission.allowed_paths` is not a valid regular expression.
    InvalidPathPattern { pattern: String, reason: String },
    /// A TLS file path is empty.
    EmptyTlsPath { field: &'static str },
    /// `listener.tls.ca_path` is required for `want`/`need` client auth.
    MissingClientCa,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::QueueCapacityZero => {
                write!(f, "admission.queue_capacity must be at least 1")
            }
            ValidationError::BodyLimitZero => {
                write!(f, "admission.max_body_bytes must be at least 1")
            }
            ValidationError::InvalidPathPattern { pattern, reason } => {
                write!(f, "admission.allowed_paths {:?} is not a valid regex: {}", pattern, reason)
            }
            ValidationError::EmptyTlsPath { field } => {
                write!(f, "listener.tls.{} must not be empty", field)
            }
            ValidationError::MissingClientCa => {
                write!(
                    f,
                    "listener.tls.ca_path is required when client_auth is \"want\" or \"need\""
                )
            }
        }
    }
}

/// Validate a configuration, collecting all violations.
pub fn validate_config(config: &IngressConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.admission.queue_capacity == 0 {
        errors.push(ValidationError::QueueCapacityZero);
    }

    if config.admission.max_body_bytes == 0 {
        errors.push(ValidationError::BodyLimitZero);
    }

    if let Some(pattern) = &config.admission.allowed_paths {
        if let Err(e) = regex::Regex::new(pattern) {
            errors.push(ValidationError::InvalidPathPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            });
        }
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() {
            errors.push(ValidationError::EmptyTlsPath { field: "cert_path" });
        }
        if tls.key_path.is_empty() {
            errors.push(ValidationError::EmptyTlsPath { field: "key_path" });
        }
        if tls.client_auth != ClientAuthMode::None
            && tls.ca_path.as_deref().unwrap_or("").is_empty()
        {
            errors.push(ValidationError::MissingClientCa);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TlsConfig;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&IngressConfig::default()).is_ok());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut config = IngressConfig::default();
        config.admission.queue_capacity = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::QueueCapacityZero));
    }

    #[test]
    fn bad_path_pattern_is_rejected() {
        let mut config = IngressConfig::default();
        config.admission.allowed_paths = Some("/test/[".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidPathPattern { .. }));
    }

    #[test]
    fn client_auth_without_ca_is_rejected() {
        let mut config = IngressConfig::default();
        config.listener.tls = Some(TlsConfig {
            cert_path: "server.pem".to_string(),
            key_path: "server.key".to_string(),
            client_auth: ClientAuthMode::Need,
            ca_path: None,
        });
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::MissingClientCa));
    }

    #[test]
    fn all_violations_are_collected() {
        let mut config = IngressConfig::default();
        config.admission.queue_capacity = 0;
        config.admission.allowed_paths = Some("(".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
