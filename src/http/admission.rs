//! Admission filtering for inbound requests.
//!
//! # Responsibilities
//! - Evaluate the method allow-set (case-insensitive, user-extensible)
//! - Evaluate the optional path pattern (full-string match, not substring)
//! - Decide admit / reject-method / reject-path synchronously on the
//!   accepting task, before anything is queued

use std::collections::HashSet;

use axum::http::Method;
use regex::Regex;

use crate::config::MethodConfig;

/// Outcome of the admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// Queue the request for ingestion.
    Admit,
    /// Method not in the allow-set; respond 405.
    MethodNotAllowed,
    /// Path does not match the allow pattern; respond 404.
    PathNotFound,
}

/// Filter applied to every inbound request before queuing.
pub struct AdmissionFilter {
    allowed_methods: HashSet<String>,
    path_pattern: Option<Regex>,
}

impl AdmissionFilter {
    /// Build a filter from configuration.
    ///
    /// The path pattern must match the entire request path, so the
    /// compiled expression is anchored at both ends.
    pub fn from_config(
        methods: &MethodConfig,
        allowed_paths: Option<&str>,
    ) -> Result<Self, regex::Error> {
        let mut allowed_methods = HashSet::new();
        if methods.allow_get {
            allowed_methods.insert("GET".to_string());
        }
        if methods.allow_post {
            allowed_methods.insert("POST".to_string());
        }
        if methods.allow_put {
            allowed_methods.insert("PUT".to_string());
        }
        if methods.allow_delete {
            allowed_methods.insert("DELETE".to_string());
        }
        if methods.allow_head {
            allowed_methods.insert("HEAD".to_string());
        }
        if methods.allow_options {
            allowed_methods.insert("OPTIONS".to_string());
        }
        for additional in methods.additional.split(',') {
            let trimmed = additional.trim();
            if !trimmed.is_empty() {
                allowed_methods.insert(trimmed.to_uppercase());
            }
        }

        let path_pattern = allowed_paths
            .map(|pattern| Regex::new(&format!("^(?:{pattern})$")))
            .transpose()?;

        Ok(Self {
            allowed_methods,
            path_pattern,
        })
    }

    /// Decide whether a request may enter the admission queue.
    pub fn decide(&self, method: &Method, path: &str) -> AdmissionDecision {
        if !self.allowed_methods.contains(&method.as_str().to_uppercase()) {
            return AdmissionDecision::MethodNotAllowed;
        }

        if let Some(pattern) = &self.path_pattern {
            if !pattern.is_match(path) {
                return AdmissionDecision::PathNotFound;
            }
        }

        AdmissionDecision::Admit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(methods: MethodConfig, paths: Option<&str>) -> AdmissionFilter {
        AdmissionFilter::from_config(&methods, paths).unwrap()
    }

    #[test]
    fn default_methods_admit_get_and_reject_options() {
        let filter = filter(MethodConfig::default(), None);
        assert_eq!(filter.decide(&Method::GET, "/x"), AdmissionDecision::Admit);
        assert_eq!(
            filter.decide(&Method::OPTIONS, "/x"),
            AdmissionDecision::MethodNotAllowed
        );
        assert_eq!(
            filter.decide(&Method::HEAD, "/x"),
            AdmissionDecision::MethodNotAllowed
        );
    }

    #[test]
    fn additional_methods_are_trimmed_and_case_normalized() {
        let methods = MethodConfig {
            additional: " patch , Purge,".to_string(),
            ..MethodConfig::default()
        };
        let filter = filter(methods, None);

        let patch = Method::from_bytes(b"PATCH").unwrap();
        let purge = Method::from_bytes(b"PURGE").unwrap();
        assert_eq!(filter.decide(&patch, "/x"), AdmissionDecision::Admit);
        assert_eq!(filter.decide(&purge, "/x"), AdmissionDecision::Admit);
    }

    #[test]
    fn lowercase_wire_method_matches_allow_set() {
        let filter = filter(MethodConfig::default(), None);
        let method = Method::from_bytes(b"put").unwrap();
        assert_eq!(filter.decide(&method, "/x"), AdmissionDecision::Admit);
    }

    #[test]
    fn path_pattern_requires_a_full_match() {
        let filter = filter(MethodConfig::default(), Some("/test/.*"));

        assert_eq!(filter.decide(&Method::PUT, "/test/1"), AdmissionDecision::Admit);
        assert_eq!(
            filter.decide(&Method::PUT, "/other/1"),
            AdmissionDecision::PathNotFound
        );
        // Substring hits must not pass.
        assert_eq!(
            filter.decide(&Method::PUT, "/prefix/test/1"),
            AdmissionDecision::PathNotFound
        );
    }

    #[test]
    fn method_check_runs_before_path_check() {
        let filter = filter(
            MethodConfig {
                allow_options: false,
                ..MethodConfig::default()
            },
            Some("/test/.*"),
        );
        assert_eq!(
            filter.decide(&Method::OPTIONS, "/other"),
            AdmissionDecision::MethodNotAllowed
        );
    }
}
