//! Work units emitted to the downstream pipeline and the completion input.

use std::collections::HashMap;

use bytes::Bytes;

use crate::correlation::CorrelationId;

/// Attribute keys stamped onto every work unit.
///
/// Keys whose source value is absent are omitted entirely, never stored
/// as an empty placeholder.
pub mod attributes {
    /// The correlation identifier binding the work unit to its suspended
    /// connection.
    pub const HTTP_CONTEXT_ID: &str = "http.context.id";
    pub const MIME_TYPE: &str = "mime.type";
    pub const SERVLET_PATH: &str = "http.servlet.path";
    pub const CONTEXT_PATH: &str = "http.context.path";
    pub const METHOD: &str = "http.method";
    pub const QUERY_STRING: &str = "http.query.string";
    pub const REMOTE_HOST: &str = "http.remote.host";
    pub const REMOTE_ADDR: &str = "http.remote.addr";
    pub const REMOTE_USER: &str = "http.remote.user";
    pub const REQUEST_URI: &str = "http.request.uri";
    pub const AUTH_TYPE: &str = "http.auth.type";
    pub const PRINCIPAL_NAME: &str = "http.principal.name";
    pub const SUBJECT_DN: &str = "http.subject.dn";
    pub const ISSUER_DN: &str = "http.issuer.dn";
    /// Prefix for per-header attributes: `http.headers.<name>`.
    pub const HEADER_PREFIX: &str = "http.headers.";
}

/// The materialized request handed to the downstream pipeline.
///
/// Ownership passes entirely to the consumer; the ingress retains no
/// reference once a work unit is emitted.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    payload: Bytes,
    attributes: HashMap<String, String>,
}

impl WorkUnit {
    pub fn new(payload: Bytes, attributes: HashMap<String, String>) -> Self {
        Self {
            payload,
            attributes,
        }
    }

    /// The request body, byte-identical to what the client sent.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// The correlation identifier stamped at ingest time.
    pub fn context_id(&self) -> Option<CorrelationId> {
        self.attribute(attributes::HTTP_CONTEXT_ID)
            .map(CorrelationId::from)
    }
}

/// Input to the completion stage: the outcome to write to a suspended
/// connection.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Identifier of the exchange to complete.
    pub context_id: CorrelationId,
    /// HTTP status code for the response.
    pub status: u16,
    /// Response headers, written in order before the body.
    pub headers: Vec<(String, String)>,
    /// Optional response body.
    pub body: Option<Bytes>,
}

impl CompletionRequest {
    /// A completion with the given status and no headers or body.
    pub fn with_status(context_id: CorrelationId, status: u16) -> Self {
        Self {
            context_id,
            status,
            headers: Vec::new(),
            body: None,
        }
    }
}
