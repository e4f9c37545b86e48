//! Ingest stage: drains the admission queue on a scheduler's cadence.
//!
//! Each invocation handles at most one queued exchange: read the body,
//! mint a correlation identifier, derive the attribute map, register the
//! suspended connection, and hand the materialized work unit to the
//! caller. Registration happens before the work unit is returned, so a
//! completion attempt racing the emission is guaranteed to find the entry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::correlation::{CorrelationError, CorrelationId, CorrelationStore};
use crate::http::exchange::{PeerInfo, RequestHead};
use crate::http::queue::AdmissionQueue;
use crate::observability::metrics;
use crate::pipeline::work_unit::{attributes, WorkUnit};

/// Errors surfaced by a single ingest invocation.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The request body could not be read; the exchange was discarded
    /// without registration and the client is left to the transport
    /// layer's own error path.
    #[error("failed to read request body: {0}")]
    BodyRead(axum::Error),

    /// Correlation store invariant violation (duplicate identifier).
    #[error(transparent)]
    Correlation(#[from] CorrelationError),
}

/// Scheduler-invoked stage that converts queued exchanges into work units.
pub struct IngestStage {
    queue: Arc<AdmissionQueue>,
    store: Arc<CorrelationStore>,
    max_body_bytes: usize,
}

impl IngestStage {
    pub fn new(
        queue: Arc<AdmissionQueue>,
        store: Arc<CorrelationStore>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            queue,
            store,
            max_body_bytes,
        }
    }

    /// Ingest at most one queued exchange.
    ///
    /// Returns `Ok(None)` immediately when the queue is empty; never
    /// blocks on pipeline progress. Ownership of the returned work unit
    /// passes to the caller.
    pub async fn run_once(&self) -> Result<Option<WorkUnit>, IngestError> {
        let Some(exchange) = self.queue.poll() else {
            return Ok(None);
        };

        let started = Instant::now();
        let peer = exchange.peer;
        let head = exchange.head;

        let payload = match axum::body::to_bytes(exchange.body, self.max_body_bytes).await {
            Ok(payload) => payload,
            Err(e) => {
                // Dropping the exchange releases the suspension; the
                // transport produces the client-facing failure.
                tracing::error!(
                    uri = %head.uri,
                    peer = ?peer.remote_addr,
                    error = %e,
                    "Failed to read request body; discarding exchange"
                );
                metrics::record_body_read_failure();
                return Err(IngestError::BodyRead(e));
            }
        };

        let id = CorrelationId::mint();
        let attributes = derive_attributes(&id, &head, &peer);

        self.store.register(id.clone(), exchange.response)?;

        let receipt_latency = started.elapsed();
        metrics::record_receipt(receipt_latency);
        tracing::info!(
            context_id = %id,
            uri = %head.uri,
            peer = ?peer.remote_addr,
            receipt_millis = receipt_latency.as_millis() as u64,
            "Exchange ingested"
        );

        Ok(Some(WorkUnit::new(payload, attributes)))
    }
}

/// Derive the work-unit attribute map from request metadata.
///
/// Every key with an absent source value is omitted.
fn derive_attributes(
    id: &CorrelationId,
    head: &RequestHead,
    peer: &PeerInfo,
) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let mut put = |key: &str, value: Option<String>| {
        if let Some(value) = value {
            map.insert(key.to_string(), value);
        }
    };

    put(attributes::HTTP_CONTEXT_ID, Some(id.to_string()));
    put(
        attributes::MIME_TYPE,
        head.headers
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    put(attributes::SERVLET_PATH, Some(head.uri.path().to_string()));
    // The listener is root-mounted; there is no application context path.
    put(attributes::CONTEXT_PATH, None);
    put(attributes::METHOD, Some(head.method.as_str().to_string()));
    put(
        attributes::QUERY_STRING,
        head.uri.query().map(str::to_string),
    );
    put(
        attributes::REMOTE_HOST,
        peer.remote_addr.map(|addr| addr.ip().to_string()),
    );
    put(
        attributes::REMOTE_ADDR,
        peer.remote_addr.map(|addr| addr.ip().to_string()),
    );
    put(attributes::REMOTE_USER, peer.remote_user.clone());
    put(attributes::REQUEST_URI, Some(head.uri.to_string()));
    put(attributes::AUTH_TYPE, peer.auth_type.clone());
    put(attributes::PRINCIPAL_NAME, peer.principal.clone());

    for name in head.headers.keys() {
        // First value wins for repeated headers.
        let value = head
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if let Some(value) = value {
            map.insert(format!("{}{}", attributes::HEADER_PREFIX, name), value);
        }
    }

    if let Some(certificate) = &peer.certificate {
        map.insert(
            attributes::SUBJECT_DN.to_string(),
            certificate.subject_dn.clone(),
        );
        map.insert(
            attributes::ISSUER_DN.to_string(),
            certificate.issuer_dn.clone(),
        );
    }

    map
}
