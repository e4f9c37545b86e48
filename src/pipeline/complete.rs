//! Completion stage: resolves a correlation identifier to its suspended
//! connection and writes the outcome.
//!
//! Write order is status, then headers, then body; header writes after
//! the body would be illegal on the wire.

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use thiserror::Error;

use crate::correlation::{CorrelationError, CorrelationStore};
use crate::observability::metrics;
use crate::pipeline::work_unit::CompletionRequest;

/// Errors surfaced by a single completion invocation.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Unknown (or already completed) identifier, or another store
    /// invariant violation. Never silently swallowed.
    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    /// The supplied status code is not a legal HTTP status.
    #[error("invalid response status code {0}")]
    InvalidStatus(u16),

    /// A supplied header could not be written.
    #[error("invalid response header {name:?}")]
    InvalidHeader { name: String },
}

/// Scheduler-invoked stage that completes suspended exchanges.
pub struct CompletionStage {
    store: Arc<CorrelationStore>,
}

impl CompletionStage {
    pub fn new(store: Arc<CorrelationStore>) -> Self {
        Self { store }
    }

    /// Write `request`'s outcome to its suspended connection and resume it.
    ///
    /// The outcome is validated before anything is written, so a failed
    /// attempt leaves the exchange registered and completable.
    pub fn run_once(&self, request: CompletionRequest) -> Result<(), CompletionError> {
        let status = StatusCode::from_u16(request.status)
            .map_err(|_| CompletionError::InvalidStatus(request.status))?;

        let mut headers = Vec::with_capacity(request.headers.len());
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| CompletionError::InvalidHeader { name: name.clone() })?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| CompletionError::InvalidHeader { name: name.to_string() })?;
            headers.push((name, value));
        }

        let response = self
            .store
            .lookup(&request.context_id)
            .ok_or_else(|| CorrelationError::UnknownIdentifier(request.context_id.clone()))?;

        response.set_status(status);
        for (name, value) in headers {
            response.insert_header(name, value);
        }
        if let Some(body) = request.body {
            response.write_body(body);
        }

        self.store.complete(&request.context_id)?;

        metrics::record_completion(status.as_u16());
        tracing::info!(
            context_id = %request.context_id,
            status = status.as_u16(),
            "Exchange completed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::CorrelationId;
    use crate::http::exchange::SuspendedResponse;
    use bytes::Bytes;

    fn stage_with_registered() -> (
        CompletionStage,
        Arc<CorrelationStore>,
        CorrelationId,
        tokio::sync::oneshot::Receiver<axum::response::Response>,
    ) {
        let store = Arc::new(CorrelationStore::new());
        let (response, rx) = SuspendedResponse::suspend();
        let id = CorrelationId::mint();
        store.register(id.clone(), response).unwrap();
        (CompletionStage::new(store.clone()), store, id, rx)
    }

    #[tokio::test]
    async fn completion_writes_status_headers_and_body() {
        let (stage, store, id, rx) = stage_with_registered();

        stage
            .run_once(CompletionRequest {
                context_id: id.clone(),
                status: 201,
                headers: vec![("x-flow".to_string(), "done".to_string())],
                body: Some(Bytes::from_static(b"Hello World")),
            })
            .unwrap();

        let response = rx.await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get("x-flow").unwrap(), "done");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Hello World");
        assert_eq!(store.outstanding(), 0);
    }

    #[tokio::test]
    async fn unknown_identifier_is_an_explicit_failure() {
        let store = Arc::new(CorrelationStore::new());
        let stage = CompletionStage::new(store);

        let err = stage
            .run_once(CompletionRequest::with_status(
                CorrelationId::from("never-registered"),
                200,
            ))
            .unwrap_err();
        assert!(matches!(
            err,
            CompletionError::Correlation(CorrelationError::UnknownIdentifier(_))
        ));
    }

    #[tokio::test]
    async fn invalid_status_fails_before_touching_the_exchange() {
        let (stage, store, id, _rx) = stage_with_registered();

        let err = stage
            .run_once(CompletionRequest::with_status(id.clone(), 1999))
            .unwrap_err();
        assert!(matches!(err, CompletionError::InvalidStatus(1999)));
        // Still registered and completable.
        assert_eq!(store.outstanding(), 1);
        stage
            .run_once(CompletionRequest::with_status(id, 204))
            .unwrap();
    }

    #[tokio::test]
    async fn invalid_header_fails_before_touching_the_exchange() {
        let (stage, store, id, _rx) = stage_with_registered();

        let err = stage
            .run_once(CompletionRequest {
                context_id: id.clone(),
                status: 200,
                headers: vec![("bad header".to_string(), "x".to_string())],
                body: None,
            })
            .unwrap_err();
        assert!(matches!(err, CompletionError::InvalidHeader { .. }));
        assert_eq!(store.outstanding(), 1);
    }
}
