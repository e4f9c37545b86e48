//! HTTP listener setup and request suspension.
//!
//! # Responsibilities
//! - Build the Axum router (catch-all, any method)
//! - Run the admission filter on the accepting task
//! - Suspend admitted requests and offer them to the admission queue
//! - Produce the boundary responses (405, 404, 503) directly
//! - Bind plain or TLS listeners, with graceful shutdown
//! - Spawn the expiration reaper
//!
//! The handler holds each admitted connection open by awaiting the
//! receiver half of its suspension capability; the pipeline stages
//! resolve the capability later through the correlation store.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::IngressConfig;
use crate::correlation::CorrelationStore;
use crate::http::admission::{AdmissionDecision, AdmissionFilter};
use crate::http::exchange::{
    PeerCertificate, PeerInfo, PendingExchange, RequestHead, SuspendedResponse,
};
use crate::http::queue::AdmissionQueue;
use crate::lifecycle::Shutdown;
use crate::net::tls::{load_rustls_config, TlsError};
use crate::observability::metrics;
use crate::pipeline::{CompletionStage, IngestStage};

/// Errors raised while building or starting the ingress.
#[derive(Debug, Error)]
pub enum IngressError {
    #[error("invalid path pattern: {0}")]
    PathPattern(#[from] regex::Error),

    #[error("failed to bind listener: {0}")]
    Bind(std::io::Error),

    #[error(transparent)]
    Tls(#[from] TlsError),
}

/// State injected into the accept handler.
#[derive(Clone)]
struct ListenerState {
    filter: Arc<AdmissionFilter>,
    queue: Arc<AdmissionQueue>,
}

/// One HTTP ingress instance: listener, admission queue and correlation
/// store, with the two pipeline-facing stages hanging off it.
///
/// All state is owned by the instance; independent instances can coexist
/// and be torn down separately.
pub struct HttpIngress {
    config: IngressConfig,
    filter: Arc<AdmissionFilter>,
    queue: Arc<AdmissionQueue>,
    store: Arc<CorrelationStore>,
}

impl HttpIngress {
    /// Build an ingress from configuration.
    pub fn new(config: IngressConfig) -> Result<Self, IngressError> {
        let filter = AdmissionFilter::from_config(
            &config.methods,
            config.admission.allowed_paths.as_deref(),
        )?;
        let queue = AdmissionQueue::new(config.admission.queue_capacity);

        Ok(Self {
            config,
            filter: Arc::new(filter),
            queue: Arc::new(queue),
            store: Arc::new(CorrelationStore::new()),
        })
    }

    /// The scheduler-invoked ingest stage for this instance.
    pub fn ingest_stage(&self) -> IngestStage {
        IngestStage::new(
            self.queue.clone(),
            self.store.clone(),
            self.config.admission.max_body_bytes,
        )
    }

    /// The scheduler-invoked completion stage for this instance.
    pub fn completion_stage(&self) -> CompletionStage {
        CompletionStage::new(self.store.clone())
    }

    /// Admitted exchanges waiting to be ingested.
    pub fn queue_size(&self) -> usize {
        self.queue.size()
    }

    /// Registered-but-not-completed exchanges (leak indicator).
    pub fn outstanding(&self) -> usize {
        self.store.outstanding()
    }

    /// Bind the listener and start serving.
    ///
    /// Returns the bound address (useful with port 0). The listener and
    /// the reaper stop when `shutdown` is triggered.
    pub async fn start(&self, shutdown: &Shutdown) -> Result<SocketAddr, IngressError> {
        let state = ListenerState {
            filter: self.filter.clone(),
            queue: self.queue.clone(),
        };
        let app = Router::new()
            .route("/", any(accept_request))
            .route("/{*path}", any(accept_request))
            .with_state(state)
            .layer(TraceLayer::new_for_http());
        let make_service = app.into_make_service_with_connect_info::<SocketAddr>();

        let addr = resolve_bind_addr(
            self.config.listener.host.as_deref(),
            self.config.listener.port,
        )
        .map_err(IngressError::Bind)?;

        let local_addr = if let Some(tls) = &self.config.listener.tls {
            let rustls_config = load_rustls_config(tls)?;
            let handle = axum_server::Handle::new();

            let mut rx = shutdown.subscribe();
            let shutdown_handle = handle.clone();
            tokio::spawn(async move {
                let _ = rx.recv().await;
                shutdown_handle.graceful_shutdown(Some(Duration::from_secs(5)));
            });

            let server = axum_server::bind_rustls(addr, rustls_config)
                .handle(handle.clone())
                .serve(make_service);
            tokio::spawn(async move {
                if let Err(e) = server.await {
                    tracing::error!(error = %e, "TLS listener terminated");
                }
            });

            handle.listening().await.ok_or_else(|| {
                IngressError::Bind(std::io::Error::other("TLS listener failed to start"))
            })?
        } else {
            let listener = TcpListener::bind(addr).await.map_err(IngressError::Bind)?;
            let local_addr = listener.local_addr().map_err(IngressError::Bind)?;

            let mut rx = shutdown.subscribe();
            let server = axum::serve(listener, make_service).with_graceful_shutdown(async move {
                let _ = rx.recv().await;
            });
            tokio::spawn(async move {
                if let Err(e) = server.await {
                    tracing::error!(error = %e, "Listener terminated");
                }
            });

            local_addr
        };

        self.spawn_reaper(shutdown);

        tracing::info!(
            address = %local_addr,
            queue_capacity = self.queue.capacity(),
            "Ingress listening"
        );
        Ok(local_addr)
    }

    fn spawn_reaper(&self, shutdown: &Shutdown) {
        let expiration_secs = self.config.admission.request_expiration_secs;
        if expiration_secs == 0 {
            return;
        }
        let max_age = Duration::from_secs(expiration_secs);
        let store = self.store.clone();
        let mut rx = shutdown.subscribe();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        store.reap_expired(max_age);
                    }
                    _ = rx.recv() => break,
                }
            }
        });
    }
}

fn resolve_bind_addr(host: Option<&str>, port: u16) -> std::io::Result<SocketAddr> {
    let host = host.unwrap_or("0.0.0.0");
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| std::io::Error::other(format!("host {host:?} did not resolve")))
}

/// Accept handler: filter, suspend, offer, await completion.
async fn accept_request(
    State(state): State<ListenerState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();
    let method = parts.method;
    let uri = parts.uri;

    match state.filter.decide(&method, uri.path()) {
        AdmissionDecision::MethodNotAllowed => {
            tracing::info!(peer = %remote_addr, method = %method, uri = %uri,
                "Rejecting request with disallowed method");
            metrics::record_boundary_response(method.as_str(), 405);
            return StatusCode::METHOD_NOT_ALLOWED.into_response();
        }
        AdmissionDecision::PathNotFound => {
            tracing::info!(peer = %remote_addr, method = %method, uri = %uri,
                "Rejecting request outside the allowed paths");
            metrics::record_boundary_response(method.as_str(), 404);
            return StatusCode::NOT_FOUND.into_response();
        }
        AdmissionDecision::Admit => {}
    }

    let peer = PeerInfo {
        remote_addr: Some(remote_addr),
        certificate: parts.extensions.get::<PeerCertificate>().cloned(),
        ..PeerInfo::default()
    };
    let (response, receiver) = SuspendedResponse::suspend();
    let exchange = PendingExchange {
        head: RequestHead {
            method: method.clone(),
            uri: uri.clone(),
            headers: parts.headers,
        },
        peer,
        body,
        response,
    };

    if state.queue.offer(exchange).is_err() {
        tracing::info!(peer = %remote_addr, method = %method, uri = %uri,
            "Admission queue full; rejecting request");
        metrics::record_boundary_response(method.as_str(), 503);
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    tracing::debug!(peer = %remote_addr, method = %method, uri = %uri, "Queued exchange");

    match receiver.await {
        Ok(response) => response,
        // The exchange was discarded before completion (body read
        // failure); surface the transport-level failure.
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_defaults_to_all_interfaces() {
        let addr = resolve_bind_addr(None, 8080).unwrap();
        assert_eq!(addr, "0.0.0.0:8080".parse().unwrap());
    }

    #[test]
    fn bind_addr_honors_configured_host() {
        let addr = resolve_bind_addr(Some("127.0.0.1"), 0).unwrap();
        assert_eq!(addr.ip(), std::net::IpAddr::from([127, 0, 0, 1]));
        assert_eq!(addr.port(), 0);
    }
}
