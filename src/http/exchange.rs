//! In-flight exchange types shared by the listener and the pipeline stages.
//!
//! A `PendingExchange` is one admitted request whose connection is being
//! held open. Its `SuspendedResponse` is the capability that lets a later,
//! unrelated caller write the response and resume the connection; the
//! handler task that accepted the request awaits the paired receiver and
//! stays suspended until then.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use bytes::Bytes;
use tokio::sync::oneshot;

/// Metadata captured from the inbound request at accept time.
#[derive(Debug)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

/// Peer identity as surfaced by the transport layer.
///
/// Fields that the transport does not provide stay `None` and are omitted
/// from work-unit attributes.
#[derive(Debug, Clone, Default)]
pub struct PeerInfo {
    /// Socket address of the connection peer.
    pub remote_addr: Option<SocketAddr>,
    /// Authenticated remote user, if the transport performed auth.
    pub remote_user: Option<String>,
    /// Authentication scheme in effect, if any.
    pub auth_type: Option<String>,
    /// Authenticated principal name, if any.
    pub principal: Option<String>,
    /// First client certificate of the peer's chain, if one was presented.
    pub certificate: Option<PeerCertificate>,
}

/// Subject and issuer of a client TLS certificate.
///
/// Inserted into request extensions by the TLS front end; read by the
/// listener when building a [`PeerInfo`].
#[derive(Debug, Clone)]
pub struct PeerCertificate {
    pub subject_dn: String,
    pub issuer_dn: String,
}

/// One admitted, not-yet-ingested request.
///
/// Owned by the admission queue until the ingest stage polls it. Dropping
/// it drops the suspension capability, which wakes the suspended handler
/// on its error path.
pub struct PendingExchange {
    pub head: RequestHead,
    pub peer: PeerInfo,
    /// Unread request body stream.
    pub body: Body,
    /// Capability used to complete the suspended connection.
    pub response: Arc<SuspendedResponse>,
}

struct ResponseState {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    sender: Option<oneshot::Sender<Response>>,
}

/// Write-side capability for a suspended connection.
///
/// Accumulates status, headers and body, and on [`resume`](Self::resume)
/// sends the assembled response to the handler task holding the connection
/// open. Resuming consumes the channel: a second resume is a no-op that
/// returns `false`.
pub struct SuspendedResponse {
    state: Mutex<ResponseState>,
}

impl SuspendedResponse {
    /// Create a suspension capability and the receiver the handler awaits.
    pub fn suspend() -> (Arc<Self>, oneshot::Receiver<Response>) {
        let (tx, rx) = oneshot::channel();
        let suspended = Self {
            state: Mutex::new(ResponseState {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Bytes::new(),
                sender: Some(tx),
            }),
        };
        (Arc::new(suspended), rx)
    }

    /// Set the response status line.
    pub fn set_status(&self, status: StatusCode) {
        self.lock().status = status;
    }

    /// Add a response header. Later values for the same name append.
    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        self.lock().headers.append(name, value);
    }

    /// Set the response body.
    pub fn write_body(&self, body: Bytes) {
        self.lock().body = body;
    }

    /// Flush the accumulated response to the suspended connection and
    /// release it.
    ///
    /// Returns `false` when the connection is already gone (client
    /// disconnected or the capability was resumed before).
    pub fn resume(&self) -> bool {
        let (sender, response) = {
            let mut state = self.lock();
            let Some(sender) = state.sender.take() else {
                return false;
            };
            let mut response = Response::new(Body::from(std::mem::take(&mut state.body)));
            *response.status_mut() = state.status;
            *response.headers_mut() = std::mem::take(&mut state.headers);
            (sender, response)
        };
        sender.send(response).is_ok()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ResponseState> {
        self.state.lock().expect("suspended response mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resume_delivers_accumulated_response() {
        let (suspended, rx) = SuspendedResponse::suspend();
        suspended.set_status(StatusCode::CREATED);
        suspended.insert_header(
            HeaderName::from_static("x-flow"),
            HeaderValue::from_static("abc"),
        );
        suspended.write_body(Bytes::from_static(b"Hello"));

        assert!(suspended.resume());

        let response = rx.await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get("x-flow").unwrap(), "abc");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Hello");
    }

    #[tokio::test]
    async fn second_resume_is_rejected() {
        let (suspended, _rx) = SuspendedResponse::suspend();
        assert!(suspended.resume());
        assert!(!suspended.resume());
    }

    #[tokio::test]
    async fn resume_after_client_disconnect_reports_failure() {
        let (suspended, rx) = SuspendedResponse::suspend();
        drop(rx);
        assert!(!suspended.resume());
    }

    #[tokio::test]
    async fn dropping_the_capability_wakes_the_receiver() {
        let (suspended, rx) = SuspendedResponse::suspend();
        drop(suspended);
        assert!(rx.await.is_err());
    }
}
