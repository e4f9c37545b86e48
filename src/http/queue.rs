//! Bounded admission queue between the listener and the ingest stage.
//!
//! # Responsibilities
//! - Hold one entry per accepted-but-not-yet-ingested request
//! - Enforce the configured capacity (backpressure)
//! - Never block: the listener thread and the scheduler tick both return
//!   promptly whether or not the queue can serve them

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::http::exchange::PendingExchange;
use crate::observability::metrics;

/// Fixed-capacity FIFO of admitted exchanges.
///
/// Capacity bounding is the sole defense against unbounded memory growth
/// when the downstream pipeline stalls.
pub struct AdmissionQueue {
    entries: Mutex<VecDeque<PendingExchange>>,
    capacity: usize,
}

impl AdmissionQueue {
    /// Create a queue with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Enqueue an exchange, unless the queue is at capacity.
    ///
    /// Non-blocking. On rejection the exchange is handed back so the
    /// caller can terminate the connection with 503.
    pub fn offer(&self, exchange: PendingExchange) -> Result<(), PendingExchange> {
        let mut entries = self.lock();
        if entries.len() >= self.capacity {
            return Err(exchange);
        }
        entries.push_back(exchange);
        metrics::record_queue_depth(entries.len());
        Ok(())
    }

    /// Dequeue the oldest exchange, if any. Non-blocking.
    pub fn poll(&self) -> Option<PendingExchange> {
        let mut entries = self.lock();
        let exchange = entries.pop_front();
        if exchange.is_some() {
            metrics::record_queue_depth(entries.len());
        }
        exchange
    }

    /// Instantaneous number of queued exchanges.
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<PendingExchange>> {
        self.entries.lock().expect("admission queue mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::exchange::{PeerInfo, RequestHead, SuspendedResponse};
    use axum::body::Body;
    use axum::http::{HeaderMap, Method, Uri};

    fn exchange(path: &str) -> PendingExchange {
        let (response, _rx) = SuspendedResponse::suspend();
        // The receiver is dropped; these exchanges are never resumed.
        PendingExchange {
            head: RequestHead {
                method: Method::PUT,
                uri: path.parse::<Uri>().unwrap(),
                headers: HeaderMap::new(),
            },
            peer: PeerInfo::default(),
            body: Body::empty(),
            response,
        }
    }

    #[tokio::test]
    async fn offer_and_poll_preserve_fifo_order() {
        let queue = AdmissionQueue::new(3);
        queue.offer(exchange("/a")).unwrap_or_else(|_| panic!("offer failed"));
        queue.offer(exchange("/b")).unwrap_or_else(|_| panic!("offer failed"));

        assert_eq!(queue.size(), 2);
        assert_eq!(queue.poll().unwrap().head.uri.path(), "/a");
        assert_eq!(queue.poll().unwrap().head.uri.path(), "/b");
        assert!(queue.poll().is_none());
    }

    #[tokio::test]
    async fn offer_fails_at_capacity_and_hands_back_the_exchange() {
        let queue = AdmissionQueue::new(1);
        assert!(queue.offer(exchange("/a")).is_ok());

        let rejected = queue.offer(exchange("/b")).unwrap_err();
        assert_eq!(rejected.head.uri.path(), "/b");
        assert_eq!(queue.size(), 1);
    }

    #[tokio::test]
    async fn size_never_exceeds_capacity_under_concurrent_offers() {
        use std::sync::Arc;

        let queue = Arc::new(AdmissionQueue::new(5));
        let mut handles = Vec::new();
        for i in 0..20 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                queue.offer(exchange(&format!("/{i}"))).is_ok()
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 5);
        assert_eq!(queue.size(), 5);
    }
}
