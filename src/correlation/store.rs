//! Correlation store bridging the ingest and completion stages.
//!
//! The two stages share no call stack or memory reference; the only bond
//! between an emitted work unit and its suspended connection is the
//! correlation identifier minted at ingest time and resolved here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::http::exchange::SuspendedResponse;
use crate::observability::metrics;

/// Opaque token binding an ingested work unit to its suspended connection.
///
/// Minted once per ingested exchange; textual form of a 128-bit random
/// identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Mint a fresh, globally unique identifier.
    pub fn mint() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Invariant violations surfaced by the store.
#[derive(Debug, Error)]
pub enum CorrelationError {
    /// An identifier was registered twice. Identifiers are minted fresh
    /// per exchange, so this indicates a defect, not a runtime condition.
    #[error("exchange already registered with identifier {0}")]
    DuplicateIdentifier(CorrelationId),

    /// A completion referenced an identifier that is not registered:
    /// either never registered, or already completed.
    #[error("no exchange registered with identifier {0}")]
    UnknownIdentifier(CorrelationId),
}

struct RegisteredExchange {
    response: Arc<SuspendedResponse>,
    registered_at: Instant,
}

/// Concurrent map from correlation identifiers to suspended connections.
///
/// Each identifier passes through at most one successful `register` and at
/// most one successful `complete`; both operations are atomic and safe
/// under arbitrary concurrent callers.
#[derive(Default)]
pub struct CorrelationStore {
    entries: DashMap<CorrelationId, RegisteredExchange>,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a suspended connection under `id`.
    ///
    /// Insert-if-absent: a duplicate identifier fails without touching
    /// the existing entry.
    pub fn register(
        &self,
        id: CorrelationId,
        response: Arc<SuspendedResponse>,
    ) -> Result<(), CorrelationError> {
        match self.entries.entry(id) {
            Entry::Occupied(occupied) => {
                Err(CorrelationError::DuplicateIdentifier(occupied.key().clone()))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(RegisteredExchange {
                    response,
                    registered_at: Instant::now(),
                });
                metrics::record_outstanding(self.entries.len());
                Ok(())
            }
        }
    }

    /// Look up the suspended connection for `id` without removing it.
    ///
    /// Used by the completion stage to write outcome data before
    /// finalizing.
    pub fn lookup(&self, id: &CorrelationId) -> Option<Arc<SuspendedResponse>> {
        self.entries.get(id).map(|entry| entry.response.clone())
    }

    /// Remove the entry for `id` and resume its connection.
    ///
    /// Remove-if-present: completing an identifier that is not registered
    /// fails explicitly; silently ignoring it would mask a duplicate
    /// completion or a caller race.
    pub fn complete(&self, id: &CorrelationId) -> Result<(), CorrelationError> {
        let (id, exchange) = self
            .entries
            .remove(id)
            .ok_or_else(|| CorrelationError::UnknownIdentifier(id.clone()))?;

        if !exchange.response.resume() {
            tracing::warn!(context_id = %id, "Client disconnected before completion");
        }
        metrics::record_outstanding(self.entries.len());
        Ok(())
    }

    /// Number of registered-but-not-completed exchanges.
    ///
    /// A count that grows without bound indicates leaked suspended
    /// connections.
    pub fn outstanding(&self) -> usize {
        self.entries.len()
    }

    /// Expire entries registered longer than `max_age` ago.
    ///
    /// Each expired connection is resumed with 503 so the client is not
    /// held open forever by an abandoned downstream pipeline. Returns the
    /// expired identifiers.
    pub fn reap_expired(&self, max_age: Duration) -> Vec<CorrelationId> {
        let expired: Vec<CorrelationId> = self
            .entries
            .iter()
            .filter(|entry| entry.registered_at.elapsed() >= max_age)
            .map(|entry| entry.key().clone())
            .collect();

        let mut reaped = Vec::with_capacity(expired.len());
        for id in expired {
            // A racing complete may have removed the entry already.
            let Some((id, exchange)) = self
                .entries
                .remove_if(&id, |_, entry| entry.registered_at.elapsed() >= max_age)
            else {
                continue;
            };
            exchange.response.set_status(StatusCode::SERVICE_UNAVAILABLE);
            exchange.response.resume();
            tracing::warn!(context_id = %id, "Expired suspended exchange");
            reaped.push(id);
        }

        if !reaped.is_empty() {
            metrics::record_expired(reaped.len());
            metrics::record_outstanding(self.entries.len());
        }
        reaped
    }
}
