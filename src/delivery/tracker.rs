//! Acknowledgement tracker
//!
//! One tracker per vehicle, shared by every broker connection of that vehicle.
//! It is written from the publishing task (record) and from each transport's
//! dispatch task (resolve, report_lost), so all state sits behind one mutex and
//! waiters are woken through a `Notify`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{info, warn};

pub type CorrelationId = u64;

/// A publish handed to a transport whose acknowledgement has not arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct InFlightPublish {
    pub correlation_id: CorrelationId,
    pub broker: String,
    pub topic: String,
    pub payload: Value,
    pub issued_at: Instant,
}

impl InFlightPublish {
    pub fn new(
        correlation_id: CorrelationId,
        broker: impl Into<String>,
        topic: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            correlation_id,
            broker: broker.into(),
            topic: topic.into(),
            payload,
            issued_at: Instant::now(),
        }
    }
}

/// Running totals since the tracker was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub recorded: u64,
    pub acknowledged: u64,
    pub lost: u64,
}

#[derive(Debug, Default)]
struct Inner {
    in_flight: HashMap<CorrelationId, InFlightPublish>,
    stats: DeliveryStats,
}

#[derive(Debug, Default)]
pub struct AckTracker {
    inner: Mutex<Inner>,
    settled: Notify,
}

impl AckTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remember an outstanding publish. Recording an id twice replaces the
    /// earlier entry.
    pub fn record(&self, publish: InFlightPublish) {
        let mut inner = self.lock();
        inner.stats.recorded += 1;
        if let Some(previous) = inner.in_flight.insert(publish.correlation_id, publish) {
            warn!(
                correlation_id = previous.correlation_id,
                broker = %previous.broker,
                topic = %previous.topic,
                "correlation id reused; replacing in-flight entry"
            );
        }
    }

    /// The broker acknowledged `correlation_id`. Returns the payload that was
    /// delivered, or `None` for an id that is not in flight.
    pub fn resolve(&self, correlation_id: CorrelationId) -> Option<Value> {
        let removed = {
            let mut inner = self.lock();
            let removed = inner.in_flight.remove(&correlation_id);
            if removed.is_some() {
                inner.stats.acknowledged += 1;
            }
            removed
        };

        let result = match removed {
            Some(publish) => {
                info!(
                    correlation_id,
                    broker = %publish.broker,
                    topic = %publish.topic,
                    payload = %publish.payload,
                    "acknowledged"
                );
                Some(publish.payload)
            }
            None => {
                warn!(correlation_id, "acknowledgement for unknown publish; not found");
                None
            }
        };
        self.settled.notify_waiters();
        result
    }

    /// The transport gave up on `correlation_id`, or the caller stopped
    /// waiting for it.
    pub fn report_lost(&self, correlation_id: CorrelationId, reason: &str) -> Option<InFlightPublish> {
        let removed = {
            let mut inner = self.lock();
            let removed = inner.in_flight.remove(&correlation_id);
            if removed.is_some() {
                inner.stats.lost += 1;
            }
            removed
        };

        if let Some(publish) = &removed {
            warn!(
                correlation_id,
                broker = %publish.broker,
                topic = %publish.topic,
                %reason,
                "publish lost"
            );
        }
        self.settled.notify_waiters();
        removed
    }

    /// Drop every entry older than `max_age` and report it lost.
    pub fn expire(&self, max_age: Duration) -> Vec<InFlightPublish> {
        let now = Instant::now();
        let expired: Vec<CorrelationId> = self
            .lock()
            .in_flight
            .values()
            .filter(|p| now.saturating_duration_since(p.issued_at) >= max_age)
            .map(|p| p.correlation_id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| self.report_lost(id, "acknowledgement timed out"))
            .collect()
    }

    pub fn is_pending(&self, correlation_id: CorrelationId) -> bool {
        self.lock().in_flight.contains_key(&correlation_id)
    }

    pub fn len(&self) -> usize {
        self.lock().in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().in_flight.is_empty()
    }

    pub fn stats(&self) -> DeliveryStats {
        self.lock().stats
    }

    /// Resolves once `correlation_id` is no longer in flight, whether it was
    /// acknowledged or lost.
    pub async fn wait_for(&self, correlation_id: CorrelationId) {
        loop {
            let settled = self.settled.notified();
            tokio::pin!(settled);
            settled.as_mut().enable();
            if !self.is_pending(correlation_id) {
                return;
            }
            settled.await;
        }
    }
}
