//! Broker connection set
//!
//! Owns one [`Connection`] per broker a vehicle publishes to. Responsibilities:
//! - reject duplicate broker names at registration
//! - open every connection without blocking and reopen the ones that failed
//! - report readiness (every connection `Connected`) and wake waiters on change
//! - allocate correlation ids and record each publish in the vehicle's
//!   [`AckTracker`] before the bytes reach the transport, so an
//!   acknowledgement can never overtake its own record

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::{BrokerDescriptor, Connection, Connector};
use crate::delivery::{AckTracker, CorrelationId, InFlightPublish};
use crate::routing::encode_payload;
use crate::utils::{FleetError, Result};

pub struct ConnectionSet {
    owner: Arc<str>,
    connections: Vec<Connection>,
    connector: Arc<dyn Connector>,
    tracker: Arc<AckTracker>,
    readiness: Arc<Notify>,
    next_correlation_id: AtomicU64,
}

impl std::fmt::Debug for ConnectionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSet")
            .field("owner", &self.owner)
            .field("connections", &self.connections)
            .field("in_flight", &self.tracker.len())
            .finish()
    }
}

impl ConnectionSet {
    pub fn new(owner: &str, connector: Arc<dyn Connector>, tracker: Arc<AckTracker>) -> Self {
        Self {
            owner: Arc::from(owner),
            connections: Vec::new(),
            connector,
            tracker,
            readiness: Arc::new(Notify::new()),
            next_correlation_id: AtomicU64::new(1),
        }
    }

    /// Register a broker. Names are unique within a set.
    pub fn add(&mut self, descriptor: BrokerDescriptor) -> Result<()> {
        if self.connections.iter().any(|c| c.name() == descriptor.name) {
            return Err(FleetError::DuplicateBroker(descriptor.name));
        }
        debug!(vehicle = %self.owner, broker = %descriptor.name, host = %descriptor.host, port = descriptor.port, "broker registered");
        self.connections.push(Connection::new(descriptor));
        Ok(())
    }

    /// Open every connection that has no transport yet and return the number
    /// opened. Never waits for a broker; failures are logged and retried on
    /// the next call.
    pub fn connect_all(&mut self) -> usize {
        let mut opened = 0;
        for connection in &mut self.connections {
            if connection.is_open() {
                continue;
            }

            let link = connection.link(
                self.owner.clone(),
                self.tracker.clone(),
                self.readiness.clone(),
            );
            match connection.open(self.connector.as_ref(), link) {
                Ok(()) => {
                    let descriptor = connection.descriptor();
                    info!(vehicle = %self.owner, broker = %descriptor.name, host = %descriptor.host, port = descriptor.port, "connecting");
                    opened += 1;
                }
                Err(err) => {
                    warn!(vehicle = %self.owner, broker = %connection.name(), error = %err, "could not open connection; will retry");
                }
            }
        }
        opened
    }

    /// Every registered connection is `Connected`. An empty set is never ready.
    pub fn all_ready(&self) -> bool {
        !self.connections.is_empty() && self.connections.iter().all(Connection::is_connected)
    }

    pub fn get(&self, name: &str) -> Result<&Connection> {
        self.connections
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| FleetError::BrokerNotFound(name.to_string()))
    }

    /// Hand `payload` to the named broker's transport and return its
    /// correlation id without waiting for the acknowledgement.
    pub fn publish(&self, name: &str, topic: &str, payload: &Value) -> Result<CorrelationId> {
        let connection = self.get(name)?;
        if !connection.is_connected() {
            return Err(FleetError::NotConnected(name.to_string()));
        }

        let bytes = encode_payload(topic, payload)?;

        let correlation_id = self.next_correlation_id.fetch_add(1, Ordering::Relaxed);
        self.tracker.record(InFlightPublish::new(
            correlation_id,
            name,
            topic,
            payload.clone(),
        ));

        if let Err(err) = connection.publish(topic, bytes, correlation_id) {
            self.tracker.report_lost(correlation_id, &err.to_string());
            return Err(err);
        }

        Ok(correlation_id)
    }

    /// Disconnect every connection. Safe to call more than once.
    pub fn disconnect_all(&mut self) {
        for connection in &mut self.connections {
            if connection.is_open() {
                info!(vehicle = %self.owner, broker = %connection.name(), "disconnecting");
            }
            connection.disconnect();
        }
        self.readiness.notify_waiters();
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connections.iter().map(Connection::name)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn tracker(&self) -> &Arc<AckTracker> {
        &self.tracker
    }

    /// Notified whenever any connection changes state.
    pub fn readiness(&self) -> Arc<Notify> {
        self.readiness.clone()
    }
}
