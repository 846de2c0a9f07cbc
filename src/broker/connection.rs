//! Per-broker connection
//!
//! A `Connection` owns the transport for one broker and a state cell the
//! transport's dispatch task writes through [`LinkEvents`]. The driver only
//! reads the state; it never waits on the transport directly.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Notify, watch};
use tracing::{debug, info, warn};

use super::{BrokerDescriptor, Connector, Transport};
use crate::delivery::{AckTracker, CorrelationId};
use crate::utils::{FleetError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Callbacks for one connection's transport, closed over that connection's
/// identity. Cheap to clone into the transport's background task.
#[derive(Clone)]
pub struct LinkEvents {
    owner: Arc<str>,
    broker: Arc<str>,
    state: Arc<watch::Sender<ConnectionState>>,
    tracker: Arc<AckTracker>,
    readiness: Arc<Notify>,
}

impl fmt::Debug for LinkEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkEvents")
            .field("owner", &self.owner)
            .field("broker", &self.broker)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl LinkEvents {
    pub fn broker(&self) -> &str {
        &self.broker
    }

    /// CONNACK received.
    pub fn on_connect(&self) {
        info!(vehicle = %self.owner, broker = %self.broker, "connected");
        self.set_state(ConnectionState::Connected);
    }

    /// The transport failed to connect or lost its connection. It keeps
    /// retrying on its own.
    pub fn on_disconnect(&self, reason: &str) {
        if *self.state.borrow() == ConnectionState::Connected {
            warn!(vehicle = %self.owner, broker = %self.broker, %reason, "connection lost; retrying");
        } else {
            warn!(vehicle = %self.owner, broker = %self.broker, %reason, "connection refused; retrying");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// The transport's dispatch activity has ended for good.
    pub fn on_closed(&self) {
        debug!(vehicle = %self.owner, broker = %self.broker, "transport closed");
        self.set_state(ConnectionState::Disconnected);
    }

    /// Broker acknowledged (or the transport gave up on) `correlation_id`.
    pub fn on_publish(&self, correlation_id: CorrelationId, result: std::result::Result<(), String>) {
        match result {
            Ok(()) => {
                self.tracker.resolve(correlation_id);
            }
            Err(reason) => {
                self.tracker.report_lost(correlation_id, &reason);
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
        self.readiness.notify_waiters();
    }
}

pub struct Connection {
    descriptor: BrokerDescriptor,
    state: Arc<watch::Sender<ConnectionState>>,
    transport: Option<Box<dyn Transport>>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("descriptor", &self.descriptor)
            .field("state", &self.state())
            .field("open", &self.transport.is_some())
            .finish()
    }
}

impl Connection {
    pub(crate) fn new(descriptor: BrokerDescriptor) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            descriptor,
            state: Arc::new(state),
            transport: None,
        }
    }

    pub fn descriptor(&self) -> &BrokerDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Whether a transport has been opened (it may still be connecting).
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    pub(crate) fn link(
        &self,
        owner: Arc<str>,
        tracker: Arc<AckTracker>,
        readiness: Arc<Notify>,
    ) -> LinkEvents {
        LinkEvents {
            owner,
            broker: Arc::from(self.descriptor.name.as_str()),
            state: self.state.clone(),
            tracker,
            readiness,
        }
    }

    /// Open the transport unless it already is. A failure leaves the
    /// connection `Disconnected` so a later call retries it.
    pub(crate) fn open(&mut self, connector: &dyn Connector, link: LinkEvents) -> Result<()> {
        if self.transport.is_some() {
            return Ok(());
        }

        self.state.send_replace(ConnectionState::Connecting);
        match connector.open(&self.descriptor, link) {
            Ok(transport) => {
                self.transport = Some(transport);
                Ok(())
            }
            Err(err) => {
                self.state.send_replace(ConnectionState::Disconnected);
                Err(err)
            }
        }
    }

    pub(crate) fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        correlation_id: CorrelationId,
    ) -> Result<()> {
        match &self.transport {
            Some(transport) if self.is_connected() => {
                transport.publish(topic, payload, correlation_id)
            }
            _ => Err(FleetError::NotConnected(self.descriptor.name.clone())),
        }
    }

    pub(crate) fn disconnect(&mut self) {
        if let Some(transport) = self.transport.take() {
            transport.disconnect();
        }
        self.state.send_replace(ConnectionState::Disconnected);
    }
}
