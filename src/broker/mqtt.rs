//! MQTT transport backed by `rumqttc`.
//!
//! Each broker connection gets its own client and event loop task. The task
//! owns all I/O: it reconnects after failures, maps packet ids back to
//! correlation ids and reports every acknowledgement through [`LinkEvents`].

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::{BrokerDescriptor, Connector, LinkEvents, Transport};
use crate::config::Settings;
use crate::delivery::CorrelationId;
use crate::utils::{FleetError, Result};

const MIN_KEEP_ALIVE: Duration = Duration::from_secs(5);
const REQUEST_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct MqttConnector {
    client_prefix: String,
    keep_alive: Duration,
    reconnect_delay: Duration,
    capacity: usize,
}

impl MqttConnector {
    pub fn new(client_prefix: impl Into<String>, settings: &Settings) -> Self {
        Self {
            client_prefix: client_prefix.into(),
            keep_alive: Duration::from_secs(settings.brokers.keep_alive_secs).max(MIN_KEEP_ALIVE),
            reconnect_delay: Duration::from_millis(settings.publisher.reconnect_delay_ms),
            capacity: REQUEST_CAPACITY,
        }
    }

    fn client_id(&self, broker: &str) -> String {
        format!(
            "{}-{}-{}",
            self.client_prefix,
            broker,
            uuid::Uuid::new_v4().simple()
        )
    }
}

impl Connector for MqttConnector {
    fn open(&self, descriptor: &BrokerDescriptor, link: LinkEvents) -> Result<Box<dyn Transport>> {
        let runtime = Handle::try_current().map_err(|e| FleetError::Connect {
            broker: descriptor.name.clone(),
            reason: e.to_string(),
        })?;

        let mut options = MqttOptions::new(
            self.client_id(&descriptor.name),
            descriptor.host.clone(),
            descriptor.port,
        );
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);

        let (client, eventloop) = AsyncClient::new(options, self.capacity);
        let outstanding = Arc::new(Mutex::new(Outstanding::default()));
        let closing = Arc::new(AtomicBool::new(false));

        let task = runtime.spawn(dispatch(
            eventloop,
            link,
            outstanding.clone(),
            closing.clone(),
            self.reconnect_delay,
        ));

        Ok(Box::new(MqttTransport {
            broker: descriptor.name.clone(),
            client,
            outstanding,
            closing,
            task,
        }))
    }
}

/// Correlation ids waiting for a packet id, and packet ids waiting for PUBACK.
///
/// A publish that lands on a packet id still awaiting its PUBACK is held back
/// by the event loop. Its correlation id is parked in `deferred` until the
/// earlier PUBACK frees the packet id.
#[derive(Debug, Default)]
struct Outstanding {
    queued: VecDeque<CorrelationId>,
    by_pkid: HashMap<u16, CorrelationId>,
    collided: HashSet<u16>,
    deferred: HashMap<u16, CorrelationId>,
}

impl Outstanding {
    /// The event loop is holding a publish back until `pkid` is acknowledged.
    fn hold(&mut self, pkid: u16) {
        self.collided.insert(pkid);
    }

    /// Called when the event loop writes a PUBLISH. Retransmits reuse a packet
    /// id that is already mapped.
    fn assign(&mut self, pkid: u16) {
        if self.collided.remove(&pkid) {
            if let Some(id) = self.queued.pop_front() {
                if self.by_pkid.contains_key(&pkid) {
                    self.deferred.insert(pkid, id);
                } else {
                    self.by_pkid.insert(pkid, id);
                }
            }
            return;
        }
        if self.by_pkid.contains_key(&pkid) {
            return;
        }
        if let Some(id) = self.queued.pop_front() {
            self.by_pkid.insert(pkid, id);
        }
    }

    fn acknowledge(&mut self, pkid: u16) -> Option<CorrelationId> {
        let acknowledged = self.by_pkid.remove(&pkid);
        if let Some(next) = self.deferred.remove(&pkid) {
            self.by_pkid.insert(pkid, next);
        }
        acknowledged
    }

    fn drain(&mut self) -> Vec<CorrelationId> {
        let mut ids: Vec<CorrelationId> = self.by_pkid.drain().map(|(_, id)| id).collect();
        ids.extend(self.deferred.drain().map(|(_, id)| id));
        ids.extend(self.queued.drain(..));
        self.collided.clear();
        ids
    }
}

fn lock(outstanding: &Mutex<Outstanding>) -> MutexGuard<'_, Outstanding> {
    outstanding.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct MqttTransport {
    broker: String,
    client: AsyncClient,
    outstanding: Arc<Mutex<Outstanding>>,
    closing: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Transport for MqttTransport {
    fn publish(&self, topic: &str, payload: Vec<u8>, correlation_id: CorrelationId) -> Result<()> {
        // Queue order must match request order, so the lock spans the hand-off.
        let mut outstanding = lock(&self.outstanding);
        outstanding.queued.push_back(correlation_id);
        if let Err(err) = self.client.try_publish(topic, QoS::AtLeastOnce, false, payload) {
            outstanding.queued.pop_back();
            return Err(FleetError::Transport {
                broker: self.broker.clone(),
                reason: err.to_string(),
            });
        }
        Ok(())
    }

    fn disconnect(&self) {
        self.closing.store(true, Ordering::SeqCst);
        if self.client.try_disconnect().is_err() {
            self.task.abort();
        }
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        if !self.closing.load(Ordering::SeqCst) {
            self.task.abort();
        }
    }
}

async fn dispatch(
    mut eventloop: EventLoop,
    link: LinkEvents,
    outstanding: Arc<Mutex<Outstanding>>,
    closing: Arc<AtomicBool>,
    reconnect_delay: Duration,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => link.on_connect(),
            Ok(Event::Incoming(Packet::PubAck(ack))) => {
                let correlation_id = lock(&outstanding).acknowledge(ack.pkid);
                match correlation_id {
                    Some(id) => link.on_publish(id, Ok(())),
                    None => debug!(broker = %link.broker(), pkid = ack.pkid, "PUBACK for unmapped packet id"),
                }
            }
            Ok(Event::Outgoing(Outgoing::Publish(pkid))) => lock(&outstanding).assign(pkid),
            Ok(Event::Outgoing(Outgoing::AwaitAck(pkid))) => {
                debug!(broker = %link.broker(), pkid, "publish held until packet id is acknowledged");
                lock(&outstanding).hold(pkid);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
            Ok(event) => trace!(broker = %link.broker(), ?event, "mqtt event"),
            Err(err) => {
                if closing.load(Ordering::SeqCst) {
                    break;
                }
                link.on_disconnect(&err.to_string());
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }

    let lost = lock(&outstanding).drain();
    for id in lost {
        link.on_publish(id, Err("connection closed before acknowledgement".to_string()));
    }
    link.on_closed();
}

#[cfg(test)]
mod tests {
    use super::Outstanding;

    #[test]
    fn test_outstanding_maps_packet_ids_in_request_order() {
        let mut outstanding = Outstanding::default();
        outstanding.queued.extend([10, 11]);

        outstanding.assign(1);
        outstanding.assign(2);

        assert_eq!(outstanding.acknowledge(2), Some(11));
        assert_eq!(outstanding.acknowledge(1), Some(10));
        assert_eq!(outstanding.acknowledge(1), None);
    }

    #[test]
    fn test_outstanding_ignores_retransmits() {
        let mut outstanding = Outstanding::default();
        outstanding.queued.extend([10, 11]);

        outstanding.assign(1);
        outstanding.assign(1);
        outstanding.assign(2);

        assert_eq!(outstanding.acknowledge(1), Some(10));
        assert_eq!(outstanding.acknowledge(2), Some(11));
    }

    #[test]
    fn test_outstanding_held_publish_takes_freed_packet_id() {
        let mut outstanding = Outstanding::default();
        outstanding.queued.push_back(10);
        outstanding.assign(1);

        outstanding.queued.extend([11, 12]);
        outstanding.hold(1);
        // The held publish goes out before the PUBACK that freed its id.
        outstanding.assign(1);
        assert_eq!(outstanding.acknowledge(1), Some(10));

        outstanding.assign(2);
        assert_eq!(outstanding.acknowledge(2), Some(12));
        assert_eq!(outstanding.acknowledge(1), Some(11));
        assert_eq!(outstanding.acknowledge(1), None);
    }

    #[test]
    fn test_outstanding_held_publish_after_puback() {
        let mut outstanding = Outstanding::default();
        outstanding.queued.push_back(10);
        outstanding.assign(1);

        outstanding.queued.push_back(11);
        outstanding.hold(1);
        assert_eq!(outstanding.acknowledge(1), Some(10));
        outstanding.assign(1);

        assert_eq!(outstanding.acknowledge(1), Some(11));
        assert!(outstanding.drain().is_empty());
    }

    #[test]
    fn test_outstanding_drain_includes_held_publishes() {
        let mut outstanding = Outstanding::default();
        outstanding.queued.extend([10, 11]);
        outstanding.assign(1);
        outstanding.hold(1);
        outstanding.assign(1);

        let mut lost = outstanding.drain();
        lost.sort_unstable();
        assert_eq!(lost, vec![10, 11]);
    }

    #[test]
    fn test_outstanding_drain_returns_everything_unacknowledged() {
        let mut outstanding = Outstanding::default();
        outstanding.queued.extend([1, 2, 3]);
        outstanding.assign(7);

        let mut lost = outstanding.drain();
        lost.sort_unstable();
        assert_eq!(lost, vec![1, 2, 3]);
        assert_eq!(outstanding.acknowledge(7), None);
    }
}
