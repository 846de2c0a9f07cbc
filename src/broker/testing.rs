//! In-memory connector for exercising connection sets and the publishing
//! driver without a broker. Tests decide when each broker connects, drops
//! or acknowledges.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use super::{BrokerDescriptor, Connector, LinkEvents, Transport};
use crate::delivery::CorrelationId;
use crate::utils::{FleetError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub broker: String,
    pub topic: String,
    pub payload: Value,
    pub correlation_id: CorrelationId,
}

#[derive(Debug, Default)]
struct Script {
    links: HashMap<String, LinkEvents>,
    opened: HashMap<String, usize>,
    fail_open: HashSet<String>,
    published: Vec<Published>,
    disconnected: Vec<String>,
    auto_ack: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acknowledge every publish as soon as it is handed over.
    pub fn auto_ack() -> Self {
        let connector = Self::default();
        connector.lock().auto_ack = true;
        connector
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    fn link(&self, broker: &str) -> LinkEvents {
        self.lock()
            .links
            .get(broker)
            .cloned()
            .unwrap_or_else(|| panic!("broker `{broker}` was never opened"))
    }

    pub fn connect(&self, broker: &str) {
        self.link(broker).on_connect();
    }

    pub fn refuse(&self, broker: &str) {
        self.link(broker).on_disconnect("connection refused");
    }

    pub fn ack(&self, broker: &str, correlation_id: CorrelationId) {
        self.link(broker).on_publish(correlation_id, Ok(()));
    }

    pub fn lose(&self, broker: &str, correlation_id: CorrelationId) {
        self.link(broker)
            .on_publish(correlation_id, Err("dropped".to_string()));
    }

    pub fn fail_open(&self, broker: &str, fail: bool) {
        let mut script = self.lock();
        if fail {
            script.fail_open.insert(broker.to_string());
        } else {
            script.fail_open.remove(broker);
        }
    }

    pub fn opened(&self, broker: &str) -> usize {
        self.lock().opened.get(broker).copied().unwrap_or(0)
    }

    pub fn published(&self) -> Vec<Published> {
        self.lock().published.clone()
    }

    pub fn disconnected(&self) -> Vec<String> {
        self.lock().disconnected.clone()
    }
}

impl Connector for ScriptedConnector {
    fn open(&self, descriptor: &BrokerDescriptor, link: LinkEvents) -> Result<Box<dyn Transport>> {
        let mut script = self.lock();
        if script.fail_open.contains(&descriptor.name) {
            return Err(FleetError::Connect {
                broker: descriptor.name.clone(),
                reason: "scripted failure".to_string(),
            });
        }
        *script.opened.entry(descriptor.name.clone()).or_default() += 1;
        script.links.insert(descriptor.name.clone(), link.clone());

        Ok(Box::new(ScriptedTransport {
            broker: descriptor.name.clone(),
            link,
            script: self.script.clone(),
        }))
    }
}

struct ScriptedTransport {
    broker: String,
    link: LinkEvents,
    script: Arc<Mutex<Script>>,
}

impl Transport for ScriptedTransport {
    fn publish(&self, topic: &str, payload: Vec<u8>, correlation_id: CorrelationId) -> Result<()> {
        let payload: Value = serde_json::from_slice(&payload).unwrap();
        let auto_ack = {
            let mut script = self.script.lock().unwrap();
            script.published.push(Published {
                broker: self.broker.clone(),
                topic: topic.to_string(),
                payload,
                correlation_id,
            });
            script.auto_ack
        };
        if auto_ack {
            self.link.on_publish(correlation_id, Ok(()));
        }
        Ok(())
    }

    fn disconnect(&self) {
        self.script
            .lock()
            .unwrap()
            .disconnected
            .push(self.broker.clone());
    }
}
