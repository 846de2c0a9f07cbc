//! Transport seam
//!
//! A [`Connector`] opens one [`Transport`] per broker. The transport runs its
//! own background dispatch activity and reports connection and acknowledgement
//! events through the [`LinkEvents`](super::LinkEvents) handle it was opened
//! with; `publish` only queues bytes and never waits for the broker.

use super::{BrokerDescriptor, LinkEvents};
use crate::delivery::CorrelationId;
use crate::utils::Result;

pub trait Transport: Send + Sync {
    /// Queue `payload` for delivery. The acknowledgement for `correlation_id`
    /// arrives later through `LinkEvents::on_publish`.
    fn publish(&self, topic: &str, payload: Vec<u8>, correlation_id: CorrelationId) -> Result<()>;

    /// Request a clean disconnect and stop reconnecting.
    fn disconnect(&self);
}

pub trait Connector: Send + Sync {
    /// Start connecting to `descriptor`. Must return without waiting for the
    /// broker; the outcome is reported through `link`.
    fn open(&self, descriptor: &BrokerDescriptor, link: LinkEvents) -> Result<Box<dyn Transport>>;
}
