//! The `delivery` module tracks publishes between hand-off to a transport and
//! the broker's acknowledgement.

pub mod tracker;

pub use tracker::{AckTracker, CorrelationId, DeliveryStats, InFlightPublish};

#[cfg(test)]
mod tests;
