use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::{DriverReport, DriverSettings, DriverState, PublishMode};
use crate::broker::ConnectionSet;
use crate::delivery::{AckTracker, CorrelationId};
use crate::routing::{RoutedMessage, build_routes};
use crate::utils::{FleetError, Result};
use crate::vehicle::TelemetrySource;

enum AckOutcome {
    Settled,
    TimedOut,
    Interrupted,
}

/// Resolves once shutdown has been requested. A dropped sender counts as a
/// request.
async fn interrupted(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn await_ack(
    tracker: Arc<AckTracker>,
    correlation_id: CorrelationId,
    timeout: Option<Duration>,
    shutdown: &mut watch::Receiver<bool>,
) -> AckOutcome {
    let settled = async {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, tracker.wait_for(correlation_id))
                .await
                .is_ok(),
            None => {
                tracker.wait_for(correlation_id).await;
                true
            }
        }
    };

    tokio::select! {
        biased;
        _ = interrupted(shutdown) => AckOutcome::Interrupted,
        settled = settled => if settled { AckOutcome::Settled } else { AckOutcome::TimedOut },
    }
}

pub struct PublishingDriver<S: TelemetrySource> {
    vehicle_id: String,
    source: S,
    connections: ConnectionSet,
    settings: DriverSettings,
    shutdown: watch::Receiver<bool>,
    state: watch::Sender<DriverState>,
    report: DriverReport,
}

impl<S: TelemetrySource> PublishingDriver<S> {
    /// Fails with `UnknownBroker` if the source's fan-out table names a broker
    /// the connection set does not hold.
    pub fn new(
        source: S,
        connections: ConnectionSet,
        settings: DriverSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        source.fan_out_table().validate(connections.names())?;
        let (state, _) = watch::channel(DriverState::Idle);
        Ok(Self {
            vehicle_id: source.identity().id.clone(),
            source,
            connections,
            settings,
            shutdown,
            state,
            report: DriverReport::default(),
        })
    }

    pub fn state(&self) -> DriverState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<DriverState> {
        self.state.subscribe()
    }

    pub fn connections(&self) -> &ConnectionSet {
        &self.connections
    }

    pub async fn run(mut self) -> DriverReport {
        self.set_state(DriverState::Connecting);
        self.connections.connect_all();

        self.set_state(DriverState::AwaitingReady);
        if self.await_ready().await {
            self.set_state(DriverState::Running);
            self.publish_cycles().await;
        }

        self.set_state(DriverState::ShuttingDown);
        let tracker = self.connections.tracker();
        let stats = tracker.stats();
        self.report.acknowledged = stats.acknowledged;
        self.report.lost = stats.lost;
        self.report.in_flight = tracker.len() as u64;
        self.connections.disconnect_all();
        self.set_state(DriverState::Stopped);
        info!(vehicle = %self.vehicle_id, report = %self.report, "driver stopped");
        self.report
    }

    fn set_state(&self, state: DriverState) {
        debug!(vehicle = %self.vehicle_id, %state, "driver state");
        self.state.send_replace(state);
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Returns `false` if cancelled before every connection came up.
    async fn await_ready(&mut self) -> bool {
        let readiness = self.connections.readiness();
        loop {
            let changed = readiness.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            if self.connections.all_ready() {
                info!(vehicle = %self.vehicle_id, brokers = self.connections.len(), "all brokers connected");
                return true;
            }

            tokio::select! {
                biased;
                _ = interrupted(&mut self.shutdown) => {
                    self.set_state(DriverState::Interrupted);
                    return false;
                }
                _ = &mut changed => {}
                _ = tokio::time::sleep(self.settings.ready_poll) => {
                    self.connections.connect_all();
                }
            }
        }
    }

    async fn publish_cycles(&mut self) {
        loop {
            if self.shutdown_requested() {
                self.set_state(DriverState::Interrupted);
                return;
            }

            if !self.publish_cycle().await {
                self.set_state(DriverState::Interrupted);
                return;
            }
            self.report.cycles += 1;

            if self
                .settings
                .max_cycles
                .is_some_and(|max| self.report.cycles >= max)
            {
                return;
            }

            tokio::select! {
                biased;
                _ = interrupted(&mut self.shutdown) => {
                    self.set_state(DriverState::Interrupted);
                    return;
                }
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }
    }

    /// One snapshot through the whole table. Returns `false` if cancelled
    /// part way.
    async fn publish_cycle(&mut self) -> bool {
        let snapshot = self.source.collect_data();
        let messages = match build_routes(
            &snapshot,
            self.source.identity(),
            self.source.fan_out_table(),
        ) {
            Ok(messages) => messages,
            Err(err) => {
                error!(vehicle = %self.vehicle_id, error = %err, "could not build messages; skipping cycle");
                self.report.failed += self.source.fan_out_table().len() as u64;
                return true;
            }
        };

        for message in &messages {
            if self.shutdown_requested() {
                return false;
            }

            let correlation_id = match self.connections.publish(
                &message.broker_name,
                &message.topic,
                &message.payload,
            ) {
                Ok(id) => id,
                Err(err) => {
                    self.publish_failed(message, &err);
                    continue;
                }
            };
            self.report.published += 1;
            debug!(vehicle = %self.vehicle_id, broker = %message.broker_name, topic = %message.topic, correlation_id, "published");

            if self.settings.mode == PublishMode::Serialized {
                let tracker = self.connections.tracker().clone();
                match await_ack(
                    tracker.clone(),
                    correlation_id,
                    self.settings.ack_timeout,
                    &mut self.shutdown,
                )
                .await
                {
                    AckOutcome::Settled => {}
                    AckOutcome::TimedOut => {
                        warn!(vehicle = %self.vehicle_id, broker = %message.broker_name, topic = %message.topic, correlation_id, "no acknowledgement in time");
                        tracker.report_lost(correlation_id, "acknowledgement timed out");
                    }
                    AckOutcome::Interrupted => return false,
                }
            }
        }

        if self.settings.mode == PublishMode::Concurrent {
            if let Some(limit) = self.settings.ack_timeout {
                let expired = self.connections.tracker().expire(limit);
                if !expired.is_empty() {
                    warn!(vehicle = %self.vehicle_id, count = expired.len(), "expired unacknowledged publishes");
                }
            }
        }

        true
    }

    fn publish_failed(&mut self, message: &RoutedMessage, err: &FleetError) {
        self.report.failed += 1;
        match err {
            FleetError::NotConnected(_) | FleetError::BrokerNotFound(_) => {
                error!(vehicle = %self.vehicle_id, broker = %message.broker_name, topic = %message.topic, error = %err, "publish skipped");
            }
            _ => {
                warn!(vehicle = %self.vehicle_id, broker = %message.broker_name, topic = %message.topic, error = %err, "publish failed");
            }
        }
    }
}
