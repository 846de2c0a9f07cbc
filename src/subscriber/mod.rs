//! Topic subscriber
//!
//! Connects to one broker, subscribes to one topic and prints every payload it
//! receives until cancelled, then unsubscribes and disconnects cleanly.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Outgoing, Packet, QoS, SubscribeReasonCode};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::utils::Result;

const RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberOptions {
    pub topic: String,
    pub host: String,
    pub port: u16,
    pub keep_alive: Duration,
}

impl SubscriberOptions {
    pub fn new(topic: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            topic: topic.into(),
            host: host.into(),
            port,
            keep_alive: Duration::from_secs(60),
        }
    }
}

/// Render a payload for display. Invalid UTF-8 sequences become U+FFFD.
pub fn render_payload(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).into_owned()
}

/// Subscribe until `shutdown` flips to `true`. Returns the number of messages
/// received.
pub async fn run(options: SubscriberOptions, mut shutdown: watch::Receiver<bool>) -> Result<u64> {
    let client_id = format!("subscriber-{}", uuid::Uuid::new_v4().simple());
    let mut mqtt = MqttOptions::new(client_id, options.host.clone(), options.port);
    mqtt.set_keep_alive(options.keep_alive.max(Duration::from_secs(5)));
    mqtt.set_clean_session(true);

    let (client, mut eventloop) = AsyncClient::new(mqtt, 16);
    let mut received = 0u64;
    let mut stopping = false;

    loop {
        let event = tokio::select! {
            _ = shutdown.wait_for(|stop| *stop), if !stopping => {
                stopping = true;
                info!(topic = %options.topic, "unsubscribing");
                if client.try_unsubscribe(options.topic.clone()).is_err()
                    && client.try_disconnect().is_err()
                {
                    break;
                }
                continue;
            }
            event = eventloop.poll() => event,
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!(host = %options.host, port = options.port, "connected");
                if !stopping {
                    if let Err(err) = client.try_subscribe(options.topic.clone(), QoS::AtLeastOnce) {
                        warn!(topic = %options.topic, error = %err, "subscribe request failed");
                    }
                }
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                for code in ack.return_codes {
                    match code {
                        SubscribeReasonCode::Success(qos) => {
                            info!(topic = %options.topic, ?qos, "subscribed")
                        }
                        SubscribeReasonCode::Failure => {
                            warn!(topic = %options.topic, "subscription rejected")
                        }
                    }
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                received += 1;
                debug!(topic = %publish.topic, bytes = publish.payload.len(), "message");
                println!("Received: {}", render_payload(&publish.payload));
            }
            Ok(Event::Incoming(Packet::UnsubAck(_))) => {
                info!(topic = %options.topic, "unsubscribed");
                if client.try_disconnect().is_err() {
                    break;
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
            Ok(_) => {}
            Err(err) => {
                if stopping {
                    break;
                }
                warn!(host = %options.host, port = options.port, error = %err, "connection error; retrying");
                tokio::select! {
                    _ = shutdown.wait_for(|stop| *stop) => {
                        break;
                    }
                    _ = tokio::time::sleep(RETRY_DELAY) => {}
                }
            }
        }
    }

    info!(received, "subscriber stopped");
    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::{SubscriberOptions, render_payload};

    #[test]
    fn test_render_payload_utf8_and_lossy() {
        assert_eq!(render_payload(br#"{"lat":53.3}"#), r#"{"lat":53.3}"#);
        assert_eq!(render_payload(&[0x66, 0xff, 0x6f]), "f\u{fffd}o");
    }

    #[test]
    fn test_options_default_keep_alive() {
        let options = SubscriberOptions::new("fleet/gps", "localhost", 1883);
        assert_eq!(options.keep_alive.as_secs(), 60);
        assert_eq!(options.topic, "fleet/gps");
    }
}
