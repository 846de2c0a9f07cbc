use serde_json::Value;

use super::table::{FanOutTable, View};
use crate::telemetry::{ClassReading, TelemetrySnapshot};
use crate::utils::{FleetError, Result};
use crate::vehicle::VehicleIdentity;

/// One publish: a payload bound to a broker and topic.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedMessage {
    pub broker_name: String,
    pub topic: String,
    pub payload: Value,
}

/// Serialize a payload to the bytes sent on `topic`.
pub fn encode_payload(topic: &str, payload: &Value) -> Result<Vec<u8>> {
    serde_json::to_vec(payload).map_err(|source| FleetError::Encode {
        topic: topic.to_string(),
        source,
    })
}

/// Fan a snapshot out into the messages `table` describes, in table order.
///
/// Every payload is its own value: tagging the GPS view with `vehicle_id`
/// leaves the GPS object inside the full-data payloads untouched.
pub fn build_routes(
    snapshot: &TelemetrySnapshot,
    identity: &VehicleIdentity,
    table: &FanOutTable,
) -> Result<Vec<RoutedMessage>> {
    let encode = |topic: &str, value: serde_json::Result<Value>| {
        value.map_err(|source| FleetError::Encode {
            topic: topic.to_string(),
            source,
        })
    };

    let mut messages = Vec::with_capacity(table.len());
    for route in table.routes() {
        let topic = route.topic.render(&identity.id);
        let payload = match route.view {
            View::Full => encode(&topic, serde_json::to_value(snapshot))?,
            View::Gps => tag(
                encode(&topic, serde_json::to_value(&snapshot.gps))?,
                &identity.id,
            ),
            View::ClassReading => {
                let reading = match &snapshot.class {
                    ClassReading::CargoTemperature(r) => serde_json::to_value(r),
                    ClassReading::TrailerPressure(r) => serde_json::to_value(r),
                };
                tag(encode(&topic, reading)?, &identity.id)
            }
        };

        messages.push(RoutedMessage {
            broker_name: route.broker.to_string(),
            topic,
            payload,
        });
    }

    Ok(messages)
}

fn tag(mut value: Value, vehicle_id: &str) -> Value {
    if let Value::Object(fields) = &mut value {
        fields.insert("vehicle_id".to_string(), Value::String(vehicle_id.to_string()));
    }
    value
}
