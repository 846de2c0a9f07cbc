use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{now_timestamp, sensor_id};
use crate::telemetry::{Sample, TemperatureReading};

const DEFAULT_RANGE: Range<f64> = 105.0..120.0;

/// Temperature sensor mounted at `location` (e.g. `cargo`).
#[derive(Debug)]
pub struct Thermistor {
    id: String,
    location: String,
    range: Range<f64>,
    rng: StdRng,
}

impl Thermistor {
    pub fn new(location: &str) -> Self {
        Self::with_range(location, DEFAULT_RANGE)
    }

    pub fn with_range(location: &str, range: Range<f64>) -> Self {
        Self {
            id: sensor_id(),
            location: location.to_string(),
            range,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn read(&mut self) -> TemperatureReading {
        TemperatureReading {
            id: self.id.clone(),
            timestamp: now_timestamp(),
            temperature: Sample::from_f64(self.rng.gen_range(self.range.clone())),
            unit: "Celsius".to_string(),
            location: self.location.clone(),
        }
    }
}
