use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{now_timestamp, sensor_id};
use crate::telemetry::{PressureReading, Sample};

/// Trailer air-brake line pressure, kPa.
const TRAILER_RANGE: Range<f64> = 600.0..850.0;

#[derive(Debug)]
pub struct PressureSensor {
    id: String,
    location: String,
    range: Range<f64>,
    rng: StdRng,
}

impl PressureSensor {
    pub fn trailer() -> Self {
        Self::new("trailer", TRAILER_RANGE)
    }

    pub fn new(location: &str, range: Range<f64>) -> Self {
        Self {
            id: sensor_id(),
            location: location.to_string(),
            range,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn read(&mut self) -> PressureReading {
        PressureReading {
            id: self.id.clone(),
            timestamp: now_timestamp(),
            pressure: Sample::from_f64(self.rng.gen_range(self.range.clone())),
            unit: "kPa".to_string(),
            location: self.location.clone(),
        }
    }
}
