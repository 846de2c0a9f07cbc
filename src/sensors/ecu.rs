use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::telemetry::{EngineReadings, Sample};

// Steinhart-Hart coefficients for the coolant/intake thermistors.
const SH_A: f64 = 1.009249522e-03;
const SH_B: f64 = 2.378405444e-04;
const SH_C: f64 = 2.019202697e-07;

/// ECU reference voltage, V.
pub const V_REF: f64 = 5.0;
/// Pull-up resistor in series with the thermistor, ohms.
pub const R_PULL_UP: f64 = 10_000.0;

/// Voltage seen by the ECU across a thermistor divider.
#[derive(Debug)]
pub struct VoltageDivider {
    range: Range<f64>,
    rng: StdRng,
}

impl VoltageDivider {
    pub fn new(range: Range<f64>) -> Self {
        Self {
            range,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn voltage(&mut self) -> f64 {
        self.rng.gen_range(self.range.clone())
    }
}

/// Convert a divider voltage to degrees Celsius.
///
/// A reading at (or above) the reference voltage means an open circuit.
pub fn temperature_from_voltage(voltage: f64) -> Sample {
    if voltage >= V_REF || voltage <= 0.0 {
        return Sample::Unavailable;
    }

    let resistance = R_PULL_UP * (voltage / (V_REF - voltage));
    let ln_r = resistance.ln();
    let inv_t = SH_A + SH_B * ln_r + SH_C * ln_r.powi(3);

    Sample::from_f64(1.0 / inv_t - 273.15)
}

/// Vehicle engine control unit. Collects the engine channels published under
/// `engine`.
#[derive(Debug)]
pub struct EngineControlUnit {
    coolant: VoltageDivider,
    intake: VoltageDivider,
    rng: StdRng,
}

impl Default for EngineControlUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineControlUnit {
    pub fn new() -> Self {
        Self {
            // roughly 64..100 C
            coolant: VoltageDivider::new(0.4..1.0),
            // roughly 15..33 C
            intake: VoltageDivider::new(2.0..3.0),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn read(&mut self) -> EngineReadings {
        EngineReadings {
            ect: temperature_from_voltage(self.coolant.voltage()),
            iat: temperature_from_voltage(self.intake.voltage()),
            map: Sample::Value(self.rng.gen_range(20.0..105.0)),
            fuel_press: Sample::Value(self.rng.gen_range(250.0..400.0)),
            oxygen: Sample::Value(self.rng.gen_range(0.1..0.9)),
            vss: Sample::Value(self.rng.gen_range(0.0..120.0)),
        }
    }
}
