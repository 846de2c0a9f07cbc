//! GPS route playback
//!
//! A `Route` is an ordered list of `(lat, lon)` waypoints loaded from
//! `<dir>/<name>-clean.csv` (a header row followed by `lat,lon` lines). When no
//! file exists for a name the built-in routes are consulted.

use std::fs;
use std::path::Path;

use tracing::debug;

use super::{now_timestamp, sensor_id};
use crate::telemetry::{GpsReading, Sample};
use crate::utils::{FleetError, Result};

/// Towns along the N7 between Dublin and Limerick.
const DUBLIN_LIMERICK: &[(f64, f64)] = &[
    (53.3498, -6.2603),
    (53.2159, -6.6669),
    (53.0344, -7.2998),
    (52.9511, -7.8017),
    (52.8619, -8.1967),
    (52.6638, -8.6267),
];

const STEPS_PER_LEG: usize = 40;

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub name: String,
    pub waypoints: Vec<(f64, f64)>,
}

impl Route {
    /// Load `name` from `dir`, falling back to a built-in route.
    pub fn load(dir: &Path, name: &str) -> Result<Self> {
        let path = dir.join(format!("{name}-clean.csv"));
        if path.is_file() {
            let text = fs::read_to_string(&path).map_err(|e| FleetError::RouteFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            debug!(route = name, path = %path.display(), "loading route file");
            return Self::parse(name, &text).map_err(|e| match e {
                FleetError::RouteFile { reason, .. } => FleetError::RouteFile {
                    path: path.display().to_string(),
                    reason,
                },
                other => other,
            });
        }

        Self::builtin(name).ok_or_else(|| FleetError::UnknownRoute(name.to_string()))
    }

    /// Parse CSV text. A first non-empty line that does not start with a
    /// number is treated as the header; columns past the second are ignored.
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let mut waypoints = Vec::new();
        let mut first = true;

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let header_allowed = std::mem::replace(&mut first, false);
            let mut fields = line.split(',').map(str::trim);
            let lat = fields.next().and_then(|f| f.parse::<f64>().ok());
            let lon = fields.next().and_then(|f| f.parse::<f64>().ok());

            match (lat, lon) {
                (Some(lat), Some(lon)) => waypoints.push((lat, lon)),
                _ if header_allowed => continue,
                _ => {
                    return Err(FleetError::RouteFile {
                        path: name.to_string(),
                        reason: format!("line {}: expected `lat,lon`, got `{line}`", index + 1),
                    });
                }
            }
        }

        if waypoints.is_empty() {
            return Err(FleetError::RouteFile {
                path: name.to_string(),
                reason: "route has no waypoints".to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            waypoints,
        })
    }

    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "dublin-limerick" => Some(Self {
                name: name.to_string(),
                waypoints: interpolate(DUBLIN_LIMERICK, STEPS_PER_LEG),
            }),
            _ => None,
        }
    }
}

fn interpolate(stops: &[(f64, f64)], steps: usize) -> Vec<(f64, f64)> {
    let mut points = Vec::with_capacity(stops.len() * steps);
    for leg in stops.windows(2) {
        let (from, to) = (leg[0], leg[1]);
        for step in 0..steps {
            let t = step as f64 / steps as f64;
            points.push((from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t));
        }
    }
    if let Some(last) = stops.last() {
        points.push(*last);
    }
    points
}

/// Plays a route back one waypoint per read.
#[derive(Debug)]
pub struct GpsSensor {
    id: String,
    route: Route,
    cursor: usize,
    looping: bool,
}

impl GpsSensor {
    pub fn new(route: Route, looping: bool) -> Self {
        Self {
            id: sensor_id(),
            route,
            cursor: 0,
            looping,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Once a non-looping route is exhausted, `lat` and `lon` are unavailable.
    pub fn read(&mut self) -> GpsReading {
        let position = self.next_position();
        GpsReading {
            id: self.id.clone(),
            timestamp: now_timestamp(),
            lat: Sample::from(position.map(|p| p.0)),
            lon: Sample::from(position.map(|p| p.1)),
        }
    }

    fn next_position(&mut self) -> Option<(f64, f64)> {
        let len = self.route.waypoints.len();
        if self.cursor >= len {
            if !self.looping || len == 0 {
                return None;
            }
            self.cursor = 0;
        }
        let position = self.route.waypoints[self.cursor];
        self.cursor += 1;
        Some(position)
    }
}
