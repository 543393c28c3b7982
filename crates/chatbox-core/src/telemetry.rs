//! Bike station telemetry
//!
//! Stations sit at a fixed coordinate on a line. On every tick, each station
//! within the proximity threshold of the current proximity parameter has its
//! available count nudged by a small random step, clamped to `[0, capacity]`.

use serde::{Deserialize, Serialize};

use crate::chooser::Chooser;

/// A simulated sensor feed: bikes available at one station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BikeStation {
    pub id: String,
    pub name: String,
    pub capacity: u32,
    pub available: u32,
    /// Fixed coordinate compared against the proximity parameter
    pub position: f32,
}

impl BikeStation {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        capacity: u32,
        available: u32,
        position: f32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capacity,
            available: available.min(capacity),
            position,
        }
    }

    pub fn distance_to(&self, proximity: f32) -> f32 {
        (self.position - proximity).abs()
    }

    /// Strictly closer than `threshold`
    pub fn is_near(&self, proximity: f32, threshold: f32) -> bool {
        self.distance_to(proximity) < threshold
    }

    /// Apply a signed step, clamped to `[0, capacity]`
    pub fn perturb(&mut self, delta: i32) {
        let next = i64::from(self.available) + i64::from(delta);
        self.available = next.clamp(0, i64::from(self.capacity)) as u32;
    }
}

/// Station as shown to a consumer, with the derived proximity flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationView {
    pub station: BikeStation,
    pub near: bool,
}

/// Run one telemetry tick over every station
///
/// Returns the ids of the stations that were within range and received a
/// perturbation (a zero step still counts as received).
pub fn tick(
    stations: &mut [BikeStation],
    proximity: f32,
    threshold: f32,
    max_delta: i32,
    chooser: &mut dyn Chooser,
) -> Vec<String> {
    let mut touched = Vec::new();
    for station in stations.iter_mut() {
        if station.is_near(proximity, threshold) {
            let delta = chooser.delta(max_delta);
            station.perturb(delta);
            tracing::trace!(
                "Station {} perturbed by {} -> {}/{}",
                station.id,
                delta,
                station.available,
                station.capacity
            );
            touched.push(station.id.clone());
        }
    }
    touched
}

/// Derive consumer views for the given proximity
pub fn views(stations: &[BikeStation], proximity: f32, threshold: f32) -> Vec<StationView> {
    stations
        .iter()
        .map(|station| StationView {
            near: station.is_near(proximity, threshold),
            station: station.clone(),
        })
        .collect()
}
