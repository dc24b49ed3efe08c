//! Simple distance-based fare formula.

use serde::{Deserialize, Serialize};

use crate::geo::{distance_km, Location};

/// Base fare in currency units.
pub const BASE_FARE: f64 = 30.0;

/// Per-kilometer rate in currency units.
pub const PER_KM_RATE: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub base_fare: f64,
    pub per_km_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_fare: BASE_FARE,
            per_km_rate: PER_KM_RATE,
        }
    }
}

impl PricingConfig {
    /// Formula: `fare = base_fare + distance_km * per_km_rate`, rounded to cents.
    pub fn quote(&self, pickup: &Location, dropoff: &Location) -> f64 {
        let distance = distance_km(pickup.point(), dropoff.point());
        round_to_cents(self.base_fare + distance * self.per_km_rate)
    }
}

fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
