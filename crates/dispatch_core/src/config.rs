//! Dispatch tuning knobs, loaded from JSON with every field defaulted.

use h3o::Resolution;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::pricing::PricingConfig;

/// Default matching radius around a pickup point.
pub const DEFAULT_MATCH_RADIUS_KM: f64 = 5.0;

/// H3 resolution of the presence index (~0.46 km edges).
pub const DEFAULT_H3_RESOLUTION: u8 = 8;

pub const DEFAULT_PICKUP_CODE_MAX_ATTEMPTS: u32 = 5;

pub const DEFAULT_VEHICLE_CLASS: &str = "Standard Car";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Candidates farther than this from the pickup are excluded (inclusive bound).
    pub match_radius_km: f64,
    pub h3_resolution: u8,
    /// Wrong pickup codes tolerated before verification locks.
    pub pickup_code_max_attempts: u32,
    /// Seed for the pickup code generator; `None` draws from OS entropy.
    pub pickup_code_seed: Option<u64>,
    pub default_vehicle_class: String,
    pub pricing: PricingConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            match_radius_km: DEFAULT_MATCH_RADIUS_KM,
            h3_resolution: DEFAULT_H3_RESOLUTION,
            pickup_code_max_attempts: DEFAULT_PICKUP_CODE_MAX_ATTEMPTS,
            pickup_code_seed: None,
            default_vehicle_class: DEFAULT_VEHICLE_CLASS.to_string(),
            pricing: PricingConfig::default(),
        }
    }
}

impl DispatchConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, DispatchError> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|err| DispatchError::invalid_input(format!("dispatch config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_match_radius_km(mut self, radius_km: f64) -> Self {
        self.match_radius_km = radius_km;
        self
    }

    pub fn with_pickup_code_seed(mut self, seed: u64) -> Self {
        self.pickup_code_seed = Some(seed);
        self
    }

    pub fn with_pickup_code_max_attempts(mut self, attempts: u32) -> Self {
        self.pickup_code_max_attempts = attempts;
        self
    }

    pub fn resolution(&self) -> Result<Resolution, DispatchError> {
        Resolution::try_from(self.h3_resolution).map_err(|err| {
            DispatchError::invalid_input(format!(
                "h3_resolution {}: {err}",
                self.h3_resolution
            ))
        })
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if !self.match_radius_km.is_finite() || self.match_radius_km <= 0.0 {
            return Err(DispatchError::invalid_input(
                "match_radius_km must be a positive number",
            ));
        }
        self.resolution()?;
        if self.pickup_code_max_attempts == 0 {
            return Err(DispatchError::invalid_input(
                "pickup_code_max_attempts must be at least 1",
            ));
        }
        if self.default_vehicle_class.trim().is_empty() {
            return Err(DispatchError::invalid_input(
                "default_vehicle_class must not be empty",
            ));
        }
        let pricing = &self.pricing;
        if !(pricing.base_fare.is_finite() && pricing.base_fare >= 0.0)
            || !(pricing.per_km_rate.is_finite() && pricing.per_km_rate >= 0.0)
        {
            return Err(DispatchError::invalid_input(
                "pricing values must be non-negative numbers",
            ));
        }
        Ok(())
    }
}
