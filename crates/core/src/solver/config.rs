//! Typed propagation settings
//!
//! A [`PropagationConfig`] is a validated snapshot of the parameter store taken at the
//! start of every `advance_to`, so parameter edits take effect at the next call and
//! never in the middle of one.

use crate::error::{FireError, Result};
use crate::params::SimulationParameters;
use serde::{Deserialize, Serialize};

/// Settings read by the integrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationConfig {
    /// Largest node displacement per sub-step (m)
    pub spatial_increment: f64,
    /// Largest spacing between adjacent nodes (m)
    pub perimeter_resolution: f64,
    /// Minimal depth of a propagating front (m)
    pub minimal_front_depth: f64,
    /// Depth given to new nodes (m)
    pub initial_front_depth: f64,
    /// Residence time of the burning zone (s)
    pub burning_duration: f64,
    /// Velocity smoothing factor in `[0, 1]`
    pub relax: f64,
    pub min_speed: f64,
    pub max_speed: Option<f64>,
    /// Global multiplier on model output
    pub speed_adjustment: f64,
    /// Node distance below which two front parts fuse (m)
    pub merge_tolerance: f64,
    /// Track the depth of the burning zone per node
    pub depth_computation: bool,
    pub max_front_depth: Option<f64>,
    /// Remove nodes whose depth falls below this floor (0 disables)
    pub depth_floor: f64,
    /// Consecutive invalid rates before a node is frozen
    pub max_invalid_streak: u32,
    /// Fuel index used where no `fuel` layer is registered
    pub default_fuel: i32,
    /// Name of the rate-of-spread model
    pub model: String,
}

fn positive(params: &SimulationParameters, key: &str) -> Result<f64> {
    let value = params.get_f64(key)?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(FireError::config(format!("'{key}' must be strictly positive, got {value}")))
    }
}

impl PropagationConfig {
    /// Build and validate the configuration from the parameter store
    pub fn from_params(params: &SimulationParameters) -> Result<Self> {
        let spatial_increment = positive(params, "spatialIncrement")?;
        let perimeter_resolution = positive(params, "perimeterResolution")?;
        let minimal_front_depth = params.get_f64("minimalPropagativeFrontDepth")?;
        if !(minimal_front_depth.is_finite() && minimal_front_depth >= 0.0) {
            return Err(FireError::config(format!(
                "'minimalPropagativeFrontDepth' must be >= 0, got {minimal_front_depth}"
            )));
        }
        let burning_duration = positive(params, "burningDuration")?;

        let relax = params.get_f64("relax")?;
        if !(0.0..=1.0).contains(&relax) {
            return Err(FireError::config(format!("'relax' must lie in [0, 1], got {relax}")));
        }

        let min_speed = params.get_f64("minSpeed")?;
        if !(min_speed.is_finite() && min_speed >= 0.0) {
            return Err(FireError::config(format!("'minSpeed' must be >= 0, got {min_speed}")));
        }
        let max_speed = params.get_opt_f64("maxSpeed")?;
        if let Some(max) = max_speed {
            if max.is_nan() || max < min_speed {
                return Err(FireError::config(format!(
                    "'maxSpeed' ({max}) must be >= 'minSpeed' ({min_speed})"
                )));
            }
        }

        let initial_front_depth = params.get_f64("initialFrontDepth")?;
        if initial_front_depth < 0.0 {
            return Err(FireError::config("'initialFrontDepth' must be >= 0"));
        }

        let max_invalid_streak = params.get_int("maxInvalidRateStreak")?;
        if max_invalid_streak < 1 {
            return Err(FireError::config("'maxInvalidRateStreak' must be >= 1"));
        }

        let mut config = Self {
            spatial_increment,
            perimeter_resolution,
            minimal_front_depth,
            initial_front_depth,
            burning_duration,
            relax,
            min_speed,
            max_speed,
            speed_adjustment: params.get_f64_or("propagationSpeedAdjustmentFactor", 1.0),
            merge_tolerance: 0.0,
            depth_computation: params.get_bool("frontDepthComputation"),
            max_front_depth: params.get_opt_f64("maxFrontDepth")?,
            depth_floor: params.get_f64_or("minimalDepthFloor", 0.0).max(0.0),
            max_invalid_streak: u32::try_from(max_invalid_streak).unwrap_or(u32::MAX),
            default_fuel: i32::try_from(params.get_int("defaultFuelType")?)
                .map_err(|_| FireError::config("'defaultFuelType' is out of range"))?,
            model: params.get_string("propagationModel")?,
        };
        config.merge_tolerance = match params.get_opt_f64("mergeTolerance")? {
            Some(tol) if tol >= 0.0 => tol,
            Some(tol) => {
                return Err(FireError::config(format!("'mergeTolerance' must be >= 0, got {tol}")))
            }
            None => 0.5 * config.min_spacing(),
        };
        Ok(config)
    }

    /// Largest displacement of any node in one sub-step
    #[must_use]
    pub fn max_displacement(&self) -> f64 {
        self.spatial_increment.min(self.perimeter_resolution)
    }

    /// Spacing below which adjacent nodes are fused
    ///
    /// A zero minimal depth leaves only the perimeter resolution as the bound.
    #[must_use]
    pub fn min_spacing(&self) -> f64 {
        let half_resolution = 0.5 * self.perimeter_resolution;
        if self.minimal_front_depth > 0.0 {
            (0.5 * self.minimal_front_depth).min(half_resolution)
        } else {
            half_resolution
        }
    }

    /// Apply the speed bounds to a model output
    ///
    /// Returns the bounded speed and whether a bound was hit.
    #[must_use]
    pub fn clamp_speed(&self, rate: f64) -> (f64, bool) {
        let upper = self.max_speed.unwrap_or(f64::INFINITY);
        let speed = rate.clamp(self.min_speed, upper);
        (speed, speed != rate)
    }

    /// Steady depth of the burning zone for a front moving at `speed`
    #[must_use]
    pub fn steady_depth(&self, speed: f64) -> f64 {
        let depth = speed * self.burning_duration;
        self.max_front_depth.map_or(depth, |max| depth.min(max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PropagationConfig::from_params(&SimulationParameters::new()).unwrap();
        assert_eq!(config.model, "IsotropicFuel");
        assert_eq!(config.max_displacement(), 2.0);
        assert_eq!(config.min_spacing(), 5.0);
        assert_eq!(config.merge_tolerance, 2.5);
        assert!(config.max_speed.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut params = SimulationParameters::new();
        params.set_f64("relax", 1.5);
        assert!(matches!(
            PropagationConfig::from_params(&params),
            Err(FireError::Configuration(_))
        ));

        let mut params = SimulationParameters::new();
        params.set_f64("perimeterResolution", 0.0);
        assert!(PropagationConfig::from_params(&params).is_err());

        let mut params = SimulationParameters::new();
        params.set_f64("minSpeed", 2.0);
        params.set_f64("maxSpeed", 1.0);
        assert!(PropagationConfig::from_params(&params).is_err());
    }

    #[test]
    fn test_zero_minimal_depth() {
        let mut params = SimulationParameters::new();
        params.set_f64("minimalPropagativeFrontDepth", 0.0);
        params.set_f64("perimeterResolution", 8.0);
        let config = PropagationConfig::from_params(&params).unwrap();
        assert_eq!(config.min_spacing(), 4.0);
        assert_eq!(config.merge_tolerance, 2.0);

        params.set_f64("minimalPropagativeFrontDepth", -1.0);
        assert!(PropagationConfig::from_params(&params).is_err());
    }

    #[test]
    fn test_speed_clamp() {
        let mut params = SimulationParameters::new();
        params.set_f64("minSpeed", 0.1);
        params.set_f64("maxSpeed", 3.0);
        let config = PropagationConfig::from_params(&params).unwrap();
        assert_eq!(config.clamp_speed(1.0), (1.0, false));
        assert_eq!(config.clamp_speed(0.0), (0.1, true));
        assert_eq!(config.clamp_speed(7.0), (3.0, true));
    }
}
