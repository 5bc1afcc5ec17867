//! Flat key/value parameter store
//!
//! Every engine setting is a named scalar or string. Numeric accessors accept
//! strings that parse as numbers so command-line and script input can be stored
//! verbatim.

use crate::error::{FireError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    /// Parse raw text, keeping it numeric when it looks like a number
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        trimmed
            .parse::<f64>()
            .map_or_else(|_| Self::Text(trimmed.to_string()), Self::Number)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Engine defaults, applied by [`SimulationParameters::new`]
const DEFAULTS: &[(&str, f64)] = &[
    ("spatialIncrement", 2.0),
    ("perimeterResolution", 10.0),
    ("minimalPropagativeFrontDepth", 10.0),
    ("initialFrontDepth", 2.0),
    ("initialBurningDuration", 100.0),
    ("burningDuration", 100.0),
    ("relax", 0.5),
    ("minSpeed", 0.0),
    ("speed_module", 1.0),
    ("windU", 0.0),
    ("windV", 0.0),
    ("windReductionFactor", 1.0),
    ("frontDepthComputation", 0.0),
    ("maxInvalidRateStreak", 3.0),
    ("defaultFuelType", 1.0),
    ("minimalDepthFloor", 0.0),
    ("nominalHeatFlux", 100000.0),
    ("defaultHeatType", 0.0),
];

/// Named scalar/string parameters shared by the whole simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationParameters {
    values: FxHashMap<String, ParamValue>,
}

impl SimulationParameters {
    /// Create a store pre-filled with engine defaults
    pub fn new() -> Self {
        let mut values = FxHashMap::default();
        for (key, value) in DEFAULTS {
            values.insert((*key).to_string(), ParamValue::Number(*value));
        }
        values.insert(
            "propagationModel".to_string(),
            ParamValue::Text("IsotropicFuel".to_string()),
        );
        values.insert(
            "outOfBoundsPolicy".to_string(),
            ParamValue::Text("clamp".to_string()),
        );
        Self { values }
    }

    /// Create an empty store without defaults
    pub fn empty() -> Self {
        Self {
            values: FxHashMap::default(),
        }
    }

    pub fn set(&mut self, key: &str, value: ParamValue) {
        self.values.insert(key.to_string(), value);
    }

    /// Store raw text, typed as a number when it parses as one
    pub fn set_raw(&mut self, key: &str, raw: &str) {
        self.set(key, ParamValue::parse(raw));
    }

    pub fn set_f64(&mut self, key: &str, value: f64) {
        self.set(key, ParamValue::Number(value));
    }

    pub fn set_int(&mut self, key: &str, value: i64) {
        self.set(key, ParamValue::Number(value as f64));
    }

    pub fn set_string(&mut self, key: &str, value: &str) {
        self.set(key, ParamValue::Text(value.to_string()));
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// Numeric value of `key`
    ///
    /// Fails with `ConfigurationError` when the key is missing or not numeric.
    pub fn get_f64(&self, key: &str) -> Result<f64> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| FireError::config(format!("missing parameter '{key}'")))?;
        value
            .as_f64()
            .ok_or_else(|| FireError::config(format!("parameter '{key}' is not numeric: {value}")))
    }

    /// Numeric value of `key`, `None` when absent
    pub fn get_opt_f64(&self, key: &str) -> Result<Option<f64>> {
        if self.values.contains_key(key) {
            self.get_f64(key).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn get_f64_or(&self, key: &str, fallback: f64) -> f64 {
        self.values
            .get(key)
            .and_then(ParamValue::as_f64)
            .unwrap_or(fallback)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_f64(key)?;
        if value.fract() != 0.0 {
            return Err(FireError::config(format!(
                "parameter '{key}' must be an integer, got {value}"
            )));
        }
        Ok(value as i64)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get_f64_or(key, 0.0) != 0.0
    }

    /// String form of `key` (numbers are formatted)
    pub fn get_string(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .map(ToString::to_string)
            .ok_or_else(|| FireError::config(format!("missing parameter '{key}'")))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self::new()
    }
}
