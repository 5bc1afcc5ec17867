//! Heat released by the burning zone
//!
//! The basic flux model releases a constant `nominalHeatFlux` (W/m²) from the arrival
//! time of the fire in a cell for `burningDuration` seconds. Both values are scaled
//! per fuel by the optional `HF_coeff` and `BD_coeff` columns of the fuel table.

use crate::core_types::Vec2;
use crate::error::{FireError, Result};
use crate::grid::ArrivalTimeMap;
use crate::params::SimulationParameters;
use rayon::prelude::*;

/// Name under which the flux raster is exported
pub const HEAT_FLUX: &str = "heatFlux";

/// Per-fuel multipliers of the nominal flux and of the burning duration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluxCoefficients {
    pub flux: f64,
    pub duration: f64,
}

impl Default for FluxCoefficients {
    fn default() -> Self {
        Self {
            flux: 1.0,
            duration: 1.0,
        }
    }
}

/// Constant heat release over a fixed residence time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatFluxBasic {
    pub nominal_heat_flux: f64,
    pub burning_duration: f64,
}

impl HeatFluxBasic {
    pub const NAME: &'static str = "heatFluxBasic";

    pub fn from_params(params: &SimulationParameters) -> Result<Self> {
        let nominal_heat_flux = params.get_f64("nominalHeatFlux")?;
        if !(nominal_heat_flux.is_finite() && nominal_heat_flux >= 0.0) {
            return Err(FireError::config(format!(
                "'nominalHeatFlux' must be >= 0, got {nominal_heat_flux}"
            )));
        }
        let burning_duration = params.get_f64("burningDuration")?;
        if !(burning_duration.is_finite() && burning_duration > 0.0) {
            return Err(FireError::config(format!(
                "'burningDuration' must be strictly positive, got {burning_duration}"
            )));
        }
        Ok(Self {
            nominal_heat_flux,
            burning_duration,
        })
    }

    /// Flux at `now` of a cell reached by the fire at `arrival`
    pub fn flux(&self, arrival: f64, now: f64, coefficients: FluxCoefficients) -> f64 {
        let end = arrival + self.burning_duration * coefficients.duration;
        if arrival <= now && now < end {
            self.nominal_heat_flux * coefficients.flux
        } else {
            0.0
        }
    }

    /// Row-major flux raster on the burn map grid
    ///
    /// `coefficients` is called with the center of every burning cell.
    pub fn raster<F>(&self, burn_map: &ArrivalTimeMap, now: f64, coefficients: F) -> Vec<f64>
    where
        F: Fn(Vec2) -> FluxCoefficients + Sync,
    {
        let (nx, _) = burn_map.dimensions();
        burn_map
            .snapshot()
            .into_par_iter()
            .enumerate()
            .map(|(idx, arrival)| {
                if arrival > now {
                    return 0.0;
                }
                let center = burn_map.cell_center(idx % nx, idx / nx);
                self.flux(arrival, now, coefficients(center))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> HeatFluxBasic {
        HeatFluxBasic {
            nominal_heat_flux: 1000.0,
            burning_duration: 10.0,
        }
    }

    #[test]
    fn test_flux_window() {
        let model = model();
        let unit = FluxCoefficients::default();
        assert_eq!(model.flux(5.0, 4.0, unit), 0.0);
        assert_eq!(model.flux(5.0, 5.0, unit), 1000.0);
        assert_eq!(model.flux(5.0, 14.9, unit), 1000.0);
        assert_eq!(model.flux(5.0, 15.0, unit), 0.0);
        assert_eq!(model.flux(f64::INFINITY, 15.0, unit), 0.0);

        let scaled = FluxCoefficients {
            flux: 0.5,
            duration: 2.0,
        };
        assert_eq!(model.flux(5.0, 20.0, scaled), 500.0);
    }

    #[test]
    fn test_raster_follows_burn_map() {
        let map = ArrivalTimeMap::new(Vec2::zeros(), Vec2::new(4.0, 2.0), 1.0).unwrap();
        map.stamp(0, 0, 0.0);
        map.stamp(1, 0, 12.0);
        map.stamp(2, 1, 25.0);
        let raster = model().raster(&map, 15.0, |p| FluxCoefficients {
            flux: if p.x < 1.0 { 2.0 } else { 1.0 },
            duration: 1.0,
        });
        assert_eq!(raster.len(), 8);
        // Cell 0 burned out at t=10, cell 6 not reached yet
        assert_eq!(raster[0], 0.0);
        assert_eq!(raster[1], 1000.0);
        assert_eq!(raster[6], 0.0);
        assert_eq!(raster.iter().filter(|&&f| f > 0.0).count(), 1);
    }

    #[test]
    fn test_parameters_validated() {
        let mut params = SimulationParameters::new();
        assert_eq!(HeatFluxBasic::from_params(&params).unwrap().nominal_heat_flux, 100000.0);
        params.set_f64("nominalHeatFlux", -1.0);
        assert!(HeatFluxBasic::from_params(&params).is_err());
    }
}
