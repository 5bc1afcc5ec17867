//! Rothermel (1972) surface fire spread
//!
//! Reads the standard fuel-table coefficients in SI units and evaluates the model in
//! the customary unit system of its empirical fits (ft, lb, Btu, min), converting the
//! result back to m/s.
//!
//! # Formula
//! ```text
//! R = I_R × ξ × (1 + Φ_w + Φ_s) / (ρ_b × ε × Q_ig)
//! ```
//!
//! # References
//! - Rothermel, R.C. (1972). "A mathematical model for predicting fire spread in wildland fuels."
//!   USDA Forest Service Research Paper INT-115.
//! - Albini, F.A. (1976). "Estimating wildfire behavior and effects." USDA Forest Service
//!   General Technical Report INT-30.

use super::{NodeContext, RosModel};

const PER_M_TO_PER_FT: f64 = 0.3048;
const M_TO_FT: f64 = 3.280_84;
const KG_M2_TO_LB_FT2: f64 = 0.204_816;
const KG_M3_TO_LB_FT3: f64 = 0.062_428;
const J_KG_TO_BTU_LB: f64 = 1.0 / 2326.0;
const MS_TO_FT_MIN: f64 = 196.85;
const FT_MIN_TO_MS: f64 = 0.00508;

/// Total mineral content
const MINERAL_TOTAL: f64 = 0.0555;
/// Effective mineral content
const MINERAL_EFFECTIVE: f64 = 0.010;

/// Coefficient columns, in the order the model reads them
const COEFFICIENTS: [&str; 11] = [
    "Rhod", "Md", "sd", "e", "Sigmad", "DeltaH", "me", "Cp", "Ta", "Ti", "Deltah",
];

/// Surface fuel properties in customary units
#[derive(Debug, Clone, Copy)]
struct FuelBed {
    /// Surface-area-to-volume ratio (1/ft)
    sigma: f64,
    /// Oven-dry loading (lb/ft²)
    loading: f64,
    /// Fuel bed depth (ft)
    depth: f64,
    /// Particle density (lb/ft³)
    particle_density: f64,
    /// Low heat content (Btu/lb)
    heat_content: f64,
    /// Moisture content (fraction)
    moisture: f64,
    /// Moisture of extinction (fraction)
    moisture_extinction: f64,
    /// Heat of pre-ignition (Btu/lb)
    heat_preignition: f64,
}

impl FuelBed {
    fn from_record(fuel: &[f64]) -> Self {
        let [rhod, md, sd, e, sigmad, delta_h, me, cp, ta, ti, latent] = [
            fuel[0], fuel[1], fuel[2], fuel[3], fuel[4], fuel[5], fuel[6], fuel[7], fuel[8],
            fuel[9], fuel[10],
        ];
        Self {
            sigma: sd * PER_M_TO_PER_FT,
            loading: sigmad * KG_M2_TO_LB_FT2,
            depth: e * M_TO_FT,
            particle_density: rhod * KG_M3_TO_LB_FT3,
            heat_content: delta_h * J_KG_TO_BTU_LB,
            moisture: md,
            moisture_extinction: me,
            heat_preignition: calculate_heat_preignition(cp, ti, ta, md, latent),
        }
    }

    /// Packing ratio β
    fn packing_ratio(&self) -> f64 {
        self.loading / (self.depth * self.particle_density)
    }

    /// Optimum packing ratio β_op
    fn optimum_packing_ratio(&self) -> f64 {
        3.348 * self.sigma.powf(-0.8189)
    }
}

/// Rothermel spread model over the standard fuel table
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rothermel;

impl RosModel for Rothermel {
    fn name(&self) -> &str {
        "Rothermel"
    }

    fn coefficients(&self) -> Vec<String> {
        COEFFICIENTS.iter().map(ToString::to_string).collect()
    }

    fn compute_rate(&self, ctx: &NodeContext<'_>) -> f64 {
        let bed = FuelBed::from_record(ctx.fuel);

        // Non-burnable cells carry no fuel
        if bed.loading <= 0.0 || bed.depth <= 0.0 || bed.sigma <= 0.0 {
            return 0.0;
        }
        if bed.moisture >= bed.moisture_extinction {
            return 0.0;
        }

        let beta = bed.packing_ratio();
        let reaction_intensity = calculate_reaction_intensity(&bed, beta);
        let propagating_flux = calculate_propagating_flux(bed.sigma, beta);
        let wind_coefficient =
            calculate_wind_coefficient(&bed, beta, ctx.normal_wind * MS_TO_FT_MIN);
        let slope_coefficient = calculate_slope_coefficient(beta, ctx.slope);

        let bulk_density = bed.loading / bed.depth;
        let effective_heating = (-138.0 / bed.sigma).exp();

        let spread_ft_min = reaction_intensity
            * propagating_flux
            * (1.0 + wind_coefficient + slope_coefficient)
            / (bulk_density * effective_heating * bed.heat_preignition);

        (spread_ft_min * FT_MIN_TO_MS).max(0.0)
    }
}

/// Reaction intensity I_R (Btu/(ft²·min))
///
/// ```text
/// I_R = Γ' × w_n × h × η_M × η_s
/// ```
fn calculate_reaction_intensity(bed: &FuelBed, beta: f64) -> f64 {
    let sigma_15 = bed.sigma.powf(1.5);
    let gamma_max = sigma_15 / (495.0 + 0.0594 * sigma_15);

    let relative_packing = beta / bed.optimum_packing_ratio();
    let a = 133.0 * bed.sigma.powf(-0.7913);
    let reaction_velocity = gamma_max * relative_packing.powf(a) * (a * (1.0 - relative_packing)).exp();

    let net_loading = bed.loading * (1.0 - MINERAL_TOTAL);
    let moisture_damping = calculate_moisture_damping(bed.moisture, bed.moisture_extinction);
    let mineral_damping = (0.174 * MINERAL_EFFECTIVE.powf(-0.19)).min(1.0);

    reaction_velocity * net_loading * bed.heat_content * moisture_damping * mineral_damping
}

/// Moisture damping coefficient η_M
///
/// ```text
/// η_M = 1 - 2.59×(M_f/M_x) + 5.11×(M_f/M_x)² - 3.52×(M_f/M_x)³
/// ```
fn calculate_moisture_damping(moisture: f64, moisture_extinction: f64) -> f64 {
    if moisture_extinction <= 0.0 {
        return 1.0;
    }
    let ratio = (moisture / moisture_extinction).min(1.0);
    let damping = 1.0 - 2.59 * ratio + 5.11 * ratio.powi(2) - 3.52 * ratio.powi(3);
    damping.clamp(0.0, 1.0)
}

/// Propagating flux ratio ξ
///
/// ```text
/// ξ = exp((0.792 + 0.681×σ^0.5) × (β + 0.1)) / (192 + 0.2595×σ)
/// ```
fn calculate_propagating_flux(sigma: f64, beta: f64) -> f64 {
    let numerator = ((0.792 + 0.681 * sigma.sqrt()) * (beta + 0.1)).exp();
    let denominator = 192.0 + 0.2595 * sigma;
    (numerator / denominator).clamp(0.0, 1.0)
}

/// Wind coefficient Φ_w from the wind along the normal (ft/min)
///
/// ```text
/// Φ_w = C × U^B × (β/β_op)^(-E)
/// ```
///
/// Only the headwind component contributes.
fn calculate_wind_coefficient(bed: &FuelBed, beta: f64, wind_ft_min: f64) -> f64 {
    if wind_ft_min <= 0.0 {
        return 0.0;
    }
    let sigma = bed.sigma;
    let c_coeff = 7.47 * (-0.133 * sigma.powf(0.55)).exp();
    let b_exp = 0.02526 * sigma.powf(0.54);
    let e_exp = 0.715 * (-3.59e-4 * sigma).exp();
    c_coeff * wind_ft_min.powf(b_exp) * (beta / bed.optimum_packing_ratio()).powf(-e_exp)
}

/// Slope coefficient Φ_s from the slope along the normal (rise over run)
///
/// ```text
/// Φ_s = 5.275 × β^(-0.3) × tan²(θ)
/// ```
///
/// Downhill spread gets no slope contribution.
fn calculate_slope_coefficient(beta: f64, slope: f64) -> f64 {
    if slope <= 0.0 {
        return 0.0;
    }
    5.275 * beta.powf(-0.3) * slope * slope
}

/// Heat of pre-ignition (Btu/lb)
///
/// ```text
/// Q_ig = C_p × (T_ig - T_a) + M_f × L_v
/// ```
fn calculate_heat_preignition(cp: f64, ti: f64, ta: f64, moisture: f64, latent: f64) -> f64 {
    let sensible_heat = cp * (ti - ta);
    let latent_heat = moisture * latent;
    (sensible_heat + latent_heat) * J_KG_TO_BTU_LB
}
