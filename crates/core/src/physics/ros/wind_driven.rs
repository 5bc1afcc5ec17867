use super::{NodeContext, RosModel};

/// Speed proportional to the wind along the normal: `vv_coeff · normalWind`
///
/// Upwind parts of the front get a negative rate and fall back to `minSpeed`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindDriven;

impl RosModel for WindDriven {
    fn name(&self) -> &str {
        "WindDriven"
    }

    fn coefficients(&self) -> Vec<String> {
        vec!["vv_coeff".to_string()]
    }

    fn compute_rate(&self, ctx: &NodeContext<'_>) -> f64 {
        ctx.fuel[0] * ctx.normal_wind
    }
}
