use super::{NodeContext, RosModel};
use crate::error::Result;
use crate::params::SimulationParameters;

/// Curvature-damped constant speed
///
/// ```text
/// ROS = speed_module · vv_coeff · (1 − Kcurv · κ / √(1 + β · κ²))
/// ```
///
/// The `β` term bounds the correction at sharp corners: as `|κ| → ∞` the factor
/// tends to `1 ∓ Kcurv/√β` instead of diverging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvatureDriven {
    pub speed_module: f64,
}

impl CurvatureDriven {
    pub fn from_params(params: &SimulationParameters) -> Result<Self> {
        Ok(Self {
            speed_module: params.get_f64("speed_module")?,
        })
    }
}

impl RosModel for CurvatureDriven {
    fn name(&self) -> &str {
        "CurvatureDriven"
    }

    fn coefficients(&self) -> Vec<String> {
        ["vv_coeff", "Kcurv", "beta"]
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn compute_rate(&self, ctx: &NodeContext<'_>) -> f64 {
        let (vv_coeff, k_curv, beta) = (ctx.fuel[0], ctx.fuel[1], ctx.fuel[2]);
        let kappa = ctx.curvature;
        self.speed_module * vv_coeff * (1.0 - k_curv * kappa / (1.0 + beta * kappa * kappa).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::ros::test_context;

    #[test]
    fn test_concave_faster_than_convex() {
        let model = CurvatureDriven { speed_module: 1.0 };
        let fuel = [1.0, 14.0, 6.0];
        let mut ctx = test_context(&fuel);

        assert!((model.compute_rate(&ctx) - 1.0).abs() < 1e-12);

        ctx.curvature = 0.01;
        let convex = model.compute_rate(&ctx);
        ctx.curvature = -0.01;
        let concave = model.compute_rate(&ctx);
        assert!(convex < 1.0 && concave > 1.0);
    }

    #[test]
    fn test_bounded_at_sharp_corners() {
        let model = CurvatureDriven { speed_module: 1.0 };
        let fuel = [1.0, 2.0, 4.0];
        let mut ctx = test_context(&fuel);
        ctx.curvature = -1e9;
        // Limit is 1 + Kcurv / sqrt(beta)
        assert!((model.compute_rate(&ctx) - 2.0).abs() < 1e-6);
    }
}
