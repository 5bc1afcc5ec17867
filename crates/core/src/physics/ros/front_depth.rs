use super::{NodeContext, RosModel};
use crate::error::Result;
use crate::params::SimulationParameters;

/// Wind-driven speed amplified by the depth of the burning zone
///
/// ```text
/// ROS = windReductionFactor · normalWind · speed_module · vv_coeff · (1 + Kdepth · depth)
/// ```
///
/// With depth tracking enabled the depth grows toward its steady value after
/// ignition, so the rate accelerates instead of jumping to its final value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrontDepthDriven {
    pub wind_reduction: f64,
    pub speed_module: f64,
}

impl FrontDepthDriven {
    pub fn from_params(params: &SimulationParameters) -> Result<Self> {
        Ok(Self {
            wind_reduction: params.get_f64("windReductionFactor")?,
            speed_module: params.get_f64("speed_module")?,
        })
    }
}

impl RosModel for FrontDepthDriven {
    fn name(&self) -> &str {
        "FrontDepthDriven"
    }

    fn coefficients(&self) -> Vec<String> {
        vec!["vv_coeff".to_string(), "Kdepth".to_string()]
    }

    fn compute_rate(&self, ctx: &NodeContext<'_>) -> f64 {
        let (vv_coeff, k_depth) = (ctx.fuel[0], ctx.fuel[1]);
        self.wind_reduction
            * ctx.normal_wind
            * self.speed_module
            * vv_coeff
            * (1.0 + k_depth * ctx.depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::ros::test_context;

    #[test]
    fn test_deeper_fronts_spread_faster() {
        let model = FrontDepthDriven {
            wind_reduction: 1.0,
            speed_module: 1.0,
        };
        let fuel = [1.0, 0.05];
        let mut ctx = test_context(&fuel);
        ctx.normal_wind = 1.0;

        ctx.depth = 0.0;
        let shallow = model.compute_rate(&ctx);
        ctx.depth = 20.0;
        let deep = model.compute_rate(&ctx);
        assert!((shallow - 1.0).abs() < 1e-12);
        assert!((deep - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_depth_sensitivity_without_kdepth() {
        let model = FrontDepthDriven {
            wind_reduction: 0.5,
            speed_module: 2.0,
        };
        let fuel = [1.0, 0.0];
        let mut ctx = test_context(&fuel);
        ctx.normal_wind = 3.0;
        ctx.depth = 100.0;
        assert!((model.compute_rate(&ctx) - 3.0).abs() < 1e-12);
    }
}
