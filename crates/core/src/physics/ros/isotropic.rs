use super::{NodeContext, RosModel};
use crate::error::Result;
use crate::params::SimulationParameters;

/// Constant speed scaled per fuel: `speed_module · vv_coeff`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsotropicFuel {
    pub speed_module: f64,
}

impl IsotropicFuel {
    pub fn from_params(params: &SimulationParameters) -> Result<Self> {
        Ok(Self {
            speed_module: params.get_f64("speed_module")?,
        })
    }
}

impl RosModel for IsotropicFuel {
    fn name(&self) -> &str {
        "IsotropicFuel"
    }

    fn coefficients(&self) -> Vec<String> {
        vec!["vv_coeff".to_string()]
    }

    fn compute_rate(&self, ctx: &NodeContext<'_>) -> f64 {
        self.speed_module * ctx.fuel[0]
    }
}
