//! Feed-forward network consulted as a rate-of-spread model
//!
//! Weights are supplied in memory by the caller. Each network input is named:
//! environment inputs use the context field names (`normalWind`, `slope`,
//! `curvature`, `depth`, `windU`, `windV`) and fuel inputs use `fuel.<coefficient>`.

use super::{NodeContext, RosModel};
use crate::error::{FireError, Result};
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;

const FUEL_PREFIX: &str = "fuel.";

/// Layer activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "linear" | "identity" => Ok(Self::Linear),
            "relu" => Ok(Self::Relu),
            "sigmoid" => Ok(Self::Sigmoid),
            "tanh" => Ok(Self::Tanh),
            other => Err(FireError::config(format!("unknown activation '{other}'"))),
        }
    }

    #[inline]
    fn apply(self, x: f64) -> f64 {
        match self {
            Self::Linear => x,
            Self::Relu => x.max(0.0),
            Self::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Self::Tanh => x.tanh(),
        }
    }
}

/// Fully connected layer `y = f(W·x + b)`
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    pub weights: DMatrix<f64>,
    pub bias: DVector<f64>,
    pub activation: Activation,
}

impl DenseLayer {
    /// Build a layer from row-major weights (`outputs × inputs`)
    pub fn new(
        inputs: usize,
        outputs: usize,
        weights: &[f64],
        bias: &[f64],
        activation: Activation,
    ) -> Result<Self> {
        if weights.len() != inputs * outputs || bias.len() != outputs {
            return Err(FireError::config(format!(
                "dense layer {inputs}->{outputs} expects {} weights and {outputs} biases, got {} and {}",
                inputs * outputs,
                weights.len(),
                bias.len()
            )));
        }
        Ok(Self {
            weights: DMatrix::from_row_slice(outputs, inputs, weights),
            bias: DVector::from_column_slice(bias),
            activation,
        })
    }

    fn forward(&self, input: &DVector<f64>) -> DVector<f64> {
        let activation = self.activation;
        (&self.weights * input + &self.bias).map(|x| activation.apply(x))
    }
}

/// Named inputs and the stack of layers producing a single rate
#[derive(Debug, Clone, PartialEq)]
pub struct LearnedNetwork {
    inputs: Vec<String>,
    layers: Vec<DenseLayer>,
}

impl LearnedNetwork {
    pub fn new(inputs: Vec<String>, layers: Vec<DenseLayer>) -> Result<Self> {
        let mut width = inputs.len();
        if width == 0 || layers.is_empty() {
            return Err(FireError::config("learned model needs inputs and at least one layer"));
        }
        for (i, layer) in layers.iter().enumerate() {
            if layer.weights.ncols() != width {
                return Err(FireError::config(format!(
                    "layer {i} expects {} inputs, previous layer yields {width}",
                    layer.weights.ncols()
                )));
            }
            width = layer.weights.nrows();
        }
        if width != 1 {
            return Err(FireError::config(format!(
                "learned model must output a single rate, got {width} outputs"
            )));
        }
        for name in &inputs {
            if !name.starts_with(FUEL_PREFIX) && EnvInput::from_name(name).is_none() {
                return Err(FireError::config(format!("unknown learned model input '{name}'")));
            }
        }
        Ok(Self { inputs, layers })
    }

    pub fn input_names(&self) -> &[String] {
        &self.inputs
    }

    pub fn evaluate(&self, input: DVector<f64>) -> f64 {
        self.layers
            .iter()
            .fold(input, |x, layer| layer.forward(&x))[0]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvInput {
    NormalWind,
    Slope,
    Curvature,
    Depth,
    WindU,
    WindV,
}

impl EnvInput {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "normalWind" => Some(Self::NormalWind),
            "slope" => Some(Self::Slope),
            "curvature" => Some(Self::Curvature),
            "depth" | "frontDepth" => Some(Self::Depth),
            "windU" => Some(Self::WindU),
            "windV" => Some(Self::WindV),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum InputSource {
    Env(EnvInput),
    Fuel(usize),
}

/// Network bound to the coefficient order of the fuel record
#[derive(Debug, Clone)]
pub struct LearnedModel {
    name: String,
    network: Arc<LearnedNetwork>,
    sources: Vec<InputSource>,
    fuel_names: Vec<String>,
}

impl LearnedModel {
    pub fn new(name: String, network: Arc<LearnedNetwork>) -> Self {
        let mut fuel_names = Vec::new();
        let sources = network
            .inputs
            .iter()
            .map(|input| match input.strip_prefix(FUEL_PREFIX) {
                Some(coeff) => {
                    fuel_names.push(coeff.to_string());
                    InputSource::Fuel(fuel_names.len() - 1)
                }
                // Validated in LearnedNetwork::new
                None => InputSource::Env(EnvInput::from_name(input).unwrap_or(EnvInput::Depth)),
            })
            .collect();
        Self {
            name,
            network,
            sources,
            fuel_names,
        }
    }
}

impl RosModel for LearnedModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn coefficients(&self) -> Vec<String> {
        self.fuel_names.clone()
    }

    fn compute_rate(&self, ctx: &NodeContext<'_>) -> f64 {
        let input = DVector::from_iterator(
            self.sources.len(),
            self.sources.iter().map(|source| match *source {
                InputSource::Fuel(i) => ctx.fuel[i],
                InputSource::Env(EnvInput::NormalWind) => ctx.normal_wind,
                InputSource::Env(EnvInput::Slope) => ctx.slope,
                InputSource::Env(EnvInput::Curvature) => ctx.curvature,
                InputSource::Env(EnvInput::Depth) => ctx.depth,
                InputSource::Env(EnvInput::WindU) => ctx.wind.x,
                InputSource::Env(EnvInput::WindV) => ctx.wind.y,
            }),
        );
        self.network.evaluate(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::ros::test_context;

    fn linear_network() -> LearnedNetwork {
        // rate = 0.5 * normalWind + 2 * fuel.Rhod + 0.1
        let layer = DenseLayer::new(2, 1, &[0.5, 2.0], &[0.1], Activation::Linear).unwrap();
        LearnedNetwork::new(vec!["normalWind".into(), "fuel.Rhod".into()], vec![layer]).unwrap()
    }

    #[test]
    fn test_linear_network_rate() {
        let model = LearnedModel::new("Learned".into(), Arc::new(linear_network()));
        assert_eq!(model.coefficients(), vec!["Rhod".to_string()]);

        let fuel = [0.25];
        let mut ctx = test_context(&fuel);
        ctx.normal_wind = 4.0;
        assert!((model.compute_rate(&ctx) - 2.6).abs() < 1e-12);
    }

    #[test]
    fn test_hidden_relu_layer() {
        let hidden = DenseLayer::new(1, 2, &[1.0, -1.0], &[0.0, 0.0], Activation::Relu).unwrap();
        let output = DenseLayer::new(2, 1, &[1.0, 1.0], &[0.0], Activation::Linear).unwrap();
        let network = LearnedNetwork::new(vec!["slope".into()], vec![hidden, output]).unwrap();
        let model = LearnedModel::new("abs".into(), Arc::new(network));

        let mut ctx = test_context(&[]);
        ctx.slope = -0.4;
        assert!((model.compute_rate(&ctx) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_shape_validation() {
        assert!(DenseLayer::new(2, 1, &[1.0], &[0.0], Activation::Linear).is_err());
        let wide = DenseLayer::new(1, 2, &[1.0, 1.0], &[0.0, 0.0], Activation::Linear).unwrap();
        assert!(LearnedNetwork::new(vec!["slope".into()], vec![wide]).is_err());
        let layer = DenseLayer::new(1, 1, &[1.0], &[0.0], Activation::Linear).unwrap();
        assert!(LearnedNetwork::new(vec!["humidity".into()], vec![layer]).is_err());
    }
}
