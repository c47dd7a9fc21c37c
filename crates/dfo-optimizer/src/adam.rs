//! Adam step sizing for a single scalar parameter.

use serde::{Deserialize, Serialize};

use dfo_types::{config_error, DfoResult};

/// Adam hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdamConfig {
    /// Step size α.
    pub learning_rate: f64,
    /// Decay rate of the first moment.
    pub beta1: f64,
    /// Decay rate of the second moment.
    pub beta2: f64,
    /// Added to the denominator to keep the step finite.
    pub epsilon: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.02,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

impl AdamConfig {
    pub fn validate(&self) -> DfoResult<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(config_error!(
                "Adam learning rate must be positive, got {}",
                self.learning_rate
            ));
        }
        for (name, beta) in [("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0.0..1.0).contains(&beta) {
                return Err(config_error!("Adam {name} must lie in [0, 1), got {beta}"));
            }
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(config_error!(
                "Adam epsilon must be positive, got {}",
                self.epsilon
            ));
        }
        Ok(())
    }
}

/// Moment estimates for one parameter. Each parameter owns a fresh instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Adam {
    config: AdamConfig,
    m: f64,
    v: f64,
    t: u64,
}

impl Adam {
    pub fn new(config: AdamConfig) -> Self {
        Self {
            config,
            m: 0.0,
            v: 0.0,
            t: 0,
        }
    }

    pub fn config(&self) -> &AdamConfig {
        &self.config
    }

    /// Number of updates applied so far.
    pub fn steps(&self) -> u64 {
        self.t
    }

    /// Bias-corrected step for `gradient`. The caller has already applied
    /// the objective direction, so a positive result moves the parameter up.
    pub fn update(&mut self, gradient: f64) -> f64 {
        let AdamConfig {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        } = self.config;

        self.t += 1;
        self.m = beta1 * self.m + (1.0 - beta1) * gradient;
        self.v = beta2 * self.v + (1.0 - beta2) * gradient * gradient;

        let exponent = i32::try_from(self.t).unwrap_or(i32::MAX);
        let m_hat = self.m / (1.0 - beta1.powi(exponent));
        let v_hat = self.v / (1.0 - beta2.powi(exponent));

        learning_rate * m_hat / (v_hat.sqrt() + epsilon)
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(AdamConfig::default())
    }
}
