//! Objective direction and step-magnitude aggregation.

use serde::{Deserialize, Serialize};

/// Whether we are maximizing or minimizing the agent's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveDirection {
    Maximize,
    Minimize,
}

impl ObjectiveDirection {
    /// +1 for maximize, -1 for minimize. Multiplied into every estimated
    /// gradient before it reaches a parameter's Adam state.
    pub fn sign(self) -> f64 {
        match self {
            Self::Maximize => 1.0,
            Self::Minimize => -1.0,
        }
    }

    /// True if `candidate` is a better outcome than `incumbent`.
    pub fn improves(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Maximize => candidate > incumbent,
            Self::Minimize => candidate < incumbent,
        }
    }
}

impl Default for ObjectiveDirection {
    fn default() -> Self {
        Self::Maximize
    }
}

/// How per-parameter step magnitudes are combined into the single figure
/// compared against the convergence threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MagnitudeAggregation {
    /// Sum of absolute steps across all parameters.
    Sum,
    /// Largest absolute step of any parameter.
    Max,
}

impl MagnitudeAggregation {
    pub fn aggregate<I>(self, steps: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        let magnitudes = steps.into_iter().map(f64::abs);
        match self {
            Self::Sum => magnitudes.sum(),
            Self::Max => magnitudes.fold(0.0, f64::max),
        }
    }
}

impl Default for MagnitudeAggregation {
    fn default() -> Self {
        Self::Sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_sign() {
        assert_eq!(ObjectiveDirection::Maximize.sign(), 1.0);
        assert_eq!(ObjectiveDirection::Minimize.sign(), -1.0);
        assert_eq!(ObjectiveDirection::default(), ObjectiveDirection::Maximize);
    }

    #[test]
    fn direction_improves() {
        assert!(ObjectiveDirection::Maximize.improves(2.0, 1.0));
        assert!(!ObjectiveDirection::Maximize.improves(1.0, 1.0));
        assert!(ObjectiveDirection::Minimize.improves(0.5, 1.0));
    }

    #[test]
    fn aggregation_uses_absolute_steps() {
        let steps = [0.01, -0.03, 0.0];
        let sum = MagnitudeAggregation::Sum.aggregate(steps);
        assert!((sum - 0.04).abs() < 1e-12);
        assert_eq!(MagnitudeAggregation::Max.aggregate(steps), 0.03);
    }

    #[test]
    fn aggregation_of_nothing_is_zero() {
        assert_eq!(MagnitudeAggregation::Sum.aggregate(Vec::<f64>::new()), 0.0);
        assert_eq!(MagnitudeAggregation::Max.aggregate(Vec::<f64>::new()), 0.0);
    }
}
