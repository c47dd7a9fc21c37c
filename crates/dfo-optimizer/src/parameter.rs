//! Bounded scalar parameters with their own sample buffer and Adam state.
//!
//! A [`Parameter`] proposes candidate values near its current position,
//! records what the agent returned for each one, estimates a local gradient
//! by linear regression over those pairs and moves itself with an Adam step.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use std::fmt;

use dfo_types::{
    config_error, DfoResult, ObjectiveDirection, ParameterData, ParameterKind, ParameterSpec,
};

use crate::adam::{Adam, AdamConfig};

/// Rounding granularity used when a spec does not name one.
pub const DEFAULT_PRECISION: f64 = 0.001;

/// One observed (candidate value, agent outcome) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub outcome: f64,
}

/// Least-squares slope of outcome against value.
///
/// Zero when the fit is degenerate (every sampled value identical) or the
/// sums overflowed.
pub fn slope(samples: &[Sample]) -> f64 {
    let (mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0);
    for s in samples {
        sx += s.value;
        sy += s.outcome;
        sxx += s.value * s.value;
        sxy += s.value * s.outcome;
    }
    let n = samples.len() as f64;
    let run = n * sxx - sx * sx;
    let rise = n * sxy - sx * sy;
    if run == 0.0 {
        return 0.0;
    }
    let gradient = rise / run;
    if gradient.is_finite() {
        gradient
    } else {
        0.0
    }
}

/// Draw from a normal with mean 0.5 and deviation 0.1, redrawn until it
/// falls inside [0, 1].
fn unit_normal<R: Rng>(rng: &mut R) -> f64 {
    loop {
        let z: f64 = StandardNormal.sample(rng);
        let u = 0.5 + z / 10.0;
        if (0.0..=1.0).contains(&u) {
            return u;
        }
    }
}

/// Snap `x` to a multiple of `precision` without leaving binary noise in
/// the trailing digits when `1 / precision` is whole.
fn round_to_precision(x: f64, precision: f64) -> f64 {
    let inverse = (1.0 / precision).round();
    if inverse >= 1.0 && (inverse * precision - 1.0).abs() < 1e-9 {
        (x * inverse).round() / inverse
    } else {
        (x / precision).round() * precision
    }
}

/// A bounded, tunable input of the agent.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    min: f64,
    max: f64,
    precision: f64,
    kind: ParameterKind,
    raw: f64,
    samples: Vec<Sample>,
    optimizer: Adam,
    changed: f64,
    /// Unit draw owed to the next `suggest`, mirroring the previous one.
    mirror: Option<f64>,
}

impl Parameter {
    /// Continuous parameter. Starts at `value` (clamped into bounds) or at a
    /// uniformly random point when `value` is `None`.
    pub fn new(
        name: impl Into<String>,
        min: f64,
        max: f64,
        value: Option<f64>,
    ) -> DfoResult<Self> {
        let mut spec = ParameterSpec::continuous(name, min, max);
        spec.value = value;
        Self::from_spec(&spec, &mut rand::rng())
    }

    /// Whole-number parameter with inclusive integer bounds.
    pub fn integer(
        name: impl Into<String>,
        min: f64,
        max: f64,
        value: Option<f64>,
    ) -> DfoResult<Self> {
        let mut spec = ParameterSpec::integer(name, min, max);
        spec.value = value;
        Self::from_spec(&spec, &mut rand::rng())
    }

    /// Parameter pinned to `value`; never explored or updated.
    pub fn fixed(name: impl Into<String>, value: f64) -> DfoResult<Self> {
        Self::from_spec(&ParameterSpec::fixed(name, value), &mut rand::rng())
    }

    /// Build from a spec, drawing a missing start value from `rng`.
    pub fn from_spec<R: Rng>(spec: &ParameterSpec, rng: &mut R) -> DfoResult<Self> {
        if spec.name.trim().is_empty() {
            return Err(config_error!("parameter name must not be empty"));
        }
        if let Some(value) = spec.value {
            if !value.is_finite() {
                return Err(config_error!(
                    "parameter '{}' has non-finite start value {}",
                    spec.name,
                    value
                ));
            }
        }

        let (min, max) = match spec.kind {
            ParameterKind::Static => {
                let fixed = spec.value.unwrap_or(spec.min);
                (fixed, fixed)
            }
            _ => (spec.min, spec.max),
        };
        if !(min.is_finite() && max.is_finite()) {
            return Err(config_error!(
                "parameter '{}' has non-finite bounds [{}, {}]",
                spec.name,
                min,
                max
            ));
        }
        if min > max {
            return Err(config_error!(
                "parameter '{}' has min {} greater than max {}",
                spec.name,
                min,
                max
            ));
        }
        if !(max - min).is_finite() {
            return Err(config_error!(
                "parameter '{}' has a range [{}, {}] too wide to sample",
                spec.name,
                min,
                max
            ));
        }
        if spec.kind == ParameterKind::Integer && (min.fract() != 0.0 || max.fract() != 0.0) {
            return Err(config_error!(
                "integer parameter '{}' needs whole-number bounds, got [{}, {}]",
                spec.name,
                min,
                max
            ));
        }

        let precision = spec.precision.unwrap_or(DEFAULT_PRECISION);
        if !(precision.is_finite() && precision > 0.0) {
            return Err(config_error!(
                "parameter '{}' has non-positive precision {}",
                spec.name,
                precision
            ));
        }

        let mut parameter = Self {
            name: spec.name.clone(),
            min,
            max,
            precision,
            kind: spec.kind,
            raw: min,
            samples: Vec::new(),
            optimizer: Adam::default(),
            changed: 0.0,
            mirror: None,
        };
        let start = match spec.value {
            Some(value) => value,
            None => parameter.random(rng),
        };
        parameter.set(start);
        Ok(parameter)
    }

    /// Rebuild a parameter from an exported record. Optimizer state starts
    /// from zero.
    pub fn import(data: ParameterData) -> DfoResult<Self> {
        Self::from_spec(&ParameterSpec::from(data), &mut rand::rng())
    }

    pub fn export(&self) -> ParameterData {
        ParameterData {
            name: self.name.clone(),
            min: self.min,
            max: self.max,
            value: self.value(),
            kind: self.kind,
        }
    }

    /// Install a fresh Adam state with `config` unless it is already in use.
    pub fn configure_optimizer(&mut self, config: AdamConfig) {
        if *self.optimizer.config() != config {
            self.optimizer = Adam::new(config);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn precision(&self) -> f64 {
        self.precision
    }

    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    pub fn is_static(&self) -> bool {
        self.kind == ParameterKind::Static
    }

    /// Unrounded internal position.
    pub fn raw(&self) -> f64 {
        self.raw
    }

    /// Step applied by the most recent update.
    pub fn changed(&self) -> f64 {
        self.changed
    }

    /// Samples recorded since the value was last set.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Uniform draw from the bounds.
    pub fn random<R: Rng>(&self, rng: &mut R) -> f64 {
        match self.kind {
            ParameterKind::Static => self.raw,
            ParameterKind::Continuous => self.uniform(rng),
            ParameterKind::Integer => self.uniform(rng).round(),
        }
    }

    fn uniform<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.min < self.max {
            rng.random_range(self.min..=self.max)
        } else {
            self.min
        }
    }

    /// The value the agent and the caller observe.
    pub fn value(&self) -> f64 {
        let shown = match self.kind {
            ParameterKind::Static => return self.raw,
            ParameterKind::Continuous => round_to_precision(self.raw, self.precision),
            ParameterKind::Integer => self.raw.round(),
        };
        shown.clamp(self.min, self.max)
    }

    /// Move to `value` (clamped) and discard samples taken at the old position.
    pub fn set(&mut self, value: f64) {
        if !value.is_nan() {
            self.raw = value.clamp(self.min, self.max);
        }
        self.samples.clear();
        self.mirror = None;
    }

    /// Candidate near the current position, scaled by the full range.
    ///
    /// Draws come in mirrored pairs: every second call reflects the previous
    /// offset through the current position. Over a full pair the offsets
    /// cancel, which keeps curvature out of the regression slope.
    pub fn suggest<R: Rng>(&mut self, rng: &mut R) -> f64 {
        if self.is_static() {
            return self.raw;
        }
        let u = match self.mirror.take() {
            Some(u) => 1.0 - u,
            None => {
                let u = unit_normal(rng);
                self.mirror = Some(u);
                u
            }
        };
        let width = self.max - self.min;
        let candidate = (self.raw - width / 2.0 + width * u).clamp(self.min, self.max);
        match self.kind {
            ParameterKind::Integer => candidate.round(),
            _ => candidate,
        }
    }

    /// The point `suggest` pairs are mirrored about.
    pub fn center(&self) -> f64 {
        match self.kind {
            ParameterKind::Integer => self.raw.round(),
            _ => self.raw,
        }
    }

    /// Record the agent's outcome for a candidate value.
    pub fn learn(&mut self, value: f64, outcome: f64) {
        if self.is_static() {
            return;
        }
        self.samples.push(Sample { value, outcome });
    }

    /// Regression slope over the recorded samples; zero below two samples.
    pub fn gradient(&self) -> f64 {
        if self.is_static() || self.samples.len() < 2 {
            return 0.0;
        }
        slope(&self.samples)
    }

    /// Take one Adam step along the estimated gradient, oriented by
    /// `direction`. Clears the sample buffer.
    pub fn update(&mut self, direction: ObjectiveDirection) {
        if self.is_static() {
            return;
        }
        let gradient = direction.sign() * self.gradient();
        let step = self.optimizer.update(gradient);
        self.changed = step;
        self.set(self.raw + step);
    }
}

fn four_places(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_static() {
            return write!(f, "{}: v={} g=0", self.name, self.raw);
        }
        write!(
            f,
            "{}: v={} g={}",
            self.name,
            four_places(self.value()),
            four_places(self.changed)
        )
    }
}
