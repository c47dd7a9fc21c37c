//! The optimization loop and its run configuration.
//!
//! Each epoch visits the parameters in order. A parameter draws a batch of
//! mirrored candidates while every other input stays at its current value,
//! learns the agent's outcome for each, then takes one Adam step along the
//! regression slope. The run ends when the epoch's aggregated step magnitude drops to
//! `epsilon` or the epoch budget is spent.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use dfo_types::{
    config_error, AgentError, DfoError, DfoResult, MagnitudeAggregation, ObjectiveDirection,
    ParameterData, ParameterSpec,
};

use crate::adam::AdamConfig;
use crate::parameter::Parameter;
use crate::status::{ParameterSnapshot, Status, StatusSnapshot, StopHandle};

/// Unique optimization run identifier.
pub type RunId = Uuid;

/// The function being tuned: ordered parameter values in, scalar out.
pub trait Agent {
    fn evaluate(&mut self, inputs: &[f64]) -> Result<f64, AgentError>;
}

impl<F> Agent for F
where
    F: FnMut(&[f64]) -> f64,
{
    fn evaluate(&mut self, inputs: &[f64]) -> Result<f64, AgentError> {
        Ok(self(inputs))
    }
}

/// Wraps an agent closure that can fail.
pub struct FallibleAgent<F>(pub F);

impl<F, E> Agent for FallibleAgent<F>
where
    F: FnMut(&[f64]) -> Result<f64, E>,
    E: Into<AgentError>,
{
    fn evaluate(&mut self, inputs: &[f64]) -> Result<f64, AgentError> {
        (self.0)(inputs).map_err(Into::into)
    }
}

/// Settings for one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeConfig {
    /// Maximum number of epochs.
    pub epochs: usize,
    /// Invoke the status observer every this many epochs.
    pub every: usize,
    /// Also invoke the observer when the run ends off the cadence.
    pub status_on_finish: bool,
    /// Converged once the aggregated step magnitude is at or below this.
    pub epsilon: f64,
    /// Candidates sampled per parameter per epoch.
    pub batch_size: usize,
    pub direction: ObjectiveDirection,
    pub aggregation: MagnitudeAggregation,
    /// Seed for candidate sampling; entropy when `None`.
    pub seed: Option<u64>,
    pub adam: AdamConfig,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            epochs: 1000,
            every: 10,
            status_on_finish: false,
            epsilon: 0.0005,
            batch_size: 100,
            direction: ObjectiveDirection::Maximize,
            aggregation: MagnitudeAggregation::Sum,
            seed: None,
            adam: AdamConfig::default(),
        }
    }
}

impl OptimizeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epochs(mut self, n: usize) -> Self {
        self.epochs = n;
        self
    }

    pub fn with_every(mut self, n: usize) -> Self {
        self.every = n;
        self
    }

    pub fn with_status_on_finish(mut self, enabled: bool) -> Self {
        self.status_on_finish = enabled;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    pub fn with_direction(mut self, direction: ObjectiveDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_aggregation(mut self, aggregation: MagnitudeAggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_adam(mut self, adam: AdamConfig) -> Self {
        self.adam = adam;
        self
    }

    pub fn validate(&self) -> DfoResult<()> {
        if self.epochs == 0 {
            return Err(config_error!("epoch budget must be positive"));
        }
        if self.every == 0 {
            return Err(config_error!("status cadence must be positive"));
        }
        if self.batch_size == 0 {
            return Err(config_error!("batch size must be positive"));
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(config_error!(
                "convergence threshold must be a non-negative number, got {}",
                self.epsilon
            ));
        }
        self.adam.validate()
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Aggregated step magnitude fell to epsilon.
    Converged,
    /// Epoch budget spent.
    BudgetExhausted,
    /// An observer raised the stop handle.
    Cancelled,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub id: RunId,
    pub iterations: usize,
    pub stop_reason: StopReason,
    pub direction: ObjectiveDirection,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Outcome at the final parameter values.
    pub final_outcome: Option<f64>,
    /// Best end-of-epoch outcome seen during the run.
    pub best_outcome: Option<f64>,
    pub parameters: Vec<ParameterData>,
}

/// Drives the search for a single agent.
pub struct Optimizer<A> {
    parameters: Vec<Parameter>,
    agent: A,
    config: OptimizeConfig,
    status: Option<Box<dyn Status>>,
    rng: StdRng,
    outcomes: Vec<f64>,
    iteration: usize,
    momentum: f64,
    last_notified: usize,
    stop: StopHandle,
    report: Option<RunReport>,
}

impl<A: Agent> Optimizer<A> {
    pub fn new(parameters: Vec<Parameter>, agent: A, config: OptimizeConfig) -> DfoResult<Self> {
        let rng = config.rng();
        Self::build(parameters, agent, config, rng)
    }

    /// Search for the highest outcome.
    pub fn maximize(
        parameters: Vec<Parameter>,
        agent: A,
        config: OptimizeConfig,
    ) -> DfoResult<Self> {
        Self::new(
            parameters,
            agent,
            config.with_direction(ObjectiveDirection::Maximize),
        )
    }

    /// Search for the lowest outcome.
    pub fn minimize(
        parameters: Vec<Parameter>,
        agent: A,
        config: OptimizeConfig,
    ) -> DfoResult<Self> {
        Self::new(
            parameters,
            agent,
            config.with_direction(ObjectiveDirection::Minimize),
        )
    }

    /// Build parameters from specs. Missing start values are drawn from the
    /// run's own RNG, so a seeded config reproduces the whole run.
    pub fn from_specs(specs: &[ParameterSpec], agent: A, config: OptimizeConfig) -> DfoResult<Self> {
        let mut rng = config.rng();
        let parameters = specs
            .iter()
            .map(|spec| Parameter::from_spec(spec, &mut rng))
            .collect::<DfoResult<Vec<_>>>()?;
        Self::build(parameters, agent, config, rng)
    }

    fn build(
        mut parameters: Vec<Parameter>,
        agent: A,
        config: OptimizeConfig,
        rng: StdRng,
    ) -> DfoResult<Self> {
        config.validate()?;

        let mut names = HashSet::new();
        for parameter in &parameters {
            if !names.insert(parameter.name()) {
                return Err(config_error!(
                    "duplicate parameter name '{}'",
                    parameter.name()
                ));
            }
        }
        for parameter in &mut parameters {
            parameter.configure_optimizer(config.adam);
        }

        Ok(Self {
            parameters,
            agent,
            config,
            status: None,
            rng,
            outcomes: Vec::new(),
            iteration: 0,
            momentum: 0.0,
            last_notified: 0,
            stop: StopHandle::new(),
            report: None,
        })
    }

    /// Attach an observer called every `every` epochs.
    pub fn with_status<S>(mut self, status: S) -> Self
    where
        S: Status + 'static,
    {
        self.status = Some(Box::new(status));
        self
    }

    /// +1 when maximizing, -1 when minimizing.
    pub fn direction(&self) -> f64 {
        self.config.direction.sign()
    }

    pub fn config(&self) -> &OptimizeConfig {
        &self.config
    }

    /// Handle an observer can use to end the run early.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn into_parameters(self) -> Vec<Parameter> {
        self.parameters
    }

    /// Current caller-visible value of every parameter, in order.
    pub fn values(&self) -> Vec<f64> {
        self.parameters.iter().map(Parameter::value).collect()
    }

    /// End-of-epoch outcomes of the latest run.
    pub fn outcomes(&self) -> &[f64] {
        &self.outcomes
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Summary of the latest completed run.
    pub fn report(&self) -> Option<&RunReport> {
        self.report.as_ref()
    }

    /// Run epochs until convergence, budget exhaustion or a stop request.
    /// Returns the number of epochs executed.
    ///
    /// Each call starts a fresh run from the parameters' current values.
    pub fn run(&mut self) -> DfoResult<usize> {
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        self.iteration = 0;
        self.momentum = 0.0;
        self.last_notified = 0;
        self.outcomes.clear();
        self.stop.reset();
        self.report = None;

        info!(
            "Starting optimization run {}: {} parameters, {} epochs, batch size {}, {:?}",
            id,
            self.parameters.len(),
            self.config.epochs,
            self.config.batch_size,
            self.config.direction
        );

        let stop_reason = loop {
            let momentum = self.epoch()?;
            self.iteration += 1;
            self.momentum = momentum;
            debug!("Epoch {} step magnitude {}", self.iteration, momentum);

            if self.iteration % self.config.every == 0 {
                self.notify();
            }

            if self.stop.is_stopped() {
                break StopReason::Cancelled;
            }
            if momentum <= self.config.epsilon {
                break StopReason::Converged;
            }
            if self.iteration >= self.config.epochs {
                break StopReason::BudgetExhausted;
            }
        };

        if self.config.status_on_finish && self.last_notified != self.iteration {
            self.notify();
        }

        let report = RunReport {
            id,
            iterations: self.iteration,
            stop_reason,
            direction: self.config.direction,
            started_at,
            finished_at: Utc::now(),
            final_outcome: self.outcomes.last().copied(),
            best_outcome: self.best_outcome(),
            parameters: self.parameters.iter().map(Parameter::export).collect(),
        };
        info!(
            "Optimization run {} stopped after {} iterations: {:?}",
            id, report.iterations, report.stop_reason
        );
        self.report = Some(report);

        Ok(self.iteration)
    }

    /// One pass over every parameter. Returns the aggregated step magnitude.
    fn epoch(&mut self) -> DfoResult<f64> {
        let direction = self.config.direction;
        let batch_size = self.config.batch_size;
        let mut inputs = self.values();

        for index in 0..self.parameters.len() {
            if self.parameters[index].is_static() {
                continue;
            }
            for draw in 0..batch_size {
                // An odd batch spends its unpaired slot on the centre.
                let candidate = if batch_size % 2 == 1 && draw + 1 == batch_size {
                    self.parameters[index].center()
                } else {
                    self.parameters[index].suggest(&mut self.rng)
                };
                inputs[index] = candidate;
                let outcome = self.evaluate(&inputs)?;
                self.parameters[index].learn(candidate, outcome);
            }
            self.parameters[index].update(direction);
            inputs[index] = self.parameters[index].value();
        }

        let outcome = self.evaluate(&inputs)?;
        self.outcomes.push(outcome);

        Ok(self
            .config
            .aggregation
            .aggregate(self.parameters.iter().map(Parameter::changed)))
    }

    fn evaluate(&mut self, inputs: &[f64]) -> DfoResult<f64> {
        let epoch = self.iteration + 1;
        let outcome = match self.agent.evaluate(inputs) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Agent failed during epoch {}: {}", epoch, e);
                return Err(DfoError::Agent(e));
            }
        };
        if !outcome.is_finite() {
            warn!(
                "Agent returned {} for inputs {:?} during epoch {}",
                outcome, inputs, epoch
            );
            return Err(DfoError::NonFiniteOutcome {
                inputs: inputs.to_vec(),
                outcome,
            });
        }
        Ok(outcome)
    }

    fn notify(&mut self) {
        self.last_notified = self.iteration;
        let Some(status) = self.status.as_mut() else {
            return;
        };
        let snapshot = StatusSnapshot {
            iteration: self.iteration,
            momentum: self.momentum,
            parameters: self.parameters.iter().map(ParameterSnapshot::from).collect(),
            outcomes: self.outcomes.clone(),
        };
        status.status(&snapshot);
    }

    fn best_outcome(&self) -> Option<f64> {
        let direction = self.config.direction;
        self.outcomes.iter().copied().fold(None, |best, outcome| match best {
            Some(b) if !direction.improves(outcome, b) => Some(b),
            _ => Some(outcome),
        })
    }
}
