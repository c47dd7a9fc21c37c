//! Progress reporting for a running optimization.
//!
//! The loop hands observers an owned [`StatusSnapshot`] so nothing they hold
//! on to can change underneath them on the next epoch.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use dfo_types::ParameterKind;

use crate::parameter::Parameter;

/// Copy of one parameter's observable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub value: f64,
    /// Step applied by the most recent update.
    pub changed: f64,
    pub kind: ParameterKind,
}

impl From<&Parameter> for ParameterSnapshot {
    fn from(parameter: &Parameter) -> Self {
        Self {
            name: parameter.name().to_string(),
            min: parameter.min(),
            max: parameter.max(),
            value: parameter.value(),
            changed: parameter.changed(),
            kind: parameter.kind(),
        }
    }
}

/// Everything an observer sees at one callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Epochs completed so far.
    pub iteration: usize,
    /// Aggregated step magnitude of the latest epoch.
    pub momentum: f64,
    pub parameters: Vec<ParameterSnapshot>,
    /// Agent outcome at the end of every epoch, oldest first.
    pub outcomes: Vec<f64>,
}

impl StatusSnapshot {
    pub fn latest_outcome(&self) -> Option<f64> {
        self.outcomes.last().copied()
    }

    /// `name: v=… g=…` for every parameter, space separated.
    pub fn parameter_line(&self) -> String {
        self.parameters
            .iter()
            .map(|p| format!("{}: v={} g={:.4}", p.name, p.value, p.changed))
            .collect::<Vec<_>>()
            .join("  ")
    }
}

/// Observer invoked periodically by the optimization loop.
pub trait Status {
    fn status(&mut self, snapshot: &StatusSnapshot);
}

impl<F> Status for F
where
    F: FnMut(&StatusSnapshot),
{
    fn status(&mut self, snapshot: &StatusSnapshot) {
        self(snapshot)
    }
}

/// Shared flag an observer can raise to end the run after the current epoch.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Logs each snapshot at `info` level, optionally against an epoch budget.
#[derive(Debug, Clone, Default)]
pub struct TracingStatus {
    epochs: Option<usize>,
}

impl TracingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report progress as `iteration/epochs`.
    pub fn with_budget(epochs: usize) -> Self {
        Self {
            epochs: Some(epochs),
        }
    }

    fn progress(&self, iteration: usize) -> String {
        match self.epochs {
            Some(total) => format!("{iteration}/{total}"),
            None => iteration.to_string(),
        }
    }
}

impl Status for TracingStatus {
    fn status(&mut self, snapshot: &StatusSnapshot) {
        let outcome = snapshot
            .latest_outcome()
            .map(|o| format!("{o:.6}"))
            .unwrap_or_else(|| "-".to_string());
        info!(
            "Iteration {} momentum={:.6} outcome={} | {}",
            self.progress(snapshot.iteration),
            snapshot.momentum,
            outcome,
            snapshot.parameter_line()
        );
    }
}
