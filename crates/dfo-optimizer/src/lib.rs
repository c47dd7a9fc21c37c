//! # dfo-optimizer
//!
//! Stochastic derivative-free optimization of bounded parameters.
//!
//! Provides Adam step sizing, bounded parameters that estimate their own
//! gradient by local linear regression over sampled outcomes, the epoch loop
//! that drives them against an opaque agent, and status snapshots for
//! observing a run.

mod adam;
mod optimize;
mod parameter;
mod status;

pub use adam::{Adam, AdamConfig};
pub use optimize::{
    Agent, FallibleAgent, OptimizeConfig, Optimizer, RunId, RunReport, StopReason,
};
pub use parameter::{slope, Parameter, Sample, DEFAULT_PRECISION};
pub use status::{ParameterSnapshot, Status, StatusSnapshot, StopHandle, TracingStatus};

pub use dfo_types::{
    DfoError, DfoResult, MagnitudeAggregation, ObjectiveDirection, ParameterData,
    ParameterKind, ParameterSpec,
};
