//! Searches for the minimum of the Three-Hump Camel function.
//!
//! Environment:
//! - `DFO_CONFIG`: JSON run file `{ "config": {...}, "parameters": [...] }`
//! - `DFO_OUTPUT`: where to write the tuned parameters as JSON
//! - `RUST_LOG`: log filter (default `info`)

use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dfo_optimizer::{
    ObjectiveDirection, OptimizeConfig, Optimizer, Parameter, ParameterData, ParameterSpec,
    TracingStatus,
};

/// A complete run description as read from `DFO_CONFIG`.
#[derive(Debug, Clone, Deserialize)]
struct RunFile {
    #[serde(default)]
    config: OptimizeConfig,
    parameters: Vec<ParameterSpec>,
}

impl Default for RunFile {
    fn default() -> Self {
        Self {
            config: OptimizeConfig::new()
                .with_epochs(20_000)
                .with_every(10)
                .with_status_on_finish(true)
                .with_epsilon(0.0005)
                .with_batch_size(100)
                .with_direction(ObjectiveDirection::Minimize),
            parameters: vec![
                ParameterSpec::continuous("x", -2.0, 2.0),
                ParameterSpec::continuous("y", -2.0, 2.0),
            ],
        }
    }
}

/// Three-Hump Camel, see <https://www.sfu.ca/~ssurjano/camel3.html>.
fn three_hump_camel(x1: f64, x2: f64) -> f64 {
    2.0 * x1.powi(2) - 1.05 * x1.powi(4) + x1.powi(6) / 6.0 + x1 * x2 + x2.powi(2)
}

fn load_run() -> anyhow::Result<RunFile> {
    let Ok(path) = std::env::var("DFO_CONFIG") else {
        return Ok(RunFile::default());
    };
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let run: RunFile =
        serde_json::from_str(&text).with_context(|| format!("parsing run file {path}"))?;
    info!("Loaded run configuration from {}", path);
    Ok(run)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let run = load_run()?;
    if run.parameters.len() != 2 {
        bail!(
            "the Three-Hump Camel takes 2 inputs, run file names {}",
            run.parameters.len()
        );
    }

    let epochs = run.config.epochs;
    let agent = |v: &[f64]| three_hump_camel(v[0], v[1]);
    let mut optimizer = Optimizer::from_specs(&run.parameters, agent, run.config)?
        .with_status(TracingStatus::with_budget(epochs));

    let iterations = optimizer.run()?;
    let inputs = optimizer.values();
    info!(
        "Found minimum after {} iterations. Input: {:?} Output: {}",
        iterations,
        inputs,
        three_hump_camel(inputs[0], inputs[1])
    );
    for parameter in optimizer.parameters() {
        info!("{}", parameter);
    }

    if let Ok(path) = std::env::var("DFO_OUTPUT") {
        let exported: Vec<ParameterData> =
            optimizer.parameters().iter().map(Parameter::export).collect();
        std::fs::write(&path, serde_json::to_string_pretty(&exported)?)
            .with_context(|| format!("writing {path}"))?;
        info!("Wrote tuned parameters to {}", path);
    }

    if let Some(report) = optimizer.report() {
        println!("{}", serde_json::to_string_pretty(report)?);
    }

    Ok(())
}
