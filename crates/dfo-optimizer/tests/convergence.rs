use std::cell::RefCell;
use std::rc::Rc;

use dfo_optimizer::{
    MagnitudeAggregation, OptimizeConfig, Optimizer, Parameter, ParameterData, ParameterSpec,
    StatusSnapshot, StopReason,
};

fn shifted_parabola(x: &[f64]) -> f64 {
    (x[0] - 3.0).powi(2)
}

#[test]
fn minimizes_shifted_parabola() {
    let epochs = 5000;
    let parameters = vec![Parameter::new("x", -10.0, 10.0, Some(0.0)).unwrap()];
    let config = OptimizeConfig::new()
        .with_epochs(epochs)
        .with_batch_size(500)
        .with_epsilon(1e-5)
        .with_seed(42);
    let mut optimizer = Optimizer::minimize(parameters, shifted_parabola, config).unwrap();

    let iterations = optimizer.run().unwrap();

    let x = optimizer.values()[0];
    assert!((x - 3.0).abs() < 0.1, "x = {x}");
    assert!(iterations < epochs, "ran the full budget");
    assert_eq!(
        optimizer.report().unwrap().stop_reason,
        StopReason::Converged
    );
}

#[test]
fn small_batches_converge_on_parabola_for_every_seed() {
    let epochs = 5000;
    let specs = [ParameterSpec::continuous("x", -10.0, 10.0)];
    for batch_size in [20, 21] {
        for seed in 0..30 {
            let config = OptimizeConfig::new()
                .with_epochs(epochs)
                .with_batch_size(batch_size)
                .with_epsilon(1e-4)
                .with_seed(seed);
            let mut optimizer =
                Optimizer::from_specs(&specs, shifted_parabola, config).unwrap();

            let iterations = optimizer.run().unwrap();

            let x = optimizer.values()[0];
            assert!(
                (x - 3.0).abs() < 0.1,
                "batch {batch_size} seed {seed}: x = {x} after {iterations} iterations"
            );
            assert_eq!(
                optimizer.report().unwrap().stop_reason,
                StopReason::Converged,
                "batch {batch_size} seed {seed}"
            );
        }
    }
}

#[test]
fn maximizes_inverted_bowl() {
    let parameters = vec![
        Parameter::new("x", -5.0, 5.0, Some(4.0)).unwrap(),
        Parameter::new("y", -5.0, 5.0, Some(-4.0)).unwrap(),
    ];
    let config = OptimizeConfig::new()
        .with_epochs(3000)
        .with_batch_size(200)
        .with_epsilon(1e-4)
        .with_seed(7);
    let mut optimizer = Optimizer::maximize(
        parameters,
        |v: &[f64]| -(v[0] * v[0] + v[1] * v[1]),
        config,
    )
    .unwrap();

    let iterations = optimizer.run().unwrap();
    assert!(iterations <= 3000);

    let values = optimizer.values();
    assert!(values[0].abs() < 0.1, "x = {}", values[0]);
    assert!(values[1].abs() < 0.1, "y = {}", values[1]);
    let report = optimizer.report().unwrap();
    assert!(report.best_outcome.unwrap() > -0.02);
}

#[test]
fn integer_parameter_settles_on_whole_optimum() {
    let parameters = vec![Parameter::integer("n", 0.0, 20.0, Some(2.0)).unwrap()];
    let config = OptimizeConfig::new()
        .with_epochs(2000)
        .with_batch_size(100)
        .with_epsilon(1e-5)
        .with_seed(3);
    let mut optimizer =
        Optimizer::maximize(parameters, |x: &[f64]| -(x[0] - 7.0).powi(2), config).unwrap();

    optimizer.run().unwrap();

    let n = optimizer.values()[0];
    assert_eq!(n.fract(), 0.0);
    assert!((n - 7.0).abs() <= 1.0, "n = {n}");
}

#[test]
fn static_parameter_is_left_alone() {
    let parameters = vec![
        Parameter::new("x", -5.0, 5.0, Some(2.0)).unwrap(),
        Parameter::fixed("offset", 1.5).unwrap(),
    ];
    let config = OptimizeConfig::new()
        .with_epochs(300)
        .with_batch_size(50)
        .with_aggregation(MagnitudeAggregation::Max)
        .with_seed(5);
    let mut optimizer = Optimizer::minimize(
        parameters,
        |v: &[f64]| (v[0] - v[1]).powi(2),
        config,
    )
    .unwrap();

    optimizer.run().unwrap();

    let values = optimizer.values();
    assert_eq!(values[1], 1.5);
    assert!((values[0] - 1.5).abs() < 0.5, "x = {}", values[0]);
}

#[test]
fn history_reported_to_status_matches_iterations() {
    let parameters = vec![Parameter::new("x", -10.0, 10.0, Some(-6.0)).unwrap()];
    let lengths = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&lengths);
    let config = OptimizeConfig::new()
        .with_epochs(200)
        .with_every(7)
        .with_status_on_finish(true)
        .with_batch_size(20)
        .with_seed(9);
    let mut optimizer =
        Optimizer::minimize(parameters, |x: &[f64]| x[0].abs(), config)
            .unwrap()
            .with_status(move |s: &StatusSnapshot| {
                sink.borrow_mut().push((s.iteration, s.outcomes.len()))
            });

    let iterations = optimizer.run().unwrap();

    let lengths = lengths.borrow();
    assert!(!lengths.is_empty());
    assert!(lengths.iter().all(|(iteration, len)| iteration == len));
    assert!(lengths.windows(2).all(|w| w[0].1 < w[1].1));
    assert_eq!(lengths.last().unwrap().0, iterations);
}

#[test]
fn tuned_parameters_survive_a_json_round_trip() {
    let parameters = vec![
        Parameter::new("rate", 0.0, 1.0, Some(0.2)).unwrap(),
        Parameter::integer("depth", 1.0, 10.0, Some(3.0)).unwrap(),
    ];
    let config = OptimizeConfig::new()
        .with_epochs(50)
        .with_batch_size(20)
        .with_seed(1);
    let mut optimizer = Optimizer::maximize(
        parameters,
        |v: &[f64]| -(v[0] - 0.7).powi(2) - (v[1] - 6.0).powi(2),
        config,
    )
    .unwrap();
    optimizer.run().unwrap();

    let exported: Vec<ParameterData> = optimizer.parameters().iter().map(Parameter::export).collect();
    let json = serde_json::to_string_pretty(&exported).unwrap();
    let restored: Vec<Parameter> = serde_json::from_str::<Vec<ParameterData>>(&json)
        .unwrap()
        .into_iter()
        .map(|d| Parameter::import(d).unwrap())
        .collect();

    for (before, after) in optimizer.parameters().iter().zip(&restored) {
        assert_eq!(before.name(), after.name());
        assert_eq!(before.value(), after.value());
        assert_eq!(before.kind(), after.kind());
        assert!(after.samples().is_empty());
    }
}
