//! Pretrains and fine-tunes a small network on a synthetic quadrant problem.
//!
//! Usage: `train [seed] [output.json]`. Set `RUST_LOG=info` to follow
//! training.

use layerwise::trainer::{Logging, StopCondition, Trainer};
use layerwise::{rng, Activator, Architecture, Hyperparameters};

use log::{error, info};
use ndarray::{Array2, ArrayView2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::process;

fn generate_data<R: Rng>(
    num_samples: usize,
    rng: &mut R,
) -> layerwise::Result<(Array2<f64>, Array2<f64>)> {
    let noise = Normal::new(0.0, 0.1)?;
    let mut inputs = Array2::zeros((num_samples, 2));
    let mut targets = Array2::zeros((num_samples, 2));
    for (mut input, mut target) in inputs
        .axis_iter_mut(Axis(0))
        .zip(targets.axis_iter_mut(Axis(0)))
    {
        let theta = rng.random_range(0.0..2.0 * std::f64::consts::PI);
        let x = theta.cos() + noise.sample(rng);
        let y = theta.sin() + noise.sample(rng);
        input[0] = x;
        input[1] = y;
        let class = if x * y > 0.0 { 0 } else { 1 };
        target[class] = 1.0;
    }
    Ok((inputs, targets))
}

fn score(
    set_name: &str,
    network: &mut Architecture,
    inputs: ArrayView2<f64>,
    targets: ArrayView2<f64>,
) -> layerwise::Result<()> {
    let mut num_correct = 0;
    for (input, expected) in inputs.rows().into_iter().zip(targets.rows()) {
        let output = network.predict(input)?;
        let class = if output[0] > output[1] { 0 } else { 1 };
        if expected[class] == 1.0 {
            num_correct += 1;
        }
    }
    info!(
        "{} set results: {} of {} correct",
        set_name,
        num_correct,
        inputs.nrows()
    );
    Ok(())
}

fn run() -> layerwise::Result<()> {
    let mut args = std::env::args().skip(1);
    let seed = match args.next() {
        Some(arg) => arg.parse().map_err(|e| {
            layerwise::Error::InvalidConfig(format!("bad seed {:?}: {}", arg, e))
        })?,
        None => 0,
    };
    let output = args.next();
    let mut engine = rng::seeded(seed);

    let (inputs, targets) = generate_data(2_000, &mut engine)?;
    let mut network = Architecture::new();
    network.add_contractive(2, 5, Activator::Sigmoid, Activator::Linear, &mut engine)?;
    network.add_contractive(5, 5, Activator::Sigmoid, Activator::Linear, &mut engine)?;
    network.add_dense(5, 2, Activator::Softmax, &mut engine)?;

    let params = Hyperparameters {
        learning: 0.05,
        momentum: 0.5,
        contractive: true,
        jacobian_penalty: 0.05,
        ..Default::default()
    };
    let mut network = Trainer::new(network)
        .hyperparameters(params)
        .denoising(true)
        .logging(Logging::Iterations(10))
        .stop_condition(StopCondition::Iterations(20))
        .pretrain(inputs.view(), &mut engine)?
        .stop_condition(StopCondition::Iterations(100))
        .train(inputs.view(), targets.view())?;

    score("Training", &mut network, inputs.view(), targets.view())?;
    let (test_inputs, test_targets) = generate_data(500, &mut engine)?;
    score("Test", &mut network, test_inputs.view(), test_targets.view())?;

    if let Some(path) = output {
        network.save_json(&path)?;
        info!("saved network to {}", path);
    }
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        error!("{}", e);
        process::exit(1);
    }
}
