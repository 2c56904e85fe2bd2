//! End-to-end walkthrough: optimize a quadratic objective with a synthetic
//! flat shelf, then decode discrete candidates from the optimum.
//!
//! Run with `RUST_LOG=info cargo run --example quadratic_bowl`.

use anyhow::Result;
use serde_json::json;
use tn_engine::{FnObjective, Optimizer};
use tracing_subscriber::EnvFilter;

use tn_types::{EngineConfig, LatentPoint};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let target = LatentPoint::new(vec![2.0, -1.0]);

    // Flat shelf of radius 0.6 around the origin where the model is unsure;
    // a quadratic bowl around the target everywhere else.
    let shelf_target = target.clone();
    let objective = FnObjective::new(
        move |p: &LatentPoint| {
            if p.l2_norm() <= 0.6 {
                0.0
            } else {
                -p.distance(&shelf_target).powi(2)
            }
        },
        |p: &LatentPoint| if p.l2_norm() <= 0.6 { 1.0 } else { 0.0 },
    );

    let config = EngineConfig::new()
        .with_learning_rate(0.1)
        .with_sigma(0.5)
        .with_plateau_window(3)
        .with_stagnation_thresholds(0.25, 0.05, 0.5)
        .with_max_iterations(120)
        .with_seed(7);

    let mut optimizer = Optimizer::new(config.clone(), objective)?;
    let report = optimizer.run(LatentPoint::zeros(2))?;

    println!(
        "run {} finished in {:?}: {} iterations, {} escapes, final point {} (objective {:.4})",
        report.id,
        report.state,
        report.trajectory.len() - 1,
        report.escapes,
        report.final_point,
        report.final_objective
    );

    // Decode the optimum into discrete dosing plans and validate them.
    use tn_decoder::{CandidateDecoder, FnDecoder, OutputConstraint};
    use tn_types::ConstraintKind;

    let decode = FnDecoder::new(|p: &LatentPoint| {
        json!({
            "dose_mg": (p.coords()[0].abs() * 10.0).round(),
            "interval_hours": if p.coords()[1] > 0.0 { 12 } else { 8 },
        })
    });
    let constraints = vec![OutputConstraint::new(
        ConstraintKind::new("dose_range"),
        |output: &serde_json::Value| output["dose_mg"].as_f64().is_some_and(|d| d <= 40.0),
    )];

    use rand::SeedableRng;
    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(config.seed.unwrap_or(0));
    let candidates = CandidateDecoder::from_config(&config).decode_candidates(
        &report.final_point,
        &decode,
        &constraints,
        &mut rng,
    )?;

    for (i, candidate) in candidates.iter().enumerate() {
        println!(
            "candidate {i}: {} (valid: {}, violated: {:?})",
            candidate.output, candidate.valid, candidate.violated
        );
    }

    Ok(())
}
