//! Monte Carlo digital option delta under each discontinuity policy.
//!
//! The payoff `e^{-rT}·1{S_T ≥ K}` has no pathwise derivative; the policies
//! replace the Dirac impulse of the indicator. The estimated delta is compared
//! with the Black-Scholes closed form `e^{-rT}·φ(d₂)/(S₀σ√T)`.

use std::f64::consts::PI;

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use stochastic_aad::{AadConfig, AadFactory, DiscontinuityPolicy};
use stochastic_core::RandomVariable;

const SPOT: f64 = 100.0;
const STRIKE: f64 = 100.0;
const RATE: f64 = 0.02;
const VOLATILITY: f64 = 0.2;
const MATURITY: f64 = 1.0;
const PATHS: usize = 100_000;

fn analytic_delta() -> f64 {
    let sqrt_t = MATURITY.sqrt();
    let d2 = ((SPOT / STRIKE).ln() + (RATE - 0.5 * VOLATILITY * VOLATILITY) * MATURITY)
        / (VOLATILITY * sqrt_t);
    let density = (-0.5 * d2 * d2).exp() / (2.0 * PI).sqrt();
    (-RATE * MATURITY).exp() * density / (SPOT * VOLATILITY * sqrt_t)
}

/// Terminal growth factors `S_T / S₀`.
fn growth(seed: u64) -> RandomVariable {
    let mut rng = StdRng::seed_from_u64(seed);
    let drift = (RATE - 0.5 * VOLATILITY * VOLATILITY) * MATURITY;
    let diffusion = VOLATILITY * MATURITY.sqrt();
    let paths = (0..PATHS)
        .map(|_| {
            let z: f64 = StandardNormal.sample(&mut rng);
            (drift + diffusion * z).exp()
        })
        .collect();
    RandomVariable::from_paths(paths)
}

fn estimated_delta(config: AadConfig) -> f64 {
    let factory = AadFactory::new(config);
    let spot = factory.scalar(SPOT);
    let discount = (-RATE * MATURITY).exp();

    let terminal = spot.mult(&growth(42));
    let price = terminal
        .sub(&STRIKE)
        .choose(&1.0, &0.0)
        .mult(&discount)
        .average();

    let gradient = price.gradient(None).unwrap();
    gradient[&spot.id()].random_variable().mean()
}

fn config(policy: DiscontinuityPolicy, width: f64) -> AadConfig {
    AadConfig::builder()
        .discontinuity_policy(policy)
        .window_width_per_std_dev(width)
        .build()
        .unwrap()
}

#[test]
fn test_zero_policy_ignores_the_digital() {
    let delta = estimated_delta(config(DiscontinuityPolicy::Zero, 0.1));
    assert_eq!(delta, 0.0);
}

#[test]
fn test_discrete_delta() {
    let delta = estimated_delta(config(DiscontinuityPolicy::DiscreteDelta, 0.1));
    assert_relative_eq!(delta, analytic_delta(), max_relative = 0.08);
}

#[test]
fn test_regression_on_density() {
    let delta = estimated_delta(config(DiscontinuityPolicy::RegressionOnDensity, 0.2));
    assert!(delta.is_finite() && delta > 0.0);
    assert_relative_eq!(delta, analytic_delta(), max_relative = 0.08);
}

#[test]
fn test_regression_on_distribution() {
    let delta = estimated_delta(config(DiscontinuityPolicy::RegressionOnDistribution, 0.2));
    assert!(delta.is_finite() && delta > 0.0);
    assert_relative_eq!(delta, analytic_delta(), max_relative = 0.08);
}

#[test]
fn test_regression_with_unbounded_window_stays_finite() {
    let delta = estimated_delta(config(
        DiscontinuityPolicy::RegressionOnDensity,
        f64::INFINITY,
    ));
    assert!(delta.is_finite());
    assert!(delta > 0.0);
}

#[test]
fn test_one_policy_weights_every_path() {
    // ONE replaces the impulse by 1: the estimate is E[S_T/S₀]·e^{-rT} = 1.
    let delta = estimated_delta(config(DiscontinuityPolicy::One, 0.1));
    assert_relative_eq!(delta, 1.0, max_relative = 0.01);
}
