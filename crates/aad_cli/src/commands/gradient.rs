//! Gradient command implementation
//!
//! Prices a cash-or-nothing digital call by Monte Carlo with a differentiable
//! spot and reports the adjoint delta under one or all discontinuity
//! policies, next to the Black-Scholes closed form.

use std::f64::consts::PI;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use serde::Serialize;
use stochastic_aad::{AadConfig, AadFactory, DiscontinuityPolicy};
use stochastic_core::RandomVariable;
use tracing::{debug, info};

use crate::{CliError, Result};

/// Digital call under geometric Brownian motion, paying 1 if `S_T ≥ K`.
#[derive(Debug, Clone, Copy)]
pub struct DigitalOption {
    /// Initial spot
    pub spot: f64,
    /// Strike
    pub strike: f64,
    /// Volatility
    pub volatility: f64,
    /// Continuously compounded rate
    pub rate: f64,
    /// Maturity in years
    pub maturity: f64,
}

impl DigitalOption {
    /// Validates the option parameters.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("spot", self.spot),
            ("strike", self.strike),
            ("volatility", self.volatility),
            ("maturity", self.maturity),
        ];
        for (name, value) in checks {
            if !(value.is_finite() && value > 0.0) {
                return Err(CliError::InvalidArgument(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if !self.rate.is_finite() {
            return Err(CliError::InvalidArgument(format!(
                "rate must be finite, got {}",
                self.rate
            )));
        }
        Ok(())
    }

    /// Closed-form delta `e^{-rT}·φ(d₂)/(S₀σ√T)`.
    pub fn analytic_delta(&self) -> f64 {
        let vol_sqrt_t = self.volatility * self.maturity.sqrt();
        let d2 = ((self.spot / self.strike).ln()
            + (self.rate - 0.5 * self.volatility * self.volatility) * self.maturity)
            / vol_sqrt_t;
        let density = (-0.5 * d2 * d2).exp() / (2.0 * PI).sqrt();
        (-self.rate * self.maturity).exp() * density / (self.spot * vol_sqrt_t)
    }

    /// Terminal growth factors `S_T / S₀` for `paths` paths.
    fn growth(&self, paths: usize, seed: u64) -> RandomVariable {
        let mut rng = StdRng::seed_from_u64(seed);
        let drift = (self.rate - 0.5 * self.volatility * self.volatility) * self.maturity;
        let diffusion = self.volatility * self.maturity.sqrt();
        (0..paths)
            .map(|_| {
                let z: f64 = StandardNormal.sample(&mut rng);
                (drift + diffusion * z).exp()
            })
            .collect()
    }
}

/// Monte Carlo result for one policy.
#[derive(Debug, Clone, Serialize)]
pub struct Estimate {
    /// Policy name
    pub policy: String,
    /// Monte Carlo price
    pub price: f64,
    /// Adjoint delta
    pub delta: f64,
    /// Closed-form delta
    pub analytic_delta: f64,
    /// Backward pass time in milliseconds
    pub backward_ms: f64,
}

/// Prices the option and computes its delta with `config`.
pub fn estimate(
    option: &DigitalOption,
    growth: &RandomVariable,
    config: AadConfig,
) -> Result<Estimate> {
    let policy = config.discontinuity_policy();
    let factory = AadFactory::new(config);
    let spot = factory.scalar(option.spot);
    let discount = (-option.rate * option.maturity).exp();

    let price = spot
        .mult(growth)
        .sub(&option.strike)
        .choose(&1.0, &0.0)
        .mult(&discount)
        .average();

    let start = Instant::now();
    let gradient = price.gradient(None)?;
    let backward_ms = start.elapsed().as_secs_f64() * 1e3;

    let delta = gradient
        .get(&spot.id())
        .map(|derivative| derivative.random_variable().mean())
        .unwrap_or(0.0);
    debug!(%policy, delta, backward_ms, "delta computed");

    Ok(Estimate {
        policy: policy.name().to_string(),
        price: price.random_variable().get(0),
        delta,
        analytic_delta: option.analytic_delta(),
        backward_ms,
    })
}

/// Run the gradient command
pub fn run(
    option: &DigitalOption,
    paths: usize,
    seed: u64,
    config: &AadConfig,
    all_policies: bool,
    format: &str,
) -> Result<()> {
    option.validate()?;
    if paths < 2 {
        return Err(CliError::InvalidArgument(format!(
            "at least 2 paths are required, got {}",
            paths
        )));
    }

    info!("Starting gradient estimation...");
    info!("  Paths: {}", paths);
    info!("  Seed: {}", seed);

    let growth = option.growth(paths, seed);
    let policies: Vec<DiscontinuityPolicy> = if all_policies {
        DiscontinuityPolicy::ALL.to_vec()
    } else {
        vec![config.discontinuity_policy()]
    };

    let estimates = policies
        .into_iter()
        .map(|policy| {
            let config = config.to_builder().discontinuity_policy(policy).build()?;
            estimate(option, &growth, config)
        })
        .collect::<Result<Vec<_>>>()?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&estimates)?),
        "table" => print_table(&estimates),
        other => {
            return Err(CliError::InvalidArgument(format!(
                "Unknown format: {}. Supported: json, table",
                other
            )));
        }
    }

    info!("Gradient estimation complete");
    Ok(())
}

fn print_table(estimates: &[Estimate]) {
    println!();
    println!(
        "{:<28} {:>12} {:>12} {:>12} {:>12}",
        "Policy", "Price", "Delta", "Analytic", "Backward ms"
    );
    println!("{}", "-".repeat(80));
    for estimate in estimates {
        println!(
            "{:<28} {:>12.6} {:>12.6} {:>12.6} {:>12.2}",
            estimate.policy,
            estimate.price,
            estimate.delta,
            estimate.analytic_delta,
            estimate.backward_ms
        );
    }
}
