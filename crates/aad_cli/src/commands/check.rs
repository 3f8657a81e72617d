//! Check command implementation
//!
//! Prints the effective engine configuration and runs a small self-test of
//! the backward pass.

use stochastic_aad::{AadConfig, AadFactory, DiscontinuityPolicy, IdGenerator};
use tracing::info;

use crate::{CliError, Result};

/// Run the check command
pub fn run(config: &AadConfig) -> Result<()> {
    info!("Checking engine configuration...");

    println!("Effective configuration");
    println!("  discontinuity_policy     = {}", config.discontinuity_policy());
    println!(
        "  window_width_per_std_dev = {}",
        config.window_width_per_std_dev()
    );
    println!("  regression_degree        = {}", config.regression_degree());
    println!("  density_buckets          = {}", config.density_buckets());
    println!("  retain_leaves_only       = {}", config.retain_leaves_only());
    println!();

    let policies: Vec<&str> = DiscontinuityPolicy::ALL.iter().map(|p| p.name()).collect();
    println!("Available policies: {}", policies.join(", "));

    self_test(config)?;
    println!("Self-test: ok (next id {})", IdGenerator::global().peek());

    info!("Check complete");
    Ok(())
}

/// Differentiates `x^2 + y^3` at `(5, 2)` and compares with `{10, 12}`.
fn self_test(config: &AadConfig) -> Result<()> {
    let factory = AadFactory::new(config.clone());
    let x = factory.scalar(5.0);
    let y = factory.scalar(2.0);
    let z = x.pow(&2.0).add(&y.pow(&3.0));

    let gradient = z.gradient(None)?;
    let expected = [(x.id(), 10.0), (y.id(), 12.0)];
    for (id, value) in expected {
        let actual = gradient
            .get(&id)
            .map(|derivative| derivative.random_variable().get(0))
            .unwrap_or(f64::NAN);
        if (actual - value).abs() > 1e-9 {
            return Err(CliError::InvalidArgument(format!(
                "self-test failed: derivative {} expected {}",
                actual, value
            )));
        }
    }
    Ok(())
}
