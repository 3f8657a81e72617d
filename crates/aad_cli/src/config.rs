//! Engine configuration assembly.
//!
//! Priority (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (`AAD_*`)
//! 3. Configuration file (TOML)
//! 4. Defaults

use std::path::PathBuf;

use stochastic_aad::{AadConfig, DiscontinuityPolicy};
use tracing::debug;

use crate::{CliError, Result};

/// Engine overrides taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Config file path
    pub config_file: Option<PathBuf>,
    /// Discontinuity policy name
    pub policy: Option<String>,
    /// Window half-width per standard deviation
    pub window_width: Option<f64>,
    /// Density regression degree
    pub regression_degree: Option<usize>,
    /// Density histogram buckets
    pub density_buckets: Option<usize>,
}

/// Builds the engine configuration from all sources.
pub fn build_config(cli: &CliArgs) -> Result<AadConfig> {
    let base = match &cli.config_file {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration file");
            AadConfig::from_file(path)?
        }
        None => AadConfig::default(),
    };

    let with_env = base.with_env_overrides()?;
    apply_cli(&with_env, cli)
}

/// Applies command line overrides on top of `config`.
pub fn apply_cli(config: &AadConfig, cli: &CliArgs) -> Result<AadConfig> {
    let mut builder = config.to_builder();

    if let Some(policy) = &cli.policy {
        builder = builder.discontinuity_policy(parse_policy(policy)?);
    }
    if let Some(width) = cli.window_width {
        builder = builder.window_width_per_std_dev(width);
    }
    if let Some(degree) = cli.regression_degree {
        builder = builder.regression_degree(degree);
    }
    if let Some(buckets) = cli.density_buckets {
        builder = builder.density_buckets(buckets);
    }

    Ok(builder.build()?)
}

/// Parses a policy name, accepting `discrete-delta` as well as `DISCRETE_DELTA`.
pub fn parse_policy(name: &str) -> Result<DiscontinuityPolicy> {
    name.parse::<DiscontinuityPolicy>().map_err(|_| {
        let known: Vec<&str> = DiscontinuityPolicy::ALL.iter().map(|p| p.name()).collect();
        CliError::InvalidArgument(format!(
            "unknown discontinuity policy '{}'. Supported: {}",
            name,
            known.join(", ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = CliArgs {
            policy: Some("regression-on-density".to_string()),
            window_width: Some(0.3),
            density_buckets: Some(20),
            ..Default::default()
        };

        let config = apply_cli(&AadConfig::default(), &cli).unwrap();
        assert_eq!(
            config.discontinuity_policy(),
            DiscontinuityPolicy::RegressionOnDensity
        );
        assert_eq!(config.window_width_per_std_dev(), 0.3);
        assert_eq!(config.density_buckets(), 20);
        assert_eq!(config.regression_degree(), 2);
    }

    #[test]
    fn test_empty_cli_keeps_config() {
        let base = AadConfig::builder()
            .discontinuity_policy(DiscontinuityPolicy::One)
            .build()
            .unwrap();
        let config = apply_cli(&base, &CliArgs::default()).unwrap();
        assert_eq!(config, base);
    }

    #[test]
    fn test_unknown_policy_lists_alternatives() {
        let error = parse_policy("kernel").unwrap_err();
        let message = error.to_string();
        assert!(message.contains("kernel"));
        assert!(message.contains("DISCRETE_DELTA"));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let cli = CliArgs {
            window_width: Some(-1.0),
            ..Default::default()
        };
        assert!(matches!(
            apply_cli(&AadConfig::default(), &cli),
            Err(CliError::Config(_))
        ));
    }
}
