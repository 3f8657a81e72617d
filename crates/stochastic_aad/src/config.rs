//! Adjoint engine configuration.
//!
//! [`AadConfig`] carries the settings consulted during the backward pass:
//! the discontinuity policy and its window and regression parameters, and
//! whether intermediate derivatives are discarded once propagated.
//!
//! Sources, lowest to highest precedence:
//! 1. Defaults
//! 2. TOML file ([`AadConfig::from_file`], [`AadConfig::from_toml_str`])
//! 3. Environment variables ([`AadConfig::with_env_overrides`])
//!
//! | Variable | Field |
//! |---|---|
//! | `AAD_DISCONTINUITY_POLICY` | `discontinuity_policy` |
//! | `AAD_WINDOW_WIDTH_PER_STD_DEV` | `window_width_per_std_dev` |
//! | `AAD_REGRESSION_DEGREE` | `regression_degree` |
//! | `AAD_DENSITY_BUCKETS` | `density_buckets` |
//! | `AAD_RETAIN_LEAVES_ONLY` | `retain_leaves_only` |

#[cfg(feature = "serde")]
use std::path::Path;

use crate::error::ConfigError;
use crate::policy::DiscontinuityPolicy;

/// Default window half-width in standard deviations of the trigger.
pub const DEFAULT_WINDOW_WIDTH_PER_STD_DEV: f64 = 0.05;

/// Default degree of the density regression polynomial.
pub const DEFAULT_REGRESSION_DEGREE: usize = 2;

/// Default number of histogram buckets for the density regression.
pub const DEFAULT_DENSITY_BUCKETS: usize = 10;

/// Maximum degree of the density regression polynomial.
pub const MAX_REGRESSION_DEGREE: usize = 8;

/// Maximum number of histogram buckets.
pub const MAX_DENSITY_BUCKETS: usize = 10_000;

/// Environment variable names.
pub mod env {
    /// Discontinuity policy name.
    pub const DISCONTINUITY_POLICY: &str = "AAD_DISCONTINUITY_POLICY";
    /// Window half-width per standard deviation (`inf` allowed).
    pub const WINDOW_WIDTH_PER_STD_DEV: &str = "AAD_WINDOW_WIDTH_PER_STD_DEV";
    /// Regression polynomial degree.
    pub const REGRESSION_DEGREE: &str = "AAD_REGRESSION_DEGREE";
    /// Histogram bucket count.
    pub const DENSITY_BUCKETS: &str = "AAD_DENSITY_BUCKETS";
    /// Leaf-retention mode (`true`/`false`).
    pub const RETAIN_LEAVES_ONLY: &str = "AAD_RETAIN_LEAVES_ONLY";
}

/// Adjoint engine configuration.
///
/// Immutable once built; values share it through an `Arc`. Use
/// [`AadConfigBuilder`] to construct instances.
///
/// # Examples
///
/// ```rust
/// use stochastic_aad::{AadConfig, DiscontinuityPolicy};
///
/// let config = AadConfig::builder()
///     .discontinuity_policy(DiscontinuityPolicy::RegressionOnDensity)
///     .window_width_per_std_dev(0.2)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.regression_degree(), 2);
/// assert!(config.retain_leaves_only());
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "ConfigFile", into = "ConfigFile"))]
pub struct AadConfig {
    /// Replacement for the derivative of `choose` with respect to its trigger.
    discontinuity_policy: DiscontinuityPolicy,
    /// Window half-width in standard deviations of the trigger.
    window_width_per_std_dev: f64,
    /// Degree of the density regression polynomial.
    regression_degree: usize,
    /// Histogram buckets for the density regression.
    density_buckets: usize,
    /// Discard intermediate derivatives once propagated.
    retain_leaves_only: bool,
}

impl AadConfig {
    /// Creates a new configuration builder with default values.
    #[inline]
    pub fn builder() -> AadConfigBuilder {
        AadConfigBuilder::default()
    }

    /// Returns a builder initialised from this configuration.
    pub fn to_builder(&self) -> AadConfigBuilder {
        AadConfigBuilder {
            discontinuity_policy: self.discontinuity_policy,
            window_width_per_std_dev: self.window_width_per_std_dev,
            regression_degree: self.regression_degree,
            density_buckets: self.density_buckets,
            retain_leaves_only: self.retain_leaves_only,
        }
    }

    /// Returns the discontinuity policy.
    #[inline]
    pub fn discontinuity_policy(&self) -> DiscontinuityPolicy {
        self.discontinuity_policy
    }

    /// Returns the window half-width in standard deviations of the trigger.
    #[inline]
    pub fn window_width_per_std_dev(&self) -> f64 {
        self.window_width_per_std_dev
    }

    /// Returns the degree of the density regression polynomial.
    #[inline]
    pub fn regression_degree(&self) -> usize {
        self.regression_degree
    }

    /// Returns the number of histogram buckets.
    #[inline]
    pub fn density_buckets(&self) -> usize {
        self.density_buckets
    }

    /// Returns true if intermediate derivatives are discarded once propagated.
    #[inline]
    pub fn retain_leaves_only(&self) -> bool {
        self.retain_leaves_only
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `window_width_per_std_dev` is negative or NaN (`+∞` is allowed)
    /// - `regression_degree` is outside `[1, 8]`
    /// - `density_buckets` is fewer than `regression_degree + 1` or above 10,000
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_width_per_std_dev.is_nan() || self.window_width_per_std_dev < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "window_width_per_std_dev",
                value: format!("{} must be non-negative", self.window_width_per_std_dev),
            });
        }
        if self.regression_degree == 0 || self.regression_degree > MAX_REGRESSION_DEGREE {
            return Err(ConfigError::InvalidParameter {
                name: "regression_degree",
                value: format!(
                    "{} must be in range [1, {}]",
                    self.regression_degree, MAX_REGRESSION_DEGREE
                ),
            });
        }
        if self.density_buckets <= self.regression_degree
            || self.density_buckets > MAX_DENSITY_BUCKETS
        {
            return Err(ConfigError::InvalidParameter {
                name: "density_buckets",
                value: format!(
                    "{} must be in range [{}, {}]",
                    self.density_buckets,
                    self.regression_degree + 1,
                    MAX_DENSITY_BUCKETS
                ),
            });
        }
        Ok(())
    }

    /// Loads defaults overridden by environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter` for unparsable or invalid values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Overrides fields for which an environment variable is set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter` for unparsable or invalid values.
    pub fn with_env_overrides(&self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Overrides fields from a variable lookup, e.g. the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter` for unparsable or invalid values.
    pub fn with_overrides<F>(&self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = self.to_builder();

        if let Some(policy) = lookup(env::DISCONTINUITY_POLICY) {
            let policy = policy
                .parse::<DiscontinuityPolicy>()
                .map_err(|_| ConfigError::InvalidParameter {
                    name: "discontinuity_policy",
                    value: format!("unknown policy '{}'", policy),
                })?;
            builder = builder.discontinuity_policy(policy);
        }

        if let Some(width) = lookup(env::WINDOW_WIDTH_PER_STD_DEV) {
            builder = builder.window_width_per_std_dev(parse_env(
                "window_width_per_std_dev",
                &width,
            )?);
        }

        if let Some(degree) = lookup(env::REGRESSION_DEGREE) {
            builder = builder.regression_degree(parse_env("regression_degree", &degree)?);
        }

        if let Some(buckets) = lookup(env::DENSITY_BUCKETS) {
            builder = builder.density_buckets(parse_env("density_buckets", &buckets)?);
        }

        if let Some(retain) = lookup(env::RETAIN_LEAVES_ONLY) {
            builder = builder.retain_leaves_only(parse_env(
                "retain_leaves_only",
                &retain.to_lowercase(),
            )?);
        }

        builder.build()
    }

    /// Parses a TOML document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::FileError` if the document does not parse, or
    /// `ConfigError::InvalidParameter` if a value is invalid.
    #[cfg(feature = "serde")]
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| ConfigError::FileError(format!("Failed to parse TOML: {}", e)))?;
        Self::try_from(file)
    }

    /// Loads a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::FileError` if the file cannot be read or parsed,
    /// or `ConfigError::InvalidParameter` if a value is invalid.
    #[cfg(feature = "serde")]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileError(format!("Failed to read config file: {}", e)))?;
        Self::from_toml_str(&content)
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidParameter {
        name,
        value: format!("cannot parse '{}'", raw),
    })
}

impl Default for AadConfig {
    fn default() -> Self {
        Self {
            discontinuity_policy: DiscontinuityPolicy::default(),
            window_width_per_std_dev: DEFAULT_WINDOW_WIDTH_PER_STD_DEV,
            regression_degree: DEFAULT_REGRESSION_DEGREE,
            density_buckets: DEFAULT_DENSITY_BUCKETS,
            retain_leaves_only: true,
        }
    }
}

/// Builder for [`AadConfig`].
///
/// Unset fields keep their defaults; validation happens at build time.
#[derive(Clone, Debug)]
pub struct AadConfigBuilder {
    discontinuity_policy: DiscontinuityPolicy,
    window_width_per_std_dev: f64,
    regression_degree: usize,
    density_buckets: usize,
    retain_leaves_only: bool,
}

impl Default for AadConfigBuilder {
    fn default() -> Self {
        AadConfig::default().to_builder()
    }
}

impl AadConfigBuilder {
    /// Sets the discontinuity policy.
    #[inline]
    pub fn discontinuity_policy(mut self, policy: DiscontinuityPolicy) -> Self {
        self.discontinuity_policy = policy;
        self
    }

    /// Sets the window half-width in standard deviations of the trigger.
    ///
    /// # Arguments
    ///
    /// * `width` - Non-negative; `f64::INFINITY` makes `DiscreteDelta` behave like `One`
    #[inline]
    pub fn window_width_per_std_dev(mut self, width: f64) -> Self {
        self.window_width_per_std_dev = width;
        self
    }

    /// Sets the degree of the density regression polynomial.
    ///
    /// # Arguments
    ///
    /// * `degree` - Degree in [1, 8]
    #[inline]
    pub fn regression_degree(mut self, degree: usize) -> Self {
        self.regression_degree = degree;
        self
    }

    /// Sets the number of histogram buckets.
    ///
    /// # Arguments
    ///
    /// * `buckets` - More than the regression degree, at most 10,000
    #[inline]
    pub fn density_buckets(mut self, buckets: usize) -> Self {
        self.density_buckets = buckets;
        self
    }

    /// Sets leaf-retention mode.
    #[inline]
    pub fn retain_leaves_only(mut self, retain: bool) -> Self {
        self.retain_leaves_only = retain;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a parameter is invalid, see [`AadConfig::validate`].
    pub fn build(self) -> Result<AadConfig, ConfigError> {
        let config = AadConfig {
            discontinuity_policy: self.discontinuity_policy,
            window_width_per_std_dev: self.window_width_per_std_dev,
            regression_degree: self.regression_degree,
            density_buckets: self.density_buckets,
            retain_leaves_only: self.retain_leaves_only,
        };

        config.validate()?;
        Ok(config)
    }
}

/// File and wire representation; every field optional.
#[cfg(feature = "serde")]
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    discontinuity_policy: Option<DiscontinuityPolicy>,
    #[serde(
        with = "width_repr",
        skip_serializing_if = "Option::is_none"
    )]
    window_width_per_std_dev: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    regression_degree: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    density_buckets: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retain_leaves_only: Option<bool>,
}

#[cfg(feature = "serde")]
impl TryFrom<ConfigFile> for AadConfig {
    type Error = ConfigError;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        let mut builder = AadConfig::builder();
        if let Some(policy) = file.discontinuity_policy {
            builder = builder.discontinuity_policy(policy);
        }
        if let Some(width) = file.window_width_per_std_dev {
            builder = builder.window_width_per_std_dev(width);
        }
        if let Some(degree) = file.regression_degree {
            builder = builder.regression_degree(degree);
        }
        if let Some(buckets) = file.density_buckets {
            builder = builder.density_buckets(buckets);
        }
        if let Some(retain) = file.retain_leaves_only {
            builder = builder.retain_leaves_only(retain);
        }
        builder.build()
    }
}

#[cfg(feature = "serde")]
impl From<AadConfig> for ConfigFile {
    fn from(config: AadConfig) -> Self {
        Self {
            discontinuity_policy: Some(config.discontinuity_policy),
            window_width_per_std_dev: Some(config.window_width_per_std_dev),
            regression_degree: Some(config.regression_degree),
            density_buckets: Some(config.density_buckets),
            retain_leaves_only: Some(config.retain_leaves_only),
        }
    }
}

/// Window width as a number, or the string `"inf"` for an unbounded window
/// (JSON has no infinity).
#[cfg(feature = "serde")]
mod width_repr {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Width {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(width: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match width {
            Some(w) if w.is_infinite() => Width::Text("inf".to_string()).serialize(serializer),
            Some(w) => Width::Number(*w).serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match Option::<Width>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Width::Number(w)) => Ok(Some(w)),
            Some(Width::Text(text)) => text
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AadConfig::default();

        assert_eq!(config.discontinuity_policy(), DiscontinuityPolicy::DiscreteDelta);
        assert_eq!(config.window_width_per_std_dev(), 0.05);
        assert_eq!(config.regression_degree(), 2);
        assert_eq!(config.density_buckets(), 10);
        assert!(config.retain_leaves_only());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_infinite_width_allowed() {
        let config = AadConfig::builder()
            .window_width_per_std_dev(f64::INFINITY)
            .build()
            .unwrap();
        assert!(config.window_width_per_std_dev().is_infinite());
    }

    #[test]
    fn test_builder_rejects_negative_width() {
        let result = AadConfig::builder().window_width_per_std_dev(-1.0).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter {
                name: "window_width_per_std_dev",
                ..
            })
        ));
    }

    #[test]
    fn test_builder_rejects_degree_out_of_range() {
        assert!(AadConfig::builder().regression_degree(0).build().is_err());
        assert!(AadConfig::builder()
            .regression_degree(MAX_REGRESSION_DEGREE + 1)
            .density_buckets(100)
            .build()
            .is_err());
    }

    #[test]
    fn test_builder_rejects_too_few_buckets() {
        let result = AadConfig::builder()
            .regression_degree(3)
            .density_buckets(3)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter {
                name: "density_buckets",
                ..
            })
        ));
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (env::DISCONTINUITY_POLICY, "regression_on_distribution"),
            (env::WINDOW_WIDTH_PER_STD_DEV, "inf"),
            (env::RETAIN_LEAVES_ONLY, "FALSE"),
        ]
        .into_iter()
        .collect();

        let config = AadConfig::default()
            .with_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(
            config.discontinuity_policy(),
            DiscontinuityPolicy::RegressionOnDistribution
        );
        assert!(config.window_width_per_std_dev().is_infinite());
        assert!(!config.retain_leaves_only());
        assert_eq!(config.regression_degree(), 2);
    }

    #[test]
    fn test_overrides_reject_garbage() {
        let result = AadConfig::default().with_overrides(|name| {
            (name == env::DENSITY_BUCKETS).then(|| "many".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter {
                name: "density_buckets",
                ..
            })
        ));

        let result = AadConfig::default().with_overrides(|name| {
            (name == env::DISCONTINUITY_POLICY).then(|| "smooth".to_string())
        });
        assert!(result.is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_toml_str() {
        let config = AadConfig::from_toml_str(
            r#"
            discontinuity_policy = "REGRESSION_ON_DENSITY"
            window_width_per_std_dev = 0.25
            density_buckets = 20
            "#,
        )
        .unwrap();

        assert_eq!(
            config.discontinuity_policy(),
            DiscontinuityPolicy::RegressionOnDensity
        );
        assert_eq!(config.window_width_per_std_dev(), 0.25);
        assert_eq!(config.density_buckets(), 20);
        assert_eq!(config.regression_degree(), DEFAULT_REGRESSION_DEGREE);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_toml_str_rejects_unknown_policy() {
        let result = AadConfig::from_toml_str(r#"discontinuity_policy = "SMOOTH""#);
        assert!(matches!(result, Err(ConfigError::FileError(_))));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_toml_str_validates() {
        let result = AadConfig::from_toml_str("regression_degree = 0");
        assert!(matches!(result, Err(ConfigError::InvalidParameter { .. })));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_file_missing() {
        let result = AadConfig::from_file("/nonexistent/aad.toml");
        assert!(matches!(result, Err(ConfigError::FileError(_))));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_roundtrip_with_infinite_width() {
        let config = AadConfig::builder()
            .window_width_per_std_dev(f64::INFINITY)
            .build()
            .unwrap();

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"inf\""));

        let back: AadConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
