//! Construction of independent variables.

use std::sync::Arc;

use stochastic_core::RandomVariable;

use crate::config::AadConfig;
use crate::value::{DifferentiableValue, Stochastic};

/// Creates independent differentiable variables sharing one configuration.
///
/// Every variable gets a fresh id from the global generator, so variables
/// created later compare greater than everything created before them.
///
/// # Examples
///
/// ```
/// use stochastic_aad::{AadConfig, AadFactory, DiscontinuityPolicy};
///
/// let config = AadConfig::builder()
///     .discontinuity_policy(DiscontinuityPolicy::One)
///     .build()
///     .unwrap();
/// let factory = AadFactory::new(config);
///
/// let x = factory.from_paths(vec![1.0, 2.0, 3.0]);
/// assert_eq!(x.size(), 3);
/// assert_eq!(x.config().discontinuity_policy(), DiscontinuityPolicy::One);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AadFactory {
    config: Arc<AadConfig>,
}

impl AadFactory {
    /// Creates a factory with the given configuration.
    pub fn new(config: AadConfig) -> Self {
        Self::with_config(Arc::new(config))
    }

    /// Creates a factory sharing an existing configuration.
    pub fn with_config(config: Arc<AadConfig>) -> Self {
        Self { config }
    }

    /// The configuration attached to every variable.
    #[inline]
    pub fn config(&self) -> &Arc<AadConfig> {
        &self.config
    }

    /// An independent variable over `values`.
    ///
    /// A differentiable payload makes the variable second order: its
    /// gradient entries are themselves differentiable.
    pub fn variable(&self, values: impl Into<Stochastic>) -> DifferentiableValue {
        DifferentiableValue::new(values, Arc::clone(&self.config))
    }

    /// A deterministic independent variable.
    pub fn scalar(&self, value: f64) -> DifferentiableValue {
        self.variable(value)
    }

    /// An independent variable with one realization per path.
    pub fn from_paths(&self, paths: Vec<f64>) -> DifferentiableValue {
        self.variable(paths)
    }

    /// An independent variable over an existing random variable.
    pub fn from_random_variable(&self, values: RandomVariable) -> DifferentiableValue {
        self.variable(values)
    }
}
