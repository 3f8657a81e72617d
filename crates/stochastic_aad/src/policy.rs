//! Discontinuity approximation policies.
//!
//! `trigger.choose(a, b)` is the branch `trigger ≥ 0 ? a : b`. Its true
//! derivative with respect to the trigger is the Dirac impulse
//! `δ(trigger)·(a − b)`, which has no pathwise representation. A
//! [`DiscontinuityPolicy`] decides what replaces it during the backward pass:
//!
//! | Policy | Trigger derivative |
//! |---|---|
//! | `Zero` | 0 |
//! | `One` | `a − b` |
//! | `DiscreteDelta` | `(a − b)·1{\|X\| ≤ w} / 2w` with `w = k·σ(X)` |
//! | `RegressionOnDensity` | `a − b`, upstream localised to the window and scaled by a regressed density at 0 |
//! | `RegressionOnDistribution` | as above, density taken as the slope of a regressed empirical distribution |
//!
//! For the regression policies the effective upstream derivative is
//! `upstream·1{|X| ≤ w}·p̂(0)·N/m`, where `m` is the number of paths inside
//! the window, so that its path average approximates `E[upstream | X = 0]·p(0)`.

use std::fmt;
use std::str::FromStr;

use stochastic_core::math::regression::{evaluate_polynomial, polynomial_fit};
use stochastic_core::{RandomVariable, RegressionError};
use tracing::warn;

use crate::config::AadConfig;
use crate::error::AadError;
use crate::value::Stochastic;

/// Replacement for the derivative of `choose` with respect to its trigger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DiscontinuityPolicy {
    /// Ignore the discontinuity.
    Zero,
    /// Impulse weight one everywhere.
    One,
    /// Finite-width box approximation of the impulse.
    #[default]
    DiscreteDelta,
    /// Trigger density at 0 from a polynomial fit to a histogram.
    RegressionOnDensity,
    /// Trigger density at 0 from the slope of a polynomial fit to the empirical distribution.
    RegressionOnDistribution,
}

impl DiscontinuityPolicy {
    /// All policies, in declaration order.
    pub const ALL: [DiscontinuityPolicy; 5] = [
        DiscontinuityPolicy::Zero,
        DiscontinuityPolicy::One,
        DiscontinuityPolicy::DiscreteDelta,
        DiscontinuityPolicy::RegressionOnDensity,
        DiscontinuityPolicy::RegressionOnDistribution,
    ];

    /// Upper-case name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Zero => "ZERO",
            Self::One => "ONE",
            Self::DiscreteDelta => "DISCRETE_DELTA",
            Self::RegressionOnDensity => "REGRESSION_ON_DENSITY",
            Self::RegressionOnDistribution => "REGRESSION_ON_DISTRIBUTION",
        }
    }

    /// Returns true for the policies that localise the upstream derivative.
    #[inline]
    pub fn is_regression(self) -> bool {
        matches!(
            self,
            Self::RegressionOnDensity | Self::RegressionOnDistribution
        )
    }

    /// Derivative of `trigger.choose(if_non_negative, if_negative)` with
    /// respect to the trigger.
    pub(crate) fn trigger_partial(
        self,
        config: &AadConfig,
        trigger: &Stochastic,
        if_non_negative: &Stochastic,
        if_negative: &Stochastic,
    ) -> Stochastic {
        match self {
            Self::Zero => Stochastic::zero(),
            Self::One | Self::RegressionOnDensity | Self::RegressionOnDistribution => {
                if_non_negative.sub(if_negative)
            }
            Self::DiscreteDelta => {
                let trigger = trigger.random_variable();
                let width = half_width(config, trigger);
                if width.is_infinite() {
                    return if_non_negative.sub(if_negative);
                }
                if !(width > 0.0) {
                    return Stochastic::zero();
                }

                let weight =
                    trigger.apply(|x| if x.abs() <= width { 0.5 / width } else { 0.0 });
                if_non_negative
                    .sub(if_negative)
                    .mult(&Stochastic::Plain(weight))
            }
        }
    }

    /// Effective upstream derivative for the trigger argument.
    pub(crate) fn localize_upstream(
        self,
        config: &AadConfig,
        trigger: &Stochastic,
        upstream: &Stochastic,
    ) -> Stochastic {
        if !self.is_regression() {
            return upstream.clone();
        }

        let trigger = trigger.random_variable();
        let mut width = half_width(config, trigger);
        if width.is_infinite() {
            width = trigger.abs().max();
        }
        if !(width > 0.0) {
            return Stochastic::zero();
        }

        let n = trigger.size();
        let inside = (0..n).filter(|&p| trigger.get(p).abs() <= width).count();
        if inside == 0 {
            return Stochastic::zero();
        }

        let density = self.density_at_zero(config, trigger, width, inside);
        let scale = density * n as f64 / inside as f64;
        let weight = trigger.apply(|x| if x.abs() <= width { scale } else { 0.0 });
        upstream.mult(&Stochastic::Plain(weight))
    }

    fn density_at_zero(
        self,
        config: &AadConfig,
        trigger: &RandomVariable,
        width: f64,
        inside: usize,
    ) -> f64 {
        let n = trigger.size();
        let window: Vec<f64> = (0..n)
            .map(|p| trigger.get(p))
            .filter(|x| x.abs() <= width)
            .collect();

        let fitted = match self {
            Self::RegressionOnDistribution => {
                distribution_slope(&window, width, n, config.regression_degree())
            }
            _ => histogram_density(
                &window,
                width,
                n,
                config.density_buckets(),
                config.regression_degree(),
            ),
        };

        let fallback = inside as f64 / (2.0 * width * n as f64);
        match fitted {
            Ok(density) if density.is_finite() && density > 0.0 => density,
            Ok(density) => {
                warn!(policy = %self, density, fallback, "regressed density unusable, using window density");
                fallback
            }
            Err(error) => {
                warn!(policy = %self, %error, fallback, "density regression failed, using window density");
                fallback
            }
        }
    }
}

/// Window half-width `k·σ(trigger)`; infinite when `k` is.
fn half_width(config: &AadConfig, trigger: &RandomVariable) -> f64 {
    let k = config.window_width_per_std_dev();
    if k.is_infinite() {
        f64::INFINITY
    } else {
        k * trigger.standard_deviation()
    }
}

/// Density at 0 from a polynomial fit to bucket densities on `[-w, w]`.
fn histogram_density(
    window: &[f64],
    width: f64,
    n: usize,
    buckets: usize,
    degree: usize,
) -> Result<f64, RegressionError> {
    let bucket_width = 2.0 * width / buckets as f64;
    let mut counts = vec![0usize; buckets];
    for &x in window {
        let bucket = (((x + width) / bucket_width).floor() as usize).min(buckets - 1);
        counts[bucket] += 1;
    }

    // Abscissae scaled to [-1, 1] to keep the normal equations well conditioned.
    let centers: Vec<f64> = (0..buckets)
        .map(|b| (-width + (b as f64 + 0.5) * bucket_width) / width)
        .collect();
    let densities: Vec<f64> = counts
        .iter()
        .map(|&count| count as f64 / (n as f64 * bucket_width))
        .collect();

    let coefficients = polynomial_fit(&centers, &densities, degree)?;
    Ok(evaluate_polynomial(&coefficients, 0.0))
}

/// Density at 0 as the slope of a polynomial fit to the empirical
/// distribution of the window, shifted to vanish at 0.
fn distribution_slope(
    window: &[f64],
    width: f64,
    n: usize,
    degree: usize,
) -> Result<f64, RegressionError> {
    let mut sorted = window.to_vec();
    sorted.sort_by(f64::total_cmp);

    let at_or_below_zero = sorted.iter().filter(|&&x| x <= 0.0).count() as f64;
    let abscissae: Vec<f64> = sorted.iter().map(|x| x / width).collect();
    let cumulative: Vec<f64> = (0..sorted.len())
        .map(|rank| (rank as f64 + 1.0 - at_or_below_zero) / n as f64)
        .collect();

    let coefficients = polynomial_fit(&abscissae, &cumulative, degree)?;
    Ok(coefficients.get(1).copied().unwrap_or(0.0) / width)
}

impl fmt::Display for DiscontinuityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DiscontinuityPolicy {
    type Err = AadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|policy| policy.name() == normalized)
            .ok_or_else(|| {
                AadError::UnsupportedOperation(format!("unknown discontinuity policy '{}'", s))
            })
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for DiscontinuityPolicy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for DiscontinuityPolicy {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn uniform_trigger(n: usize) -> RandomVariable {
        // Evenly spaced on (-1, 1): density 0.5 everywhere.
        (0..n)
            .map(|i| -1.0 + (2.0 * i as f64 + 1.0) / n as f64)
            .collect()
    }

    fn config(policy: DiscontinuityPolicy, k: f64) -> AadConfig {
        AadConfig::builder()
            .discontinuity_policy(policy)
            .window_width_per_std_dev(k)
            .build()
            .unwrap()
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(
            "discrete_delta".parse::<DiscontinuityPolicy>().unwrap(),
            DiscontinuityPolicy::DiscreteDelta
        );
        assert_eq!(
            "Regression-On-Density".parse::<DiscontinuityPolicy>().unwrap(),
            DiscontinuityPolicy::RegressionOnDensity
        );
        for policy in DiscontinuityPolicy::ALL {
            assert_eq!(policy.name().parse::<DiscontinuityPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_parse_unknown_is_unsupported() {
        assert!(matches!(
            "SMOOTH".parse::<DiscontinuityPolicy>(),
            Err(AadError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_discrete_delta_box() {
        let trigger = Stochastic::Plain(RandomVariable::from_paths(vec![-0.5, 0.01, 3.0]));
        let cfg = config(DiscontinuityPolicy::DiscreteDelta, 0.1);
        let width = 0.1 * trigger.random_variable().standard_deviation();

        let partial = DiscontinuityPolicy::DiscreteDelta.trigger_partial(
            &cfg,
            &trigger,
            &Stochastic::scalar(1.0),
            &Stochastic::scalar(0.0),
        );
        let partial = partial.random_variable();

        assert_eq!(partial.get(0), 0.0);
        assert_relative_eq!(partial.get(1), 0.5 / width);
        assert_eq!(partial.get(2), 0.0);
    }

    #[test]
    fn test_discrete_delta_degenerate_widths() {
        let trigger = Stochastic::Plain(uniform_trigger(10));
        let one = Stochastic::scalar(1.0);
        let zero = Stochastic::scalar(0.0);

        let wide = DiscontinuityPolicy::DiscreteDelta.trigger_partial(
            &config(DiscontinuityPolicy::DiscreteDelta, f64::INFINITY),
            &trigger,
            &one,
            &zero,
        );
        assert_eq!(wide.random_variable().get(0), 1.0);

        let narrow = DiscontinuityPolicy::DiscreteDelta.trigger_partial(
            &config(DiscontinuityPolicy::DiscreteDelta, 0.0),
            &trigger,
            &one,
            &zero,
        );
        assert_eq!(narrow.random_variable().get(0), 0.0);
    }

    #[test]
    fn test_histogram_density_of_uniform() {
        let trigger = uniform_trigger(10_000);
        let window: Vec<f64> = trigger
            .realizations()
            .into_iter()
            .filter(|x| x.abs() <= 0.5)
            .collect();

        let density = histogram_density(&window, 0.5, 10_000, 10, 2).unwrap();
        assert_relative_eq!(density, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_distribution_slope_of_uniform() {
        let trigger = uniform_trigger(10_000);
        let window: Vec<f64> = trigger
            .realizations()
            .into_iter()
            .filter(|x| x.abs() <= 0.5)
            .collect();

        let density = distribution_slope(&window, 0.5, 10_000, 2).unwrap();
        assert_relative_eq!(density, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_regression_localizes_upstream() {
        let trigger = Stochastic::Plain(uniform_trigger(10_000));
        let cfg = config(DiscontinuityPolicy::RegressionOnDensity, 0.5);

        let localized = DiscontinuityPolicy::RegressionOnDensity.localize_upstream(
            &cfg,
            &trigger,
            &Stochastic::scalar(1.0),
        );

        // Path average approximates the density at 0.
        assert_relative_eq!(localized.random_variable().mean(), 0.5, epsilon = 1e-2);
    }

    #[test]
    fn test_regression_falls_back_with_sparse_window() {
        // Two samples cannot support a quadratic fit.
        let trigger = Stochastic::Plain(RandomVariable::from_paths(vec![-0.1, 0.1, 5.0, -5.0]));
        let cfg = AadConfig::builder()
            .discontinuity_policy(DiscontinuityPolicy::RegressionOnDistribution)
            .window_width_per_std_dev(0.1)
            .build()
            .unwrap();

        let localized = DiscontinuityPolicy::RegressionOnDistribution.localize_upstream(
            &cfg,
            &trigger,
            &Stochastic::scalar(1.0),
        );
        let width = 0.1 * trigger.random_variable().standard_deviation();
        let expected_mean = 2.0 / (2.0 * width * 4.0);

        assert_relative_eq!(localized.random_variable().mean(), expected_mean, epsilon = 1e-9);
    }

    #[test]
    fn test_non_regression_policies_pass_upstream_through() {
        let upstream = Stochastic::scalar(3.0);
        let trigger = Stochastic::Plain(uniform_trigger(4));
        let cfg = AadConfig::default();

        for policy in [
            DiscontinuityPolicy::Zero,
            DiscontinuityPolicy::One,
            DiscontinuityPolicy::DiscreteDelta,
        ] {
            let localized = policy.localize_upstream(&cfg, &trigger, &upstream);
            assert_eq!(localized.random_variable().get(0), 3.0);
        }
    }
}
