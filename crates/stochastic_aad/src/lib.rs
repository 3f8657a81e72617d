//! # stochastic_aad: Adjoint Algorithmic Differentiation over Stochastic Vectors
//!
//! ## Layer 2 (Engine) Role
//!
//! stochastic_aad records every operation applied to a differentiable
//! [`RandomVariable`](stochastic_core::RandomVariable) in an operator tree and
//! computes the derivatives of a result with respect to every value it
//! depends on in one backward pass:
//! - Differentiable values and type-priority dispatch (`value`)
//! - Operator-tree nodes, partial derivatives and retention (`node`)
//! - The backward pass (`gradient`)
//! - Derivatives of the `choose` branch at its discontinuity (`policy`)
//! - Engine configuration (`config`) and process-wide ids (`id`)
//!
//! ## Usage Example
//!
//! ```rust
//! use stochastic_aad::AadFactory;
//!
//! let factory = AadFactory::default();
//! let x = factory.from_paths(vec![0.5, 1.0, 1.5]);
//! let y = factory.scalar(2.0);
//!
//! // f = average(exp(x) * y)
//! let f = x.exp().mult(&y).average();
//!
//! let gradient = f.gradient(None).unwrap();
//! let dx = &gradient[&x.id()];
//! assert!((dx.random_variable().get(1) - 2.0 * 1.0f64.exp()).abs() < 1e-12);
//! ```
//!
//! ## Higher Orders
//!
//! A variable whose payload is itself differentiable records the operations
//! of its own backward pass, so gradient entries can be differentiated again:
//!
//! ```rust
//! use stochastic_aad::AadFactory;
//!
//! let factory = AadFactory::default();
//! let a = factory.scalar(5.0);
//! let x = factory.variable(a.clone());
//!
//! let f = x.squared();
//! let df = f.gradient(None).unwrap()[&x.id()].clone();
//! let df = df.as_differentiable().unwrap();
//!
//! let d2f = df.gradient(None).unwrap();
//! assert_eq!(d2f[&a.id()].random_variable().get(0), 2.0);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): Serialisation for values, operator types, policies
//!   and configuration; TOML configuration files

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod config;
pub mod error;
pub mod factory;
pub mod gradient;
pub mod id;
pub mod node;
pub mod policy;
pub mod value;

#[cfg(feature = "serde")]
mod serde_support;

pub use config::{AadConfig, AadConfigBuilder};
pub use error::{AadError, ConfigError};
pub use factory::AadFactory;
pub use gradient::{compute_gradient, GradientMap};
pub use id::IdGenerator;
pub use node::{OperatorNode, OperatorType};
pub use policy::DiscontinuityPolicy;
pub use value::{DifferentiableValue, Operand, Stochastic};
