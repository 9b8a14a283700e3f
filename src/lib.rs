//! Mean-field variational inference for discrete generative models.
//!
//! Given an observation likelihood `P(o | s)`, an observation and a prior over
//! hidden states, [`update_posterior_states`] computes the per-factor
//! posterior by fixed-point iteration on the variational free energy.
//!
//! ```
//! use inferactive_rust::{update_posterior_states, InferenceOptions, Posterior};
//! use ndarray::array;
//!
//! let a = array![[0.9, 0.1], [0.1, 0.9]].into_dyn();
//! let result = update_posterior_states(a, 0_usize, array![0.0, 0.0], &InferenceOptions::default()).unwrap();
//! let Posterior::Vector(q) = result.posterior else { unreachable!() };
//! assert!((q[0] - 0.9).abs() < 1e-9);
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod distributions;
pub mod error;
pub mod inference;
pub mod maths;
pub mod model;
pub mod params;

pub use distributions::{Categorical, Dirichlet, DistributionValues};
pub use error::{InferenceError, Result};
pub use inference::{
    run_fpi, update_posterior_states, update_posterior_states_observed, FpiConfig, FpiObserver,
    FpiStrategy, Inference, InferenceOptions, IterationRecord, Method, Posterior, PosteriorFormat,
    SolveReport,
};
pub use model::{Likelihood, ModelShape};
