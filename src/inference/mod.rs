//! Variational inference over discrete hidden-state factors.
//!
//! Approximates the posterior over hidden states with a product of
//! independent categorical marginals (mean-field) by minimizing variational
//! free energy:
//!
//! ```text
//! F = Σ_f [ -q_f · ln q_f - q_f · ln p(s_f) ] - E_q[ ln P(o | s) ]
//! ```
//!
//! Fixed-point update for factor `f`:
//! ```text
//! q(s_f) = σ( E_{q(s_\f)}[ ln P(o | s) ] + ln p(s_f) )
//! ```

mod dispatch;
mod free_energy;
mod fpi;
mod observer;

pub use dispatch::{
    update_posterior_states, update_posterior_states_observed, Inference, InferenceOptions,
    LikelihoodInput, Method, ObservationInput, Posterior, PosteriorFormat, PriorInput,
};
pub use free_energy::{free_energy, joint_log_likelihood};
pub use fpi::{run_fpi, FpiConfig, FpiSolution, FpiStrategy, SolveReport};
pub use observer::{FpiObserver, IterationRecord, NoopObserver, TracingObserver};
