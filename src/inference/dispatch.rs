//! Input normalization and inference-method dispatch.
//!
//! Callers may hand over likelihoods, observations and priors in several
//! shapes. Each is resolved once, here, into the canonical per-modality and
//! per-factor vectors the solver consumes.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, ArrayD};
use tracing::debug;

use super::fpi::{run_fpi, FpiConfig, SolveReport};
use super::observer::{FpiObserver, TracingObserver};
use crate::distributions::Categorical;
use crate::error::{InferenceError, Result};
use crate::model::{Likelihood, ModelShape};

/// Variational inference algorithms that can be requested by name.
///
/// Only [`Method::Fpi`] is implemented; the others fail with
/// [`InferenceError::NotImplemented`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Method {
    /// Fixed-point iteration
    #[default]
    Fpi,
    /// Variational message passing
    Vmp,
    /// Marginal message passing
    Mmp,
    /// Belief propagation
    Bp,
    /// Expectation propagation
    Ep,
    /// Cluster variation method
    Cv,
}

impl Method {
    /// Every recognized selector.
    pub const ALL: [Self; 6] = [Self::Fpi, Self::Vmp, Self::Mmp, Self::Bp, Self::Ep, Self::Cv];

    /// Short selector name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fpi => "FPI",
            Self::Vmp => "VMP",
            Self::Mmp => "MMP",
            Self::Bp => "BP",
            Self::Ep => "EP",
            Self::Cv => "CV",
        }
    }

    /// True if the method can actually be run.
    #[must_use]
    pub const fn is_implemented(self) -> bool {
        matches!(self, Self::Fpi)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| InferenceError::UnknownMethod(s.to_string()))
    }
}

/// Whether the posterior comes back as raw vectors or wrapped in a
/// [`Categorical`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PosteriorFormat {
    /// A vector for one factor, a list of vectors otherwise
    #[default]
    Raw,
    /// A categorical distribution (a collection when there are several factors)
    Distribution,
}

/// Dispatcher settings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InferenceOptions {
    /// Algorithm to run
    pub method: Method,
    /// Output wrapping
    pub format: PosteriorFormat,
    /// Fixed-point iteration settings
    pub fpi: FpiConfig,
}

/// Accepted likelihood representations.
#[derive(Clone, Debug)]
pub enum LikelihoodInput {
    /// One tensor, one modality
    Tensor(ArrayD<f64>),
    /// One tensor per modality
    Modalities(Vec<ArrayD<f64>>),
    /// A categorical wrapping either of the above
    Distribution(Categorical),
    /// An already validated model
    Model(Likelihood),
}

/// Accepted observation representations.
#[derive(Clone, Debug)]
pub enum ObservationInput {
    /// Outcome index of the only modality
    Index(usize),
    /// One-hot (or soft) vector of the only modality
    OneHot(Array1<f64>),
    /// One outcome index per modality
    Indices(Vec<usize>),
    /// One vector per modality
    OneHots(Vec<Array1<f64>>),
    /// A categorical: a single vector, or a collection with one per modality
    Distribution(Categorical),
}

/// Accepted prior representations, in log domain.
#[derive(Clone, Debug)]
pub enum PriorInput {
    /// Prior of the only factor
    Vector(Array1<f64>),
    /// One prior per factor
    Factors(Vec<Array1<f64>>),
    /// A categorical whose values are used as-is
    Distribution(Categorical),
}

impl From<ArrayD<f64>> for LikelihoodInput {
    fn from(a: ArrayD<f64>) -> Self {
        Self::Tensor(a)
    }
}

impl From<Vec<ArrayD<f64>>> for LikelihoodInput {
    fn from(a: Vec<ArrayD<f64>>) -> Self {
        Self::Modalities(a)
    }
}

impl From<Categorical> for LikelihoodInput {
    fn from(a: Categorical) -> Self {
        Self::Distribution(a)
    }
}

impl From<Likelihood> for LikelihoodInput {
    fn from(a: Likelihood) -> Self {
        Self::Model(a)
    }
}

impl From<usize> for ObservationInput {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<Array1<f64>> for ObservationInput {
    fn from(o: Array1<f64>) -> Self {
        Self::OneHot(o)
    }
}

impl From<Vec<usize>> for ObservationInput {
    fn from(indices: Vec<usize>) -> Self {
        Self::Indices(indices)
    }
}

impl From<&[usize]> for ObservationInput {
    fn from(indices: &[usize]) -> Self {
        Self::Indices(indices.to_vec())
    }
}

impl From<Vec<Array1<f64>>> for ObservationInput {
    fn from(o: Vec<Array1<f64>>) -> Self {
        Self::OneHots(o)
    }
}

impl From<Categorical> for ObservationInput {
    fn from(o: Categorical) -> Self {
        Self::Distribution(o)
    }
}

impl From<Array1<f64>> for PriorInput {
    fn from(p: Array1<f64>) -> Self {
        Self::Vector(p)
    }
}

impl From<Vec<Array1<f64>>> for PriorInput {
    fn from(p: Vec<Array1<f64>>) -> Self {
        Self::Factors(p)
    }
}

impl From<Categorical> for PriorInput {
    fn from(p: Categorical) -> Self {
        Self::Distribution(p)
    }
}

/// Posterior over hidden-state factors.
#[derive(Clone, Debug, PartialEq)]
pub enum Posterior {
    /// Raw belief of the only factor
    Vector(Array1<f64>),
    /// Raw beliefs, one per factor
    Factors(Vec<Array1<f64>>),
    /// Beliefs wrapped as a categorical
    Distribution(Categorical),
}

impl Posterior {
    /// Per-factor belief vectors, whatever the wrapping.
    ///
    /// # Errors
    ///
    /// Only fails if a wrapped distribution holds non-vector arrays, which the
    /// dispatcher never produces.
    pub fn into_factors(self) -> Result<Vec<Array1<f64>>> {
        match self {
            Self::Vector(q) => Ok(vec![q]),
            Self::Factors(qs) => Ok(qs),
            Self::Distribution(c) => c.squeeze_vectors(),
        }
    }
}

/// Result of one dispatched inference call.
#[derive(Clone, Debug)]
pub struct Inference {
    /// Posterior beliefs
    pub posterior: Posterior,
    /// How the solver finished
    pub report: SolveReport,
}

/// Updates posterior beliefs over hidden states given an observation and a
/// prior, emitting solver progress as `tracing` events.
///
/// # Errors
///
/// See [`update_posterior_states_observed`].
pub fn update_posterior_states(
    likelihood: impl Into<LikelihoodInput>,
    observation: impl Into<ObservationInput>,
    prior: impl Into<PriorInput>,
    options: &InferenceOptions,
) -> Result<Inference> {
    update_posterior_states_observed(likelihood, observation, prior, options, &mut TracingObserver)
}

/// Updates posterior beliefs, reporting each solver sweep to `observer`.
///
/// # Errors
///
/// - [`InferenceError::NotImplemented`] for any method other than FPI,
///   before any input is inspected
/// - shape, probability and prior errors from normalizing the inputs or from
///   [`run_fpi`]
pub fn update_posterior_states_observed(
    likelihood: impl Into<LikelihoodInput>,
    observation: impl Into<ObservationInput>,
    prior: impl Into<PriorInput>,
    options: &InferenceOptions,
    observer: &mut dyn FpiObserver,
) -> Result<Inference> {
    if !options.method.is_implemented() {
        return Err(InferenceError::NotImplemented(options.method));
    }

    let likelihood = canonical_likelihood(likelihood.into())?;
    let shape = likelihood.shape();
    let observations = canonical_observations(observation.into(), shape)?;
    let prior = canonical_prior(prior.into(), shape)?;

    debug!(
        method = %options.method,
        factors = shape.num_factors,
        modalities = shape.num_modalities,
        strategy = ?options.fpi.strategy,
        "updating posterior over hidden states"
    );

    let solution = run_fpi(&likelihood, &observations, &prior, &options.fpi, observer)?;
    Ok(Inference {
        posterior: package(solution.posterior, options.format)?,
        report: solution.report,
    })
}

fn canonical_likelihood(input: LikelihoodInput) -> Result<Likelihood> {
    match input {
        LikelihoodInput::Tensor(a) => Likelihood::new(a),
        LikelihoodInput::Modalities(a) => Likelihood::from_modalities(a),
        LikelihoodInput::Distribution(a) => Likelihood::from_categorical(a),
        LikelihoodInput::Model(a) => Ok(a),
    }
}

fn canonical_observations(input: ObservationInput, shape: &ModelShape) -> Result<Vec<Array1<f64>>> {
    match input {
        ObservationInput::Index(index) => {
            require_single_modality(shape, "observation index")?;
            Ok(vec![onehot(0, index, shape.num_obs[0])?])
        }
        ObservationInput::OneHot(o) => {
            require_single_modality(shape, "observation vector")?;
            Ok(vec![o])
        }
        ObservationInput::Indices(indices) => {
            if indices.len() != shape.num_modalities {
                return Err(InferenceError::ShapeMismatch {
                    context: "observation indices".to_string(),
                    expected: format!("{} modalities", shape.num_modalities),
                    found: format!("{}", indices.len()),
                });
            }
            indices
                .iter()
                .zip(&shape.num_obs)
                .enumerate()
                .map(|(g, (&index, &no))| onehot(g, index, no))
                .collect()
        }
        ObservationInput::OneHots(o) => Ok(o),
        ObservationInput::Distribution(o) => {
            if !o.is_collection() {
                require_single_modality(shape, "observation distribution")?;
            }
            o.squeeze_vectors()
        }
    }
}

fn canonical_prior(input: PriorInput, shape: &ModelShape) -> Result<Vec<Array1<f64>>> {
    match input {
        PriorInput::Vector(p) => {
            if shape.num_factors != 1 {
                return Err(InferenceError::ShapeMismatch {
                    context: "prior vector".to_string(),
                    expected: format!("one prior per factor ({} factors)", shape.num_factors),
                    found: "a single vector".to_string(),
                });
            }
            Ok(vec![p])
        }
        PriorInput::Factors(p) => Ok(p),
        PriorInput::Distribution(p) => p.squeeze_vectors(),
    }
}

fn require_single_modality(shape: &ModelShape, context: &str) -> Result<()> {
    if shape.num_modalities == 1 {
        return Ok(());
    }
    Err(InferenceError::ShapeMismatch {
        context: context.to_string(),
        expected: format!("one observation per modality ({} modalities)", shape.num_modalities),
        found: "a single-modality observation".to_string(),
    })
}

fn onehot(modality: usize, index: usize, outcomes: usize) -> Result<Array1<f64>> {
    if index >= outcomes {
        return Err(InferenceError::ObservationOutOfRange {
            modality,
            index,
            outcomes,
        });
    }
    let mut o = Array1::<f64>::zeros(outcomes);
    o[index] = 1.0;
    Ok(o)
}

fn package(mut posterior: Vec<Array1<f64>>, format: PosteriorFormat) -> Result<Posterior> {
    Ok(match format {
        PosteriorFormat::Raw if posterior.len() == 1 => Posterior::Vector(posterior.remove(0)),
        PosteriorFormat::Raw => Posterior::Factors(posterior),
        PosteriorFormat::Distribution if posterior.len() == 1 => {
            Posterior::Distribution(Categorical::from_vector(posterior.remove(0))?)
        }
        PosteriorFormat::Distribution => Posterior::Distribution(Categorical::from_factors(posterior)?),
    })
}
