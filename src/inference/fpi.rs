//! Mean-field fixed-point iteration (FPI) over hidden-state factors.
//!
//! Each factor's belief is updated in turn while the others are held fixed:
//!
//! ```text
//! q(s_f) ← σ( E_{q(s_\f)}[L] + ln p(s_f) )
//! ```
//!
//! One iteration sweeps the factors forward and then backward, after which the
//! free energy is recomputed and compared against the previous sweep.

use ndarray::{Array1, ArrayD, Axis, Ix1};
use rayon::prelude::*;

use super::free_energy::{free_energy, joint_log_likelihood};
use super::observer::{FpiObserver, IterationRecord};
use crate::error::{InferenceError, Result};
use crate::maths::{broadcast_along, cross, marginalize_except, softmax};
use crate::model::{Likelihood, ModelShape};
use crate::params::{DEFAULT_NUM_ITER, DEFAULT_TOLERANCE};

/// How the expected log-likelihood for one factor is computed within a sweep.
///
/// The two strategies settle on measurably different fixed points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FpiStrategy {
    /// Sum `L` out one factor at a time against the current beliefs.
    ///
    /// A factor updated earlier in a sweep is seen with its new belief by
    /// every later factor, which produces explaining-away effects.
    #[default]
    Recursive,
    /// Multiply every belief into `L` once per sweep, then divide out each
    /// factor's own belief and sum out the rest.
    ///
    /// All factors see the same start-of-sweep beliefs, so their updates are
    /// computed in parallel. Spreads mass more evenly across hypotheses.
    Joint,
}

/// Solver settings.
#[derive(Clone, Debug, PartialEq)]
pub struct FpiConfig {
    /// Maximum number of forward/backward sweeps
    pub max_iterations: usize,
    /// Free-energy change below which the solver stops
    pub tolerance: f64,
    /// Marginalization strategy
    pub strategy: FpiStrategy,
}

impl Default for FpiConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_NUM_ITER,
            tolerance: DEFAULT_TOLERANCE,
            strategy: FpiStrategy::default(),
        }
    }
}

impl FpiConfig {
    /// Sets the sweep cap.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the convergence tolerance.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the marginalization strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: FpiStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Checks the tolerance is finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::InvalidConfig`] otherwise.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(InferenceError::InvalidConfig(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// How a solve ended.
#[derive(Clone, Debug, PartialEq)]
pub struct SolveReport {
    /// True if the free-energy change fell below tolerance (always true for a
    /// single factor, which is solved exactly)
    pub converged: bool,
    /// Number of sweeps performed
    pub iterations: usize,
    /// Free energy of the returned posterior
    pub free_energy: f64,
    /// Free-energy change over the last sweep, if any sweep ran
    pub delta: Option<f64>,
    /// Strategy used
    pub strategy: FpiStrategy,
}

/// Posterior beliefs per factor together with the solve report.
#[derive(Clone, Debug)]
pub struct FpiSolution {
    /// One categorical vector per hidden-state factor
    pub posterior: Vec<Array1<f64>>,
    /// How the solve ended
    pub report: SolveReport,
}

/// Runs fixed-point iteration on canonical inputs.
///
/// `observations` holds one vector per modality (one-hot or soft) and `prior`
/// one log-domain vector per factor. All inputs are checked before any
/// iteration work.
///
/// # Errors
///
/// - [`InferenceError::InvalidConfig`] for a bad tolerance
/// - [`InferenceError::ShapeMismatch`] when observation or prior counts and
///   lengths disagree with the likelihood
/// - [`InferenceError::InvalidProbability`] for negative or non-finite
///   observation entries
/// - [`InferenceError::InvalidPrior`] for non-finite prior entries
pub fn run_fpi(
    likelihood: &Likelihood,
    observations: &[Array1<f64>],
    prior: &[Array1<f64>],
    config: &FpiConfig,
    observer: &mut dyn FpiObserver,
) -> Result<FpiSolution> {
    config.validate()?;
    let shape = likelihood.shape();
    check_observations(shape, observations)?;
    check_prior(shape, prior)?;

    let log_likelihood = joint_log_likelihood(likelihood, observations)?;

    #[allow(clippy::cast_precision_loss)]
    let mut qx: Vec<Array1<f64>> = shape
        .num_states
        .iter()
        .map(|&n| Array1::from_elem(n, 1.0 / n as f64))
        .collect();
    let mut report = SolveReport {
        converged: false,
        iterations: 0,
        free_energy: free_energy(&log_likelihood, &qx, prior)?,
        delta: None,
        strategy: config.strategy,
    };

    // A single factor has no mean-field coupling: the update is exact.
    if shape.num_factors == 1 {
        let q_l = marginalize_except(&log_likelihood, &qx, 0)?;
        qx[0] = softmax(&(&q_l + &prior[0]));
        report.converged = true;
        report.free_energy = free_energy(&log_likelihood, &qx, prior)?;
        observer.on_finish(&report);
        return Ok(FpiSolution { posterior: qx, report });
    }

    let forward: Vec<usize> = (0..shape.num_factors).collect();
    let backward: Vec<usize> = forward.iter().rev().copied().collect();
    let mut f_prev = report.free_energy;

    for iteration in 0..config.max_iterations {
        for order in [&forward, &backward] {
            match config.strategy {
                FpiStrategy::Recursive => recursive_sweep(&log_likelihood, &mut qx, prior, order)?,
                FpiStrategy::Joint => joint_sweep(&log_likelihood, &mut qx, prior, order)?,
            }
        }

        let f = free_energy(&log_likelihood, &qx, prior)?;
        let delta = (f_prev - f).abs();
        let converged = delta < config.tolerance;
        observer.on_iteration(&IterationRecord {
            iteration,
            free_energy: f,
            delta,
            converged,
        });

        report.iterations = iteration + 1;
        report.free_energy = f;
        report.delta = Some(delta);
        if converged {
            report.converged = true;
            break;
        }
        f_prev = f;
    }

    observer.on_finish(&report);
    Ok(FpiSolution { posterior: qx, report })
}

/// Updates factors in `order`, each marginalizing against the latest beliefs.
fn recursive_sweep(
    log_likelihood: &ArrayD<f64>,
    qx: &mut [Array1<f64>],
    prior: &[Array1<f64>],
    order: &[usize],
) -> Result<()> {
    for &f in order {
        let q_l = marginalize_except(log_likelihood, qx, f)?;
        qx[f] = softmax(&(&q_l + &prior[f]));
    }
    Ok(())
}

/// Updates factors in `order` from one joint tensor built at the start of the
/// sweep.
fn joint_sweep(
    log_likelihood: &ArrayD<f64>,
    qx: &mut [Array1<f64>],
    prior: &[Array1<f64>],
    order: &[usize],
) -> Result<()> {
    let num_factors = qx.len();
    let beliefs = &*qx;
    let joint = log_likelihood * &cross(beliefs);

    let updates = order
        .par_iter()
        .map(|&f| -> Result<(usize, Array1<f64>)> {
            // 1/0 is taken as 0: a vanished belief contributes nothing to X.
            let inverse = beliefs[f].mapv(|q| if q > 0.0 { q.recip() } else { 0.0 });
            let mut marginal = &joint * &broadcast_along(&inverse, f, num_factors)?;
            for axis in (0..num_factors).rev().filter(|&axis| axis != f) {
                marginal = marginal.sum_axis(Axis(axis));
            }
            let q_l = marginal.into_dimensionality::<Ix1>()?;
            Ok((f, softmax(&(&q_l + &prior[f]))))
        })
        .collect::<Result<Vec<_>>>()?;

    for (f, q) in updates {
        qx[f] = q;
    }
    Ok(())
}

fn check_observations(shape: &ModelShape, observations: &[Array1<f64>]) -> Result<()> {
    if observations.len() != shape.num_modalities {
        return Err(InferenceError::ShapeMismatch {
            context: "observations".to_string(),
            expected: format!("{} modalities", shape.num_modalities),
            found: format!("{}", observations.len()),
        });
    }
    for (g, (o, &no)) in observations.iter().zip(&shape.num_obs).enumerate() {
        if o.len() != no {
            return Err(InferenceError::ShapeMismatch {
                context: format!("observation for modality {g}"),
                expected: format!("{no} outcomes"),
                found: format!("{}", o.len()),
            });
        }
        if let Some(bad) = o.iter().find(|&&v| !v.is_finite() || v < 0.0) {
            return Err(InferenceError::InvalidProbability {
                context: format!("observation for modality {g}"),
                reason: format!("entries must be finite and non-negative, found {bad}"),
            });
        }
    }
    Ok(())
}

fn check_prior(shape: &ModelShape, prior: &[Array1<f64>]) -> Result<()> {
    if prior.len() != shape.num_factors {
        return Err(InferenceError::ShapeMismatch {
            context: "prior".to_string(),
            expected: format!("{} factors", shape.num_factors),
            found: format!("{}", prior.len()),
        });
    }
    for (f, (p, &ns)) in prior.iter().zip(&shape.num_states).enumerate() {
        if p.len() != ns {
            return Err(InferenceError::ShapeMismatch {
                context: format!("prior for factor {f}"),
                expected: format!("{ns} states"),
                found: format!("{}", p.len()),
            });
        }
        if let Some(bad) = p.iter().find(|v| !v.is_finite()) {
            return Err(InferenceError::InvalidPrior {
                factor: f,
                reason: format!("entries must be finite, found {bad}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::observer::NoopObserver;
    use ndarray::{array, Array3};

    fn flat_prior(shape: &ModelShape) -> Vec<Array1<f64>> {
        shape.num_states.iter().map(|&n| Array1::zeros(n)).collect()
    }

    /// Two binary factors whose observed slice factorizes as a(s1)·b(s2).
    fn factorized_model() -> Likelihood {
        let a = [0.8, 0.3];
        let b = [0.6, 0.2];
        let mut t = Array3::<f64>::zeros((2, 2, 2));
        for i in 0..2 {
            for j in 0..2 {
                t[[0, i, j]] = a[i] * b[j];
                t[[1, i, j]] = 1.0 - a[i] * b[j];
            }
        }
        Likelihood::new(t.into_dyn()).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = FpiConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert!((config.tolerance - 0.001).abs() < 1e-15);
        assert_eq!(config.strategy, FpiStrategy::Recursive);
    }

    #[test]
    fn test_config_rejects_bad_tolerance() {
        assert!(FpiConfig::default().with_tolerance(-1.0).validate().is_err());
        assert!(FpiConfig::default().with_tolerance(f64::NAN).validate().is_err());
        assert!(FpiConfig::default().with_tolerance(0.0).validate().is_ok());
    }

    #[test]
    fn test_single_factor_is_closed_form() {
        let a = Likelihood::new(array![[0.6, 0.3], [0.4, 0.7]].into_dyn()).unwrap();
        let prior = vec![array![0.2, -0.5]];
        let obs = vec![array![0.0, 1.0]];
        let expected = softmax(&array![0.4_f64.ln() + 0.2, 0.7_f64.ln() - 0.5]);

        for config in [
            FpiConfig::default(),
            FpiConfig::default().with_max_iterations(0),
            FpiConfig::default().with_tolerance(1e-12).with_strategy(FpiStrategy::Joint),
        ] {
            let sol = run_fpi(&a, &obs, &prior, &config, &mut NoopObserver).unwrap();
            assert!((&sol.posterior[0] - &expected).iter().all(|d| d.abs() < 1e-12));
            assert!(sol.report.converged);
            assert_eq!(sol.report.iterations, 0);
        }
    }

    #[test]
    fn test_factorized_model_is_exact_for_both_strategies() {
        let a = factorized_model();
        let prior = flat_prior(a.shape());
        let obs = vec![array![1.0, 0.0]];
        for strategy in [FpiStrategy::Recursive, FpiStrategy::Joint] {
            let config = FpiConfig::default().with_strategy(strategy);
            let sol = run_fpi(&a, &obs, &prior, &config, &mut NoopObserver).unwrap();
            assert!(sol.report.converged, "{strategy:?} did not converge");
            assert!((sol.posterior[0][0] - 0.8 / 1.1).abs() < 1e-6);
            assert!((sol.posterior[1][0] - 0.75).abs() < 1e-6);
        }
    }

    #[test]
    fn test_records_each_sweep() {
        let a = factorized_model();
        let prior = flat_prior(a.shape());
        let mut trace: Vec<IterationRecord> = Vec::new();
        let sol = run_fpi(&a, &[array![1.0, 0.0]], &prior, &FpiConfig::default(), &mut trace).unwrap();
        assert_eq!(trace.len(), sol.report.iterations);
        let last = trace.last().unwrap();
        assert!(last.converged);
        assert_eq!(sol.report.delta, Some(last.delta));
        assert!(trace[..trace.len() - 1].iter().all(|r| !r.converged));
    }

    #[test]
    fn test_zero_iterations_returns_uniform_unconverged() {
        let a = factorized_model();
        let prior = flat_prior(a.shape());
        let config = FpiConfig::default().with_max_iterations(0);
        let sol = run_fpi(&a, &[array![1.0, 0.0]], &prior, &config, &mut NoopObserver).unwrap();
        assert!(!sol.report.converged);
        assert_eq!(sol.report.iterations, 0);
        assert_eq!(sol.report.delta, None);
        assert_eq!(sol.posterior[0], array![0.5, 0.5]);
    }

    #[test]
    fn test_rejects_bad_inputs_before_iterating() {
        let a = factorized_model();
        let good_prior = flat_prior(a.shape());
        let obs = vec![array![1.0, 0.0]];
        let mut trace: Vec<IterationRecord> = Vec::new();

        let short_prior = vec![array![0.0, 0.0]];
        assert!(matches!(
            run_fpi(&a, &obs, &short_prior, &FpiConfig::default(), &mut trace),
            Err(InferenceError::ShapeMismatch { .. })
        ));

        let nan_prior = vec![array![0.0, f64::NAN], array![0.0, 0.0]];
        assert!(matches!(
            run_fpi(&a, &obs, &nan_prior, &FpiConfig::default(), &mut trace),
            Err(InferenceError::InvalidPrior { factor: 1, .. })
        ));

        let long_obs = vec![array![1.0, 0.0, 0.0]];
        assert!(run_fpi(&a, &long_obs, &good_prior, &FpiConfig::default(), &mut trace).is_err());

        let negative_obs = vec![array![-1.0, 0.0]];
        assert!(matches!(
            run_fpi(&a, &negative_obs, &good_prior, &FpiConfig::default(), &mut trace),
            Err(InferenceError::InvalidProbability { .. })
        ));

        assert!(trace.is_empty());
    }
}
