//! Joint log-likelihood and variational free energy over discrete factors.
//!
//! ```text
//! L = ln( ∏_g A_g · o_g + ε )
//! F = Σ_f [ -q_f · ln(q_f + ε) - q_f · ln p(s_f) ] - E_q[L]
//! ```

use ndarray::{Array1, ArrayD, IxDyn};

use crate::error::{InferenceError, Result};
use crate::maths::{dot_observation, expected_value};
use crate::model::Likelihood;
use crate::params::LOG_EPSILON;

/// Log-likelihood of the observations over every hidden-state configuration.
///
/// Each modality's tensor is contracted with its observation along the
/// outcome axis, the results are multiplied together, and the log is taken
/// with a small floor.
///
/// # Errors
///
/// Returns [`InferenceError::ShapeMismatch`] if the number or length of
/// observations does not match the modalities.
pub fn joint_log_likelihood(likelihood: &Likelihood, observations: &[Array1<f64>]) -> Result<ArrayD<f64>> {
    let shape = likelihood.shape();
    if observations.len() != shape.num_modalities {
        return Err(InferenceError::ShapeMismatch {
            context: "observations".to_string(),
            expected: format!("{} modalities", shape.num_modalities),
            found: format!("{}", observations.len()),
        });
    }

    let mut joint = ArrayD::<f64>::ones(IxDyn(&shape.num_states));
    for (a, o) in likelihood.modalities().iter().zip(observations) {
        joint *= &dot_observation(a, o)?;
    }
    joint.mapv_inplace(|p| (p + LOG_EPSILON).ln());
    Ok(joint)
}

/// Free energy of the factorized posterior `posterior` under `prior` and the
/// joint log-likelihood.
///
/// # Errors
///
/// Returns [`InferenceError::ShapeMismatch`] if the factor counts disagree.
pub fn free_energy(log_likelihood: &ArrayD<f64>, posterior: &[Array1<f64>], prior: &[Array1<f64>]) -> Result<f64> {
    if prior.len() != posterior.len() {
        return Err(InferenceError::ShapeMismatch {
            context: "free energy".to_string(),
            expected: format!("{} prior factors", posterior.len()),
            found: format!("{}", prior.len()),
        });
    }

    let mut f = 0.0;
    for (q, p) in posterior.iter().zip(prior) {
        let entropy = -q.dot(&q.mapv(|v| (v + LOG_EPSILON).ln()));
        let cross_entropy = -q.dot(p);
        f += entropy + cross_entropy;
    }
    Ok(f - expected_value(log_likelihood, posterior)?)
}
