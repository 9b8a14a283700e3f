//! Observation likelihood model and the cardinalities inferred from it.

use ndarray::{ArrayD, Axis, IxDyn};
use rand::Rng;

use crate::distributions::{Categorical, DistributionValues};
use crate::error::{InferenceError, Result};
use crate::params::PROBABILITY_TOLERANCE;

/// Cardinalities of a generative model, inferred from likelihood shapes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelShape {
    /// Number of hidden-state factors (`Nf`)
    pub num_factors: usize,
    /// States per factor (`Ns`)
    pub num_states: Vec<usize>,
    /// Number of observation modalities (`Ng`)
    pub num_modalities: usize,
    /// Outcomes per modality (`No`)
    pub num_obs: Vec<usize>,
}

/// Per-modality likelihood tensors `P(o_g | s_1..s_Nf)`.
///
/// Axis 0 of each tensor indexes outcomes; the remaining axes index the
/// hidden-state factors and are shared by every modality.
#[derive(Clone, Debug)]
pub struct Likelihood {
    modalities: Vec<ArrayD<f64>>,
    shape: ModelShape,
}

impl Likelihood {
    /// Single-modality likelihood.
    ///
    /// # Errors
    ///
    /// See [`Likelihood::from_modalities`].
    pub fn new(tensor: ArrayD<f64>) -> Result<Self> {
        Self::from_modalities(vec![tensor])
    }

    /// Likelihood with one tensor per modality.
    ///
    /// # Errors
    ///
    /// - [`InferenceError::EmptyModel`] with no modalities or tensors of rank < 2
    /// - [`InferenceError::ShapeMismatch`] when hidden-state axes disagree
    /// - [`InferenceError::EmptyFactor`] for a zero-length hidden-state axis
    /// - [`InferenceError::InvalidProbability`] for negative, non-finite or
    ///   unnormalized entries
    pub fn from_modalities(modalities: Vec<ArrayD<f64>>) -> Result<Self> {
        let first = modalities.first().ok_or(InferenceError::EmptyModel)?;
        if first.ndim() < 2 {
            return Err(InferenceError::EmptyModel);
        }
        let num_states = first.shape()[1..].to_vec();
        if let Some(factor) = num_states.iter().position(|&n| n == 0) {
            return Err(InferenceError::EmptyFactor { factor });
        }

        for (g, a) in modalities.iter().enumerate() {
            if a.ndim() < 2 || a.shape()[1..] != num_states[..] {
                return Err(InferenceError::ShapeMismatch {
                    context: format!("likelihood modality {g}"),
                    expected: format!("[No, {num_states:?}]"),
                    found: format!("{:?}", a.shape()),
                });
            }
            validate_probabilities(a, g)?;
        }

        let shape = ModelShape {
            num_factors: num_states.len(),
            num_states,
            num_modalities: modalities.len(),
            num_obs: modalities.iter().map(|a| a.shape()[0]).collect(),
        };
        Ok(Self { modalities, shape })
    }

    /// Builds a likelihood from a categorical wrapper: a single tensor is one
    /// modality, a collection is one tensor per modality.
    ///
    /// # Errors
    ///
    /// See [`Likelihood::from_modalities`].
    pub fn from_categorical(dist: Categorical) -> Result<Self> {
        match dist.into_values() {
            DistributionValues::Single(a) => Self::new(a),
            DistributionValues::Collection(arrays) => Self::from_modalities(arrays),
        }
    }

    /// Random valid likelihood with entries drawn uniformly and normalized
    /// over outcomes.
    ///
    /// # Errors
    ///
    /// See [`Likelihood::from_modalities`]; also fails if any modality has
    /// zero outcomes.
    pub fn random<R: Rng>(num_obs: &[usize], num_states: &[usize], rng: &mut R) -> Result<Self> {
        let modalities = num_obs
            .iter()
            .map(|&no| {
                let mut dims = vec![no];
                dims.extend_from_slice(num_states);
                let mut a = ArrayD::from_shape_simple_fn(IxDyn(&dims), || rng.random::<f64>());
                let totals = a.sum_axis(Axis(0));
                for mut slice in a.axis_iter_mut(Axis(0)) {
                    slice /= &totals;
                }
                a
            })
            .collect();
        Self::from_modalities(modalities)
    }

    /// Inferred cardinalities.
    #[must_use]
    pub const fn shape(&self) -> &ModelShape {
        &self.shape
    }

    /// Tensor of modality `g`.
    #[must_use]
    pub fn modality(&self, g: usize) -> Option<&ArrayD<f64>> {
        self.modalities.get(g)
    }

    /// All modality tensors in order.
    #[must_use]
    pub fn modalities(&self) -> &[ArrayD<f64>] {
        &self.modalities
    }
}

fn validate_probabilities(a: &ArrayD<f64>, modality: usize) -> Result<()> {
    let context = || format!("likelihood modality {modality}");
    if a.shape()[0] == 0 {
        return Err(InferenceError::InvalidProbability {
            context: context(),
            reason: "no outcomes".to_string(),
        });
    }
    if let Some(bad) = a.iter().find(|&&v| !v.is_finite() || v < 0.0) {
        return Err(InferenceError::InvalidProbability {
            context: context(),
            reason: format!("entries must be finite and non-negative, found {bad}"),
        });
    }
    if let Some(total) = a
        .sum_axis(Axis(0))
        .iter()
        .find(|&&t| (t - 1.0).abs() > PROBABILITY_TOLERANCE)
    {
        return Err(InferenceError::InvalidProbability {
            context: context(),
            reason: format!("outcome probabilities sum to {total} for some hidden-state configuration"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_infers_single_modality_shape() {
        let a = Likelihood::new(array![[0.9, 0.1], [0.1, 0.9]].into_dyn()).unwrap();
        let shape = a.shape();
        assert_eq!(shape.num_factors, 1);
        assert_eq!(shape.num_states, vec![2]);
        assert_eq!(shape.num_modalities, 1);
        assert_eq!(shape.num_obs, vec![2]);
    }

    #[test]
    fn test_infers_multi_modality_shape() {
        let a0 = Array3::from_elem((3, 2, 4), 1.0 / 3.0).into_dyn();
        let a1 = Array3::from_elem((5, 2, 4), 0.2).into_dyn();
        let a = Likelihood::from_modalities(vec![a0, a1]).unwrap();
        assert_eq!(a.shape().num_states, vec![2, 4]);
        assert_eq!(a.shape().num_obs, vec![3, 5]);
        assert!(a.modality(1).is_some());
        assert!(a.modality(2).is_none());
    }

    #[test]
    fn test_rejects_mismatched_hidden_axes() {
        let a0 = Array3::from_elem((2, 2, 3), 0.5).into_dyn();
        let a1 = Array3::from_elem((2, 3, 2), 0.5).into_dyn();
        assert!(matches!(
            Likelihood::from_modalities(vec![a0, a1]),
            Err(InferenceError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_invalid_probabilities() {
        let negative = array![[1.2, 0.5], [-0.2, 0.5]].into_dyn();
        assert!(matches!(
            Likelihood::new(negative),
            Err(InferenceError::InvalidProbability { .. })
        ));

        let unnormalized = array![[0.5, 0.5], [0.6, 0.5]].into_dyn();
        assert!(matches!(
            Likelihood::new(unnormalized),
            Err(InferenceError::InvalidProbability { .. })
        ));

        let nan = array![[f64::NAN, 0.5], [0.5, 0.5]].into_dyn();
        assert!(Likelihood::new(nan).is_err());
    }

    #[test]
    fn test_rejects_empty_models() {
        assert!(matches!(Likelihood::from_modalities(vec![]), Err(InferenceError::EmptyModel)));
        assert!(matches!(Likelihood::new(array![0.5, 0.5].into_dyn()), Err(InferenceError::EmptyModel)));
        let zero_factor = ArrayD::<f64>::zeros(IxDyn(&[2, 0]));
        assert!(matches!(Likelihood::new(zero_factor), Err(InferenceError::EmptyFactor { factor: 0 })));
    }

    #[test]
    fn test_random_is_valid() {
        let mut rng = StdRng::seed_from_u64(3);
        let a = Likelihood::random(&[4, 2], &[3, 3], &mut rng).unwrap();
        assert_eq!(a.shape().num_obs, vec![4, 2]);
        assert_eq!(a.shape().num_factors, 2);
    }
}
