//! Categorical distributions over discrete outcomes.

use ndarray::{Array1, ArrayD, Axis, IxDyn};
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;

use super::{check_entries, normalize_leading_axis, squeeze_to_vector, DistributionValues};
use crate::error::{InferenceError, Result};
use crate::params::PROBABILITY_TOLERANCE;

/// Categorical distribution, or an ordered collection of them.
///
/// A vector is one distribution. A matrix or higher-rank tensor is a
/// conditional distribution whose leading axis indexes outcomes, with one
/// distribution per configuration of the remaining axes.
#[derive(Clone, Debug, PartialEq)]
pub struct Categorical {
    values: DistributionValues,
}

impl Categorical {
    /// Wraps a single array of non-negative values.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::InvalidProbability`] on negative or non-finite
    /// entries.
    pub fn new(values: ArrayD<f64>) -> Result<Self> {
        Self::from_values(DistributionValues::Single(values))
    }

    /// Wraps a single probability vector.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::InvalidProbability`] on negative or non-finite
    /// entries.
    pub fn from_vector(values: Array1<f64>) -> Result<Self> {
        Self::new(values.into_dyn())
    }

    /// Wraps an ordered collection of arrays, one per modality or factor.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::InvalidProbability`] on negative or non-finite
    /// entries.
    pub fn from_collection(values: Vec<ArrayD<f64>>) -> Result<Self> {
        Self::from_values(DistributionValues::Collection(values))
    }

    /// Wraps one belief vector per hidden-state factor.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::InvalidProbability`] on negative or non-finite
    /// entries.
    pub fn from_factors(factors: Vec<Array1<f64>>) -> Result<Self> {
        Self::from_collection(factors.into_iter().map(|f| f.into_dyn()).collect())
    }

    fn from_values(values: DistributionValues) -> Result<Self> {
        check_entries(values.arrays(), |v| v >= 0.0, "entries must be non-negative")?;
        Ok(Self { values })
    }

    /// Uniform distribution over `n` outcomes.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::EmptyFactor`] if `n` is zero.
    pub fn uniform(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(InferenceError::EmptyFactor { factor: 0 });
        }
        #[allow(clippy::cast_precision_loss)]
        let p = 1.0 / n as f64;
        Self::new(ArrayD::from_elem(IxDyn(&[n]), p))
    }

    /// Point mass on `index` out of `n` outcomes.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::ObservationOutOfRange`] if `index >= n`.
    pub fn onehot(index: usize, n: usize) -> Result<Self> {
        if index >= n {
            return Err(InferenceError::ObservationOutOfRange {
                modality: 0,
                index,
                outcomes: n,
            });
        }
        let mut values = ArrayD::<f64>::zeros(IxDyn(&[n]));
        values[[index]] = 1.0;
        Self::new(values)
    }

    /// Underlying values.
    #[must_use]
    pub const fn values(&self) -> &DistributionValues {
        &self.values
    }

    /// Consumes the distribution, returning its values.
    #[must_use]
    pub fn into_values(self) -> DistributionValues {
        self.values
    }

    /// True when the values are a collection rather than a single array.
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self.values, DistributionValues::Collection(_))
    }

    /// Number of arrays held (1 for a single array).
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.arrays().len()
    }

    /// True for an empty collection.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Array at position `i` of the collection.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<&ArrayD<f64>> {
        self.values.arrays().get(i)
    }

    /// Squeezes every held array down to a vector.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::ShapeMismatch`] if an array has more than one
    /// axis longer than 1.
    pub fn squeeze_vectors(&self) -> Result<Vec<Array1<f64>>> {
        self.values
            .arrays()
            .iter()
            .enumerate()
            .map(|(i, a)| squeeze_to_vector(a, &format!("categorical entry {i}")))
            .collect()
    }

    /// Rescales every distribution along the leading axis to sum to one.
    pub fn normalize(&mut self) {
        for array in self.values.arrays_mut() {
            normalize_leading_axis(array);
        }
    }

    /// True when every distribution along the leading axis sums to one.
    #[must_use]
    pub fn is_normalized(&self) -> bool {
        self.values.arrays().iter().all(|a| {
            a.ndim() > 0
                && a
                    .sum_axis(Axis(0))
                    .iter()
                    .all(|&t| (t - 1.0).abs() < PROBABILITY_TOLERANCE)
        })
    }

    /// Draws one outcome index from each held vector.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::ShapeMismatch`] if an entry is not
    /// vector-like, or [`InferenceError::InvalidProbability`] if it has no
    /// mass.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Result<Vec<usize>> {
        self.squeeze_vectors()?
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let weights = WeightedIndex::new(p.iter()).map_err(|e| {
                    InferenceError::InvalidProbability {
                        context: format!("categorical entry {i}"),
                        reason: format!("cannot sample: {e}"),
                    }
                })?;
                Ok(weights.sample(&mut *rng))
            })
            .collect()
    }
}

impl TryFrom<Array1<f64>> for Categorical {
    type Error = InferenceError;

    fn try_from(values: Array1<f64>) -> Result<Self> {
        Self::from_vector(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rejects_negative_entries() {
        assert!(Categorical::from_vector(array![0.5, -0.1]).is_err());
        assert!(Categorical::from_vector(array![0.5, f64::NAN]).is_err());
    }

    #[test]
    fn test_uniform_and_onehot() {
        let u = Categorical::uniform(4).unwrap();
        assert!(u.is_normalized());
        assert!(Categorical::uniform(0).is_err());

        let o = Categorical::onehot(2, 3).unwrap();
        assert_eq!(o.squeeze_vectors().unwrap()[0], array![0.0, 0.0, 1.0]);
        assert!(Categorical::onehot(3, 3).is_err());
    }

    #[test]
    fn test_normalize_matrix_columns() {
        let mut c = Categorical::new(array![[1.0, 2.0], [3.0, 2.0]].into_dyn()).unwrap();
        assert!(!c.is_normalized());
        c.normalize();
        assert!(c.is_normalized());
        let DistributionValues::Single(values) = c.values() else {
            panic!("expected single array");
        };
        assert!((values[[1, 0]] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_collection_flags() {
        let c = Categorical::from_factors(vec![array![0.5, 0.5], array![1.0, 0.0, 0.0]]).unwrap();
        assert!(c.is_collection());
        assert_eq!(c.len(), 2);
        assert_eq!(c.get(1).unwrap().len(), 3);
        assert!(c.get(2).is_none());
    }

    #[test]
    fn test_squeeze_column_vector() {
        let c = Categorical::new(array![[0.2], [0.8]].into_dyn()).unwrap();
        let v = c.squeeze_vectors().unwrap();
        assert_eq!(v[0], array![0.2, 0.8]);

        let m = Categorical::new(array![[0.2, 0.1], [0.8, 0.9]].into_dyn()).unwrap();
        assert!(m.squeeze_vectors().is_err());
    }

    #[test]
    fn test_sample_respects_point_mass() {
        let mut rng = StdRng::seed_from_u64(7);
        let c = Categorical::from_factors(vec![array![0.0, 1.0, 0.0], array![1.0, 0.0]]).unwrap();
        for _ in 0..20 {
            assert_eq!(c.sample(&mut rng).unwrap(), vec![1, 0]);
        }
    }

    #[test]
    fn test_sample_rejects_zero_mass() {
        let mut rng = StdRng::seed_from_u64(3);
        let c = Categorical::from_factors(vec![array![0.5, 0.5], array![0.0, 0.0, 0.0]]).unwrap();
        assert!(matches!(
            c.sample(&mut rng),
            Err(InferenceError::InvalidProbability { .. })
        ));
    }

    #[test]
    fn test_sample_frequencies() {
        let mut rng = StdRng::seed_from_u64(42);
        let c = Categorical::from_vector(array![0.2, 0.8]).unwrap();
        let hits = (0..2000)
            .filter(|_| c.sample(&mut rng).unwrap()[0] == 1)
            .count();
        #[allow(clippy::cast_precision_loss)]
        let freq = hits as f64 / 2000.0;
        assert!((freq - 0.8).abs() < 0.05, "frequency {freq}");
    }
}
