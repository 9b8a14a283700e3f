//! Dirichlet distributions over categorical parameters.

use ndarray::{ArrayD, Axis};

use super::{check_entries, normalize_leading_axis, Categorical, DistributionValues};
use crate::error::Result;
use crate::maths::{digamma, wnorm};

/// Dirichlet concentration parameters, single or per modality/factor.
///
/// Each slice along the leading axis of an array is the concentration vector
/// of one Dirichlet, matching the layout of the [`Categorical`] it is a prior
/// over.
#[derive(Clone, Debug, PartialEq)]
pub struct Dirichlet {
    values: DistributionValues,
}

impl Dirichlet {
    /// Wraps a single array of concentration parameters.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidProbability`](crate::InferenceError::InvalidProbability)
    /// unless every entry is finite and strictly positive.
    pub fn new(values: ArrayD<f64>) -> Result<Self> {
        Self::from_values(DistributionValues::Single(values))
    }

    /// Wraps an ordered collection of concentration arrays.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidProbability`](crate::InferenceError::InvalidProbability)
    /// unless every entry is finite and strictly positive.
    pub fn from_collection(values: Vec<ArrayD<f64>>) -> Result<Self> {
        Self::from_values(DistributionValues::Collection(values))
    }

    fn from_values(values: DistributionValues) -> Result<Self> {
        check_entries(values.arrays(), |v| v > 0.0, "concentrations must be positive")?;
        Ok(Self { values })
    }

    /// Concentration parameters.
    #[must_use]
    pub const fn values(&self) -> &DistributionValues {
        &self.values
    }

    /// True when the values are a collection rather than a single array.
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self.values, DistributionValues::Collection(_))
    }

    /// Expected categorical parameters, `a / Σ₀a`.
    ///
    /// # Errors
    ///
    /// Never fails for a validly constructed Dirichlet; the result type comes
    /// from the [`Categorical`] constructor.
    pub fn mean(&self) -> Result<Categorical> {
        let normalized = self.values.map(|a| {
            let mut a = a.clone();
            normalize_leading_axis(&mut a);
            a
        });
        match normalized {
            DistributionValues::Single(a) => Categorical::new(a),
            DistributionValues::Collection(arrays) => Categorical::from_collection(arrays),
        }
    }

    /// Expected log parameters, `ψ(a) - ψ(Σ₀a)`.
    #[must_use]
    pub fn expectation_of_log(&self) -> DistributionValues {
        self.values.map(|a| {
            let totals = a.sum_axis(Axis(0)).mapv(digamma).insert_axis(Axis(0));
            &a.mapv(digamma) - &totals
        })
    }

    /// Weighted normalization of the concentrations, `1/Σ₀a - 1/a`.
    #[must_use]
    pub fn wnorm(&self) -> DistributionValues {
        self.values.map(wnorm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rejects_non_positive() {
        assert!(Dirichlet::new(array![1.0, 0.0].into_dyn()).is_err());
        assert!(Dirichlet::new(array![1.0, f64::INFINITY].into_dyn()).is_err());
    }

    #[test]
    fn test_mean_is_normalized_categorical() {
        let d = Dirichlet::new(array![[1.0, 2.0], [3.0, 6.0]].into_dyn()).unwrap();
        let mean = d.mean().unwrap();
        assert!(mean.is_normalized());
        let DistributionValues::Single(m) = mean.values() else {
            panic!("expected single array");
        };
        assert!((m[[0, 0]] - 0.25).abs() < 1e-12);
        assert!((m[[1, 1]] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_expectation_of_log_symmetric_case() {
        // Dir(1, 1): E[ln p] = ψ(1) - ψ(2) = -1
        let d = Dirichlet::new(array![1.0, 1.0].into_dyn()).unwrap();
        let DistributionValues::Single(e) = d.expectation_of_log() else {
            panic!("expected single array");
        };
        assert!(e.iter().all(|&v| (v + 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_collection_preserved() {
        let d = Dirichlet::from_collection(vec![
            array![1.0, 1.0].into_dyn(),
            array![[2.0, 1.0], [2.0, 3.0]].into_dyn(),
        ])
        .unwrap();
        assert!(d.is_collection());
        let mean = d.mean().unwrap();
        assert!(mean.is_collection());
        assert_eq!(mean.len(), 2);
        assert_eq!(d.wnorm().arrays().len(), 2);
    }
}
