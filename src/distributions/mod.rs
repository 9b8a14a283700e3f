//! Probability-distribution wrappers around single arrays or ordered
//! collections of arrays.
//!
//! A collection holds one array per modality or per hidden-state factor,
//! each with its own shape.

mod categorical;
mod dirichlet;

pub use categorical::Categorical;
pub use dirichlet::Dirichlet;

use ndarray::{Array1, ArrayD, Axis};

use crate::error::{InferenceError, Result};

/// Values held by a distribution: one array, or an ordered list of arrays.
#[derive(Clone, Debug, PartialEq)]
pub enum DistributionValues {
    /// A single vector, matrix or tensor
    Single(ArrayD<f64>),
    /// One array per modality or factor
    Collection(Vec<ArrayD<f64>>),
}

impl DistributionValues {
    /// Arrays in order; a single array is a list of one.
    #[must_use]
    pub fn arrays(&self) -> &[ArrayD<f64>] {
        match self {
            Self::Single(array) => std::slice::from_ref(array),
            Self::Collection(arrays) => arrays,
        }
    }

    fn arrays_mut(&mut self) -> &mut [ArrayD<f64>] {
        match self {
            Self::Single(array) => std::slice::from_mut(array),
            Self::Collection(arrays) => arrays,
        }
    }

    /// Applies `f` to every array, keeping the single/collection layout.
    #[must_use]
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(&ArrayD<f64>) -> ArrayD<f64>,
    {
        match self {
            Self::Single(array) => Self::Single(f(array)),
            Self::Collection(arrays) => Self::Collection(arrays.iter().map(f).collect()),
        }
    }
}

/// Drops length-1 axes and returns the remaining vector.
fn squeeze_to_vector(array: &ArrayD<f64>, context: &str) -> Result<Array1<f64>> {
    let kept: Vec<usize> = array.shape().iter().copied().filter(|&n| n != 1).collect();
    let len = match kept.as_slice() {
        [] => 1,
        [n] => *n,
        _ => {
            return Err(InferenceError::ShapeMismatch {
                context: context.to_string(),
                expected: "a vector".to_string(),
                found: format!("{:?}", array.shape()),
            })
        }
    };
    Ok(array.to_shape(len)?.into_owned())
}

/// Normalizes each slice along the leading axis to sum to one.
///
/// Slices summing to zero are left untouched.
fn normalize_leading_axis(array: &mut ArrayD<f64>) {
    if array.ndim() == 0 {
        return;
    }
    let totals = array.sum_axis(Axis(0));
    for mut slice in array.axis_iter_mut(Axis(0)) {
        slice.zip_mut_with(&totals, |v, &t| {
            if t > 0.0 {
                *v /= t;
            }
        });
    }
}

/// Checks entries are finite and satisfy `accept`.
fn check_entries(arrays: &[ArrayD<f64>], accept: fn(f64) -> bool, what: &str) -> Result<()> {
    for (i, array) in arrays.iter().enumerate() {
        if let Some(bad) = array.iter().find(|&&v| !v.is_finite() || !accept(v)) {
            return Err(InferenceError::InvalidProbability {
                context: format!("distribution entry {i}"),
                reason: format!("{what}, found {bad}"),
            });
        }
    }
    Ok(())
}
