//! Weighted contraction and outer products over dynamic-rank tensors.

use ndarray::{Array1, ArrayD, ArrayView1, Axis, Ix1, IxDyn};

use crate::error::{InferenceError, Result};

/// Sums out `axis`, weighting each slice by the matching entry of `weights`.
///
/// The returned tensor has rank one less than `tensor`.
///
/// # Errors
///
/// Returns [`InferenceError::ShapeMismatch`] if `axis` is out of range or the
/// weight vector length differs from the axis length.
pub fn contract_axis(tensor: &ArrayD<f64>, axis: usize, weights: ArrayView1<f64>) -> Result<ArrayD<f64>> {
    if axis >= tensor.ndim() || tensor.len_of(Axis(axis)) != weights.len() {
        return Err(InferenceError::ShapeMismatch {
            context: format!("contraction along axis {axis}"),
            expected: format!("{:?}", tensor.shape()),
            found: format!("weights of length {} on axis {axis}", weights.len()),
        });
    }

    let mut shape = tensor.shape().to_vec();
    shape.remove(axis);
    let mut out = ArrayD::<f64>::zeros(IxDyn(&shape));
    for (slice, &w) in tensor.axis_iter(Axis(axis)).zip(weights.iter()) {
        out.scaled_add(w, &slice);
    }
    Ok(out)
}

/// Contracts the trailing axes of `tensor` against `weights`, skipping the
/// factors listed in `omit`.
///
/// `weights[k]` pairs with axis `tensor.ndim() - weights.len() + k`, so for a
/// joint tensor over hidden states `weights[k]` is the belief over factor `k`.
/// Axes are summed out one at a time from the last to the first, so each
/// contraction sees a tensor already reduced by the factors after it.
///
/// # Errors
///
/// Returns [`InferenceError::ShapeMismatch`] if there are more weight vectors
/// than axes or any length disagrees with its axis.
pub fn dot(tensor: &ArrayD<f64>, weights: &[Array1<f64>], omit: &[usize]) -> Result<ArrayD<f64>> {
    if weights.len() > tensor.ndim() {
        return Err(InferenceError::ShapeMismatch {
            context: "dot product".to_string(),
            expected: format!("at most {} weight vectors", tensor.ndim()),
            found: format!("{}", weights.len()),
        });
    }

    let offset = tensor.ndim() - weights.len();
    let mut reduced = tensor.clone();
    for (k, w) in weights.iter().enumerate().rev() {
        if omit.contains(&k) {
            continue;
        }
        reduced = contract_axis(&reduced, offset + k, w.view())?;
    }
    Ok(reduced)
}

/// Contracts the leading (outcome) axis of a likelihood tensor against an
/// observation vector, leaving a tensor over hidden-state configurations.
///
/// # Errors
///
/// Returns [`InferenceError::ShapeMismatch`] if the observation length differs
/// from the number of outcomes.
pub fn dot_observation(likelihood: &ArrayD<f64>, observation: &Array1<f64>) -> Result<ArrayD<f64>> {
    contract_axis(likelihood, 0, observation.view())
}

/// Expected value of `tensor` with every factor axis summed out except `keep`.
///
/// # Errors
///
/// Returns [`InferenceError::ShapeMismatch`] if `beliefs` does not cover every
/// axis of `tensor`.
pub fn marginalize_except(tensor: &ArrayD<f64>, beliefs: &[Array1<f64>], keep: usize) -> Result<Array1<f64>> {
    if beliefs.len() != tensor.ndim() || keep >= beliefs.len() {
        return Err(InferenceError::ShapeMismatch {
            context: "marginalization".to_string(),
            expected: format!("{} belief vectors", tensor.ndim()),
            found: format!("{} (keeping factor {keep})", beliefs.len()),
        });
    }
    Ok(dot(tensor, beliefs, &[keep])?.into_dimensionality::<Ix1>()?)
}

/// Expected value of `tensor` under the product of all `beliefs`.
///
/// # Errors
///
/// Returns [`InferenceError::ShapeMismatch`] if `beliefs` does not cover every
/// axis of `tensor`.
pub fn expected_value(tensor: &ArrayD<f64>, beliefs: &[Array1<f64>]) -> Result<f64> {
    if beliefs.len() != tensor.ndim() {
        return Err(InferenceError::ShapeMismatch {
            context: "expectation".to_string(),
            expected: format!("{} belief vectors", tensor.ndim()),
            found: format!("{}", beliefs.len()),
        });
    }
    Ok(dot(tensor, beliefs, &[])?.sum())
}

/// Outer product of a list of vectors.
///
/// The result has one axis per vector. An empty list yields a rank-0 tensor
/// holding `1.0`.
#[must_use]
pub fn cross(factors: &[Array1<f64>]) -> ArrayD<f64> {
    let mut joint = ArrayD::<f64>::ones(IxDyn(&[]));
    for factor in factors {
        let axis = joint.ndim();
        let mut shape = joint.shape().to_vec();
        shape.push(factor.len());
        let mut next = ArrayD::<f64>::zeros(IxDyn(&shape));
        for (mut lane, &p) in next.axis_iter_mut(Axis(axis)).zip(factor.iter()) {
            lane.assign(&(&joint * p));
        }
        joint = next;
    }
    joint
}

/// Reshapes `vector` so it broadcasts along `axis` of a rank-`ndim` tensor.
///
/// # Errors
///
/// Returns [`InferenceError::ShapeMismatch`] if `axis` is not below `ndim`.
pub fn broadcast_along(vector: &Array1<f64>, axis: usize, ndim: usize) -> Result<ArrayD<f64>> {
    if axis >= ndim {
        return Err(InferenceError::ShapeMismatch {
            context: "broadcast".to_string(),
            expected: format!("axis below {ndim}"),
            found: format!("axis {axis}"),
        });
    }
    let mut shape = vec![1; ndim];
    shape[axis] = vector.len();
    Ok(ArrayD::from_shape_vec(IxDyn(&shape), vector.to_vec())?)
}
