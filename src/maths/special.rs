//! Normalizations and special functions.

use ndarray::{Array1, ArrayD, Axis};

use crate::params::LOG_EPSILON;

/// Numerically stable softmax of a log-domain vector.
///
/// Shifts by the maximum before exponentiating so large magnitudes do not
/// overflow.
#[must_use]
pub fn softmax(x: &Array1<f64>) -> Array1<f64> {
    let max = x.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
    let exp = x.mapv(|v| (v - max).exp());
    let total = exp.sum();
    exp / total
}

/// Weighted normalization of concentration parameters over the leading axis.
///
/// `W = 1/Σ₀A - 1/A`, with `A` floored at `1e-16`. Entries with small counts
/// relative to their column total come out strongly negative.
#[must_use]
pub fn wnorm(a: &ArrayD<f64>) -> ArrayD<f64> {
    let floored = a.mapv(|v| v + LOG_EPSILON);
    let norm = floored.sum_axis(Axis(0)).mapv(f64::recip).insert_axis(Axis(0));
    let avg = floored.mapv(f64::recip);
    &norm - &avg
}

/// Digamma function ψ(x) for positive `x`.
///
/// Shifts `x` above 6 with the recurrence ψ(x) = ψ(x+1) - 1/x, then applies the
/// asymptotic expansion.
#[must_use]
pub fn digamma(x: f64) -> f64 {
    let mut x = x;
    let mut result = 0.0;
    while x < 6.0 {
        result -= 1.0 / x;
        x += 1.0;
    }
    let f = 1.0 / (x * x);
    let tail = f * (1.0 / 12.0 - f * (1.0 / 120.0 - f * (1.0 / 252.0 - f * (1.0 / 240.0 - f / 132.0))));
    result + x.ln() - 0.5 / x - tail
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_softmax_normalizes() {
        let p = softmax(&array![1.0, 2.0, 3.0]);
        assert!((p.sum() - 1.0).abs() < 1e-12);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn test_softmax_stable_for_large_inputs() {
        let p = softmax(&array![1000.0, 1000.0]);
        assert!((p[0] - 0.5).abs() < 1e-12);
        let q = softmax(&array![-1000.0, 0.0]);
        assert!(q.iter().all(|v| v.is_finite()));
        assert!((q[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_wnorm_shape_and_sign() {
        let a = array![[1.0, 4.0], [3.0, 4.0]].into_dyn();
        let w = wnorm(&a);
        assert_eq!(w.shape(), &[2, 2]);
        // 1/4 - 1/1
        assert!((w[[0, 0]] - (-0.75)).abs() < 1e-9);
        assert!(w.iter().all(|&v| v <= 0.0));
    }

    #[test]
    fn test_digamma_known_values() {
        // ψ(1) = -γ
        assert!((digamma(1.0) + 0.577_215_664_901_532_9).abs() < 1e-10);
        // ψ(0.5) = -γ - 2 ln 2
        let expected = -0.577_215_664_901_532_9 - 2.0 * std::f64::consts::LN_2;
        assert!((digamma(0.5) - expected).abs() < 1e-10);
    }

    #[test]
    fn test_digamma_recurrence() {
        let x = 3.7;
        assert!((digamma(x + 1.0) - digamma(x) - 1.0 / x).abs() < 1e-12);
    }
}
