//! Solver hyperparameters.

/// Maximum number of fixed-point sweeps before giving up on convergence.
pub const DEFAULT_NUM_ITER: usize = 10;
/// Free-energy change below which the iteration is considered converged.
pub const DEFAULT_TOLERANCE: f64 = 0.001;
/// Floor added before taking logarithms.
pub const LOG_EPSILON: f64 = 1e-16;
/// Allowed deviation from 1.0 when checking that a likelihood slice is normalized.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;
