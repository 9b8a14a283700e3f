//! Tensor primitives shared by the distributions and the inference engine.
//!
//! Tensors follow the generative-model axis convention: a likelihood tensor
//! has the observation outcome on axis 0 and one axis per hidden-state factor
//! after it. Joint tensors over hidden states have exactly one axis per factor.
//!
//! ```text
//! dot(X, [x₁..xₙ])[..] = Σ X[.., i₁, .., iₙ] · x₁[i₁] ⋯ xₙ[iₙ]
//! cross(x₁..xₙ)[i₁..iₙ] = x₁[i₁] ⋯ xₙ[iₙ]
//! ```

mod contraction;
mod special;

pub use contraction::{
    broadcast_along, contract_axis, cross, dot, dot_observation, expected_value,
    marginalize_except,
};
pub use special::{digamma, softmax, wnorm};
