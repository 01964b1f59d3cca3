//! Activation functions for CPPN nodes.
//!
//! Periodic functions (Sine, Cosine) and symmetric functions (Gaussian, Abs)
//! are particularly useful for generating natural spatial patterns like
//! ripples, segments, and bilateral symmetry in the velocity/color fields.

use serde::{Deserialize, Serialize};

/// Activation function types supported by network nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Activation {
    /// Identity function: f(x) = x
    #[default]
    Identity,
    /// Sigmoid: f(x) = 1 / (1 + e^(-x))
    Sigmoid,
    /// Hyperbolic tangent: f(x) = tanh(x)
    Tanh,
    /// Rectified Linear Unit: f(x) = max(0, x)
    ReLU,
    /// Sine function: f(x) = sin(x) - periodic/wave patterns
    Sine,
    /// Cosine function: f(x) = cos(x) - periodic/wave patterns
    Cosine,
    /// Gaussian: f(x) = e^(-x^2) - radial patterns
    Gaussian,
    /// Absolute value: f(x) = |x| - symmetric patterns
    Abs,
}

impl Activation {
    /// All available activation functions.
    pub const ALL: [Self; 8] = [
        Self::Identity,
        Self::Sigmoid,
        Self::Tanh,
        Self::ReLU,
        Self::Sine,
        Self::Cosine,
        Self::Gaussian,
        Self::Abs,
    ];

    /// CPPN-optimized activation functions (periodic and symmetric).
    pub const CPPN: [Self; 6] = [
        Self::Sigmoid,
        Self::Tanh,
        Self::Sine,
        Self::Cosine,
        Self::Gaussian,
        Self::Abs,
    ];

    /// Apply this activation function to an input value.
    ///
    /// NaN propagates consistently. Infinities produce finite outputs where
    /// mathematically sensible, keeping evaluation numerically stable.
    #[inline]
    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }

        match self {
            Self::Identity => x,
            Self::Sigmoid => {
                if x == f64::INFINITY {
                    return 1.0;
                }
                if x == f64::NEG_INFINITY {
                    return 0.0;
                }
                // Clamp to avoid overflow in exp
                let clamped = x.clamp(-500.0, 500.0);
                1.0 / (1.0 + (-clamped).exp())
            }
            Self::Tanh => {
                if x == f64::INFINITY {
                    return 1.0;
                }
                if x == f64::NEG_INFINITY {
                    return -1.0;
                }
                x.tanh()
            }
            Self::ReLU => {
                if x == f64::NEG_INFINITY {
                    return 0.0;
                }
                x.max(0.0)
            }
            Self::Sine => {
                // sin(infinity) is undefined
                if x.is_infinite() {
                    return 0.0;
                }
                x.sin()
            }
            Self::Cosine => {
                if x.is_infinite() {
                    return 0.0;
                }
                x.cos()
            }
            Self::Gaussian => {
                if x.is_infinite() {
                    return 0.0;
                }
                // For |x| > 40 the result underflows to 0 anyway
                if x.abs() > 40.0 {
                    0.0
                } else {
                    (-x * x).exp()
                }
            }
            Self::Abs => x.abs(),
        }
    }
}
