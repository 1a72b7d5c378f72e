//! Recursive Deriche derivative along the leading axis of a volume.
//!
//! The filter is the classic first-order Deriche edge operator: a causal and
//! an anti-causal second-order IIR pass whose sum approximates the smoothed
//! first derivative. Samples outside a lane are treated as zero.
//!
//! Every lane along axis 0 is independent, so lanes are filtered in parallel.

use ndarray::{Array3, ArrayView1, ArrayView3, ArrayViewMut1, Axis, Zip};
use thiserror::Error;

/// Shortest lane the derivative is defined on (one neighbour on each side).
pub const MIN_AXIS_LENGTH: usize = 3;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("alpha must be a finite positive number, got {0}")]
    InvalidAlpha(f32),

    #[error("leading axis has length {len}, filter needs at least {min}")]
    AxisTooShort { len: usize, min: usize },

    #[error("volume contains {count} non-finite samples")]
    NonFinite { count: usize },
}

/// One-directional filter applied along axis 0 of a volume.
///
/// Implementations must return a volume with the same shape as the input.
pub trait AxisFilter {
    fn filter_leading_axis(
        &self,
        volume: ArrayView3<'_, f32>,
        alpha: f32,
    ) -> Result<Array3<f32>, FilterError>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct DericheCoefficients {
    a1: f64,
    a2: f64,
    a3: f64,
    a4: f64,
    b1: f64,
    b2: f64,
    c: f64,
}

impl DericheCoefficients {
    fn derivative(alpha: f32) -> Self {
        let alpha = f64::from(alpha);
        let e = (-alpha).exp();
        Self {
            a1: 0.0,
            a2: 1.0,
            a3: -1.0,
            a4: 0.0,
            b1: 2.0 * e,
            b2: -(e * e),
            c: -(1.0 - e).powi(2),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DericheFilter;

impl DericheFilter {
    pub fn new() -> Self {
        Self
    }

    fn filter_lane(
        coefficients: &DericheCoefficients,
        input: ArrayView1<'_, f32>,
        mut output: ArrayViewMut1<'_, f32>,
    ) {
        let n = input.len();
        let x = |i: usize| f64::from(input[i]);
        let DericheCoefficients {
            a1,
            a2,
            a3,
            a4,
            b1,
            b2,
            c,
        } = *coefficients;

        let mut causal = vec![0.0f64; n];
        for i in 0..n {
            let x1 = if i >= 1 { x(i - 1) } else { 0.0 };
            let y1 = if i >= 1 { causal[i - 1] } else { 0.0 };
            let y2 = if i >= 2 { causal[i - 2] } else { 0.0 };
            causal[i] = a1 * x(i) + a2 * x1 + b1 * y1 + b2 * y2;
        }

        let mut anticausal = vec![0.0f64; n];
        for i in (0..n).rev() {
            let x1 = if i + 1 < n { x(i + 1) } else { 0.0 };
            let x2 = if i + 2 < n { x(i + 2) } else { 0.0 };
            let y1 = if i + 1 < n { anticausal[i + 1] } else { 0.0 };
            let y2 = if i + 2 < n { anticausal[i + 2] } else { 0.0 };
            anticausal[i] = a3 * x1 + a4 * x2 + b1 * y1 + b2 * y2;
        }

        for (i, out) in output.iter_mut().enumerate() {
            *out = (c * (causal[i] + anticausal[i])) as f32;
        }
    }
}

impl AxisFilter for DericheFilter {
    fn filter_leading_axis(
        &self,
        volume: ArrayView3<'_, f32>,
        alpha: f32,
    ) -> Result<Array3<f32>, FilterError> {
        if !(alpha.is_finite() && alpha > 0.0) {
            return Err(FilterError::InvalidAlpha(alpha));
        }
        let len = volume.len_of(Axis(0));
        if len < MIN_AXIS_LENGTH {
            return Err(FilterError::AxisTooShort {
                len,
                min: MIN_AXIS_LENGTH,
            });
        }
        let count = volume.iter().filter(|v| !v.is_finite()).count();
        if count > 0 {
            return Err(FilterError::NonFinite { count });
        }

        let coefficients = DericheCoefficients::derivative(alpha);
        let mut output = Array3::<f32>::zeros(volume.raw_dim());
        Zip::from(output.lanes_mut(Axis(0)))
            .and(volume.lanes(Axis(0)))
            .par_for_each(|out, lane| Self::filter_lane(&coefficients, lane, out));

        Ok(output)
    }
}
