//! Deriche gradient magnitude of a volumetric image.
//!
//! The directional derivatives are produced by a filter that only works along
//! the leading axis, so every spatial axis is rotated to the front, filtered
//! and rotated back:
//!
//! | derivative | permutation | filtered shape | inverse     |
//! |------------|-------------|----------------|-------------|
//! | x          | (0, 1, 2)   | (X, Y, Z)      | (0, 1, 2)   |
//! | y          | (1, 2, 0)   | (Y, Z, X)      | (2, 0, 1)   |
//! | z          | (2, 0, 1)   | (Z, X, Y)      | (1, 2, 0)   |
//!
//! The three derivatives are stacked along a trailing axis in (x, y, z) order.
//! The magnitude is the per-voxel Euclidean norm of that stack, optionally
//! rescaled so that its dynamic range matches the source image.

use crate::enums::SpatialAxis;
use crate::filter::{AxisFilter, DericheFilter, FilterError};

use log::{debug, warn};
use ndarray::{
    Array3, Array4, ArrayBase, ArrayView3, ArrayView4, Axis, Data, Dimension, Ix3, ShapeError,
    Zip, stack,
};
use thiserror::Error;

/// Directional derivatives stacked as (X, Y, Z, 3) in (x, y, z) order.
pub type GradientStack = Array4<f32>;

#[derive(Debug, Error)]
pub enum GradientError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("gradient magnitude has zero dynamic range (constant value {value})")]
    DegenerateRange { value: f32 },

    #[error("filter failed: {0}")]
    Filter(#[from] FilterError),

    #[error("shape error: {0}")]
    Shape(#[from] ShapeError),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GradientOptions {
    /// Rescale the magnitude to the dynamic range of the source image.
    pub normalize: bool,
    /// Return the raw (X, Y, Z, 3) stack instead of the magnitude.
    pub return_gradients: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GradientOutput {
    Magnitude(Array3<f32>),
    Gradients(GradientStack),
}

impl GradientOutput {
    pub fn into_magnitude(self) -> Option<Array3<f32>> {
        match self {
            GradientOutput::Magnitude(magnitude) => Some(magnitude),
            GradientOutput::Gradients(_) => None,
        }
    }

    pub fn into_gradients(self) -> Option<GradientStack> {
        match self {
            GradientOutput::Gradients(gradients) => Some(gradients),
            GradientOutput::Magnitude(_) => None,
        }
    }
}

/// How [`gradient_magnitude`] treats the intensity range of its result.
#[derive(Clone, Copy, Debug)]
pub enum Normalization<'a> {
    None,
    /// Scale the magnitude so its range matches this volume's range.
    MatchRange(ArrayView3<'a, f32>),
}

/// Linear mapping between the magnitude range and the source range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangeMatch {
    pub scale: f32,
    /// `source_min - magnitude_min`. Reported only, never applied.
    pub offset: f32,
}

impl RangeMatch {
    pub fn between(
        source: ArrayView3<'_, f32>,
        magnitude: ArrayView3<'_, f32>,
    ) -> Result<Self, GradientError> {
        let (min_ima, max_ima) = intensity_range(source);
        let (min_der, max_der) = intensity_range(magnitude);
        let range_ima = max_ima - min_ima;
        let range_der = max_der - min_der;

        if !(range_der > 0.0 && range_der.is_finite()) {
            return Err(GradientError::DegenerateRange { value: min_der });
        }
        if range_ima == 0.0 {
            warn!("source image is constant ({min_ima}), normalized magnitude will be zero");
        }

        Ok(Self {
            scale: range_ima / range_der,
            offset: min_ima - min_der,
        })
    }
}

/// 0th and 100th percentile of the samples.
pub fn intensity_range(volume: ArrayView3<'_, f32>) -> (f32, f32) {
    volume
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

fn check_alpha(alpha: f32) -> Result<(), GradientError> {
    if alpha.is_finite() && alpha > 0.0 {
        Ok(())
    } else {
        Err(GradientError::InvalidArgument(format!(
            "alpha must be a finite positive number, got {alpha}"
        )))
    }
}

/// Rotate `axis` to the front, filter, rotate back.
///
/// The rotated view is materialized in standard layout before filtering.
pub fn derivative_along<F: AxisFilter + ?Sized>(
    filter: &F,
    volume: ArrayView3<'_, f32>,
    axis: SpatialAxis,
    alpha: f32,
) -> Result<Array3<f32>, GradientError> {
    let rotated = volume
        .permuted_axes(axis.permutation())
        .as_standard_layout()
        .into_owned();
    let filtered = filter.filter_leading_axis(rotated.view(), alpha)?;
    Ok(filtered.permuted_axes(axis.inverse_permutation()))
}

/// Axis-Gradient Engine: the (x, y, z) derivative stack of `volume`.
pub fn compute_gradients<F: AxisFilter + ?Sized>(
    filter: &F,
    volume: ArrayView3<'_, f32>,
    alpha: f32,
) -> Result<GradientStack, GradientError> {
    check_alpha(alpha)?;
    debug!("computing gradients of {:?} with alpha {alpha}", volume.dim());

    let mut derivatives = Vec::with_capacity(SpatialAxis::ALL.len());
    for axis in SpatialAxis::ALL {
        derivatives.push(derivative_along(filter, volume, axis, alpha)?);
    }
    let views: Vec<_> = derivatives.iter().map(|d| d.view()).collect();

    Ok(stack(Axis(3), &views)?)
}

/// Magnitude & Normalization Stage.
pub fn gradient_magnitude(
    gradients: ArrayView4<'_, f32>,
    normalization: Normalization<'_>,
) -> Result<Array3<f32>, GradientError> {
    if gradients.len_of(Axis(3)) != 3 {
        return Err(GradientError::InvalidArgument(format!(
            "gradient stack must have 3 components on its last axis, got shape {:?}",
            gradients.shape()
        )));
    }

    let magnitude = Zip::from(gradients.lanes(Axis(3)))
        .map_collect(|g| (g[0] * g[0] + g[1] * g[1] + g[2] * g[2]).sqrt());

    match normalization {
        Normalization::None => Ok(magnitude),
        Normalization::MatchRange(source) => {
            let range = RangeMatch::between(source, magnitude.view())?;
            debug!(
                "normalizing magnitude with scale {} (offset {} not applied)",
                range.scale, range.offset
            );
            Ok(magnitude * range.scale)
        }
    }
}

/// Deriche gradient magnitude of a volumetric image.
///
/// The input is copied into a contiguous f32 volume before any rotation.
/// Anything other than a 3D array is rejected with
/// [`GradientError::InvalidArgument`].
pub fn deriche_gradient_magnitude<S, D>(
    volume: &ArrayBase<S, D>,
    alpha: f32,
    options: GradientOptions,
) -> Result<GradientOutput, GradientError>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    deriche_gradient_magnitude_with(&DericheFilter::new(), volume, alpha, options)
}

/// [`deriche_gradient_magnitude`] with a caller supplied leading-axis filter.
pub fn deriche_gradient_magnitude_with<F, S, D>(
    filter: &F,
    volume: &ArrayBase<S, D>,
    alpha: f32,
    options: GradientOptions,
) -> Result<GradientOutput, GradientError>
where
    F: AxisFilter + ?Sized,
    S: Data<Elem = f32>,
    D: Dimension,
{
    let image: Array3<f32> = volume
        .view()
        .into_dimensionality::<Ix3>()
        .map_err(|_| {
            GradientError::InvalidArgument(format!(
                "expected a 3D volume, got {}D with shape {:?}",
                volume.ndim(),
                volume.shape()
            ))
        })?
        .as_standard_layout()
        .into_owned();

    let gradients = compute_gradients(filter, image.view(), alpha)?;
    if options.return_gradients {
        return Ok(GradientOutput::Gradients(gradients));
    }

    let normalization = if options.normalize {
        Normalization::MatchRange(image.view())
    } else {
        Normalization::None
    };
    gradient_magnitude(gradients.view(), normalization).map(GradientOutput::Magnitude)
}
