use crate::enums::Orientation;

use image::{GrayImage, ImageBuffer, Luma};
use ndarray::{Array3, ArrayView2, Axis};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Row-major 4x4 voxel-to-world transform.
pub type Affine = [[f64; 4]; 4];

pub const IDENTITY_AFFINE: Affine = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Scalar volume on a regular voxel grid, indexed (x, y, z).
#[derive(Clone, Debug)]
pub struct Volume {
    pub data: Array3<f32>,
    pub affine: Affine,
    /// Source path without its extensions, used to derive output names.
    pub basename: PathBuf,
}

impl Volume {
    pub fn new(data: Array3<f32>, affine: Affine, basename: impl Into<PathBuf>) -> Self {
        Self {
            data,
            affine,
            basename: basename.into(),
        }
    }

    pub fn basename(&self) -> &Path {
        &self.basename
    }

    pub fn get_slice_from_axis(
        &self,
        index: usize,
        orientation: Orientation,
    ) -> Option<ArrayView2<'_, f32>> {
        let axis = Axis(orientation.fixed_axis().index());
        if index >= self.data.len_of(axis) {
            return None;
        }
        Some(self.data.index_axis(axis, index))
    }

    /// Render a slice as an 8 bit image.
    ///
    /// The first remaining axis runs along the image width.
    pub fn get_image_from_axis(&self, index: usize, orientation: Orientation) -> Option<GrayImage> {
        let slice = self.get_slice_from_axis(index, orientation)?;
        Self::slice_to_image(&slice)
    }

    /// Index of the middle slice for `orientation`.
    pub fn center_index(&self, orientation: Orientation) -> usize {
        self.data.len_of(Axis(orientation.fixed_axis().index())) / 2
    }

    fn slice_to_image(slice: &ArrayView2<'_, f32>) -> Option<GrayImage> {
        let (width, height) = slice.dim();
        let (lo, hi) = slice
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = hi - lo;

        let pixel_data: Vec<u8> = (0..height)
            .into_par_iter()
            .flat_map_iter(|y| {
                (0..width).map(move |x| Self::normalize_to_u8(slice[[x, y]], lo, range))
            })
            .collect();

        ImageBuffer::<Luma<u8>, _>::from_raw(width as u32, height as u32, pixel_data)
    }

    #[inline]
    fn normalize_to_u8(value: f32, lo: f32, range: f32) -> u8 {
        if range > 0.0 {
            (((value - lo) / range) * 255.0).round().clamp(0.0, 255.0) as u8
        } else {
            0
        }
    }
}
