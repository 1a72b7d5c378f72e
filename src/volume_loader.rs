use crate::volume::{Affine, Volume};

use log::{debug, warn};
use ndarray::{Array3, ArrayD, Axis, Ix3, ShapeError};
use nifti::{
    IntoNdArray, NiftiError, NiftiHeader, NiftiObject, ReaderOptions, writer::WriterOptions,
};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeIoError {
    #[error("Expected a 3D volume (or 4D with a single frame), got shape {shape:?}")]
    UnsupportedDimensionality { shape: Vec<usize> },

    #[error("Cannot derive a basename from {0}")]
    InvalidPath(PathBuf),

    #[error("NIfTI error: {0}")]
    Nifti(#[from] NiftiError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Shape error: {0}")]
    Shape(#[from] ShapeError),
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Load a NIfTI-1 volume (`.nii` or `.nii.gz`) as f32 samples
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or does not hold a single
    /// 3D volume
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Volume, VolumeIoError> {
        let path = path.as_ref();
        let basename = Self::basename(path)?;
        let object = ReaderOptions::new().read_file(path)?;
        let header = object.header().clone();
        let array = object.into_volume().into_ndarray::<f32>()?;
        let data = Self::into_volume_array(array)?;
        let affine = Self::get_affine(&header);
        debug!("loaded {} with shape {:?}", path.display(), data.dim());

        Ok(Volume::new(data, affine, basename))
    }

    /// Input path with everything from the first `.` of the file name removed.
    pub fn basename(path: &Path) -> Result<PathBuf, VolumeIoError> {
        let stem = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.split_once('.').map_or(name, |(stem, _)| stem))
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| VolumeIoError::InvalidPath(path.to_path_buf()))?;
        Ok(path.with_file_name(stem))
    }

    fn into_volume_array(array: ArrayD<f32>) -> Result<Array3<f32>, VolumeIoError> {
        let shape = array.shape().to_vec();
        match shape.as_slice() {
            [_, _, _] => Ok(array.into_dimensionality::<Ix3>()?),
            [_, _, _, 1] => Ok(array
                .index_axis_move(Axis(3), 0)
                .into_dimensionality::<Ix3>()?),
            shape => Err(VolumeIoError::UnsupportedDimensionality {
                shape: shape.to_vec(),
            }),
        }
    }

    /// Voxel-to-world transform: the sform if set, else the qform, else a
    /// centred transform built from the shape and voxel sizes.
    ///
    /// Only call with a header whose dimensionality was already accepted.
    fn get_affine(header: &NiftiHeader) -> Affine {
        let header = Self::sanitize_qform(header);
        let m = header.affine::<f64>();
        std::array::from_fn(|r| std::array::from_fn(|c| m[(r, c)]))
    }

    /// Repair qform fields that would otherwise abort the transform.
    fn sanitize_qform(header: &NiftiHeader) -> NiftiHeader {
        let mut header = header.clone();
        if header.sform_code != 0 || header.qform_code == 0 {
            return header;
        }

        let qfac = header.pixdim[0];
        if qfac != 1.0 && qfac != -1.0 {
            warn!("qfac (pixdim[0]) is {qfac}, using {}", qfac.signum());
            header.pixdim[0] = if qfac < 0.0 { -1.0 } else { 1.0 };
        }
        if header.pixdim[1..4].iter().any(|&p| p < 0.0) {
            warn!("negative voxel sizes in {:?}, using their magnitudes", &header.pixdim[1..4]);
            for p in &mut header.pixdim[1..4] {
                *p = p.abs();
            }
        }
        let norm = [header.quatern_b, header.quatern_c, header.quatern_d]
            .iter()
            .map(|&q| f64::from(q).powi(2))
            .sum::<f64>()
            .sqrt();
        if norm > 1.0 {
            debug!("rescaling qform quaternion with norm {norm}");
            header.quatern_b = (f64::from(header.quatern_b) / norm) as f32;
            header.quatern_c = (f64::from(header.quatern_c) / norm) as f32;
            header.quatern_d = (f64::from(header.quatern_d) / norm) as f32;
        }
        header
    }
}

fn header_for(affine: &Affine) -> NiftiHeader {
    let row = |r: usize| affine[r].map(|v| v as f32);
    let spacing = |c: usize| (0..3).map(|r| affine[r][c].powi(2)).sum::<f64>().sqrt() as f32;

    NiftiHeader {
        pixdim: [1.0, spacing(0), spacing(1), spacing(2), 1.0, 1.0, 1.0, 1.0],
        scl_slope: 1.0,
        scl_inter: 0.0,
        qform_code: 0,
        sform_code: 1,
        srow_x: row(0),
        srow_y: row(1),
        srow_z: row(2),
        ..NiftiHeader::default()
    }
}

/// Write `data` as a float32 NIfTI-1 file; `.gz` paths are compressed.
pub fn save_volume(
    data: &Array3<f32>,
    affine: &Affine,
    path: impl AsRef<Path>,
) -> Result<(), VolumeIoError> {
    let path = path.as_ref();
    let header = header_for(affine);
    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(data)?;
    debug!("saved {}", path.display());
    Ok(())
}

pub fn load_volume(path: impl AsRef<Path>) -> Result<Volume, VolumeIoError> {
    VolumeLoader::load_from_file(path)
}
