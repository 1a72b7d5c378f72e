//! Batch export of Deriche gradient magnitude images.
//!
//! One output file per configured alpha, named after the input:
//! `sub-01.nii.gz` with alpha 2 becomes `sub-01_GraMagDeriche_alpha2pt0.nii.gz`.

use crate::enums::Orientation;
use crate::gradient::{GradientError, GradientOptions, deriche_gradient_magnitude};
use crate::volume::Volume;
use crate::volume_loader::{VolumeIoError, load_volume, save_volume};

use log::info;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use web_time::Instant;

pub const DEFAULT_ALPHA: f32 = 2.0;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No alpha values configured")]
    NoAlphas,

    #[error("Failed to read config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("alpha {alpha}: {source}")]
    Gradient { alpha: f32, source: GradientError },

    #[error(transparent)]
    Io(#[from] VolumeIoError),
}

fn default_alphas() -> Vec<f32> {
    vec![DEFAULT_ALPHA]
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ExportConfig {
    pub input: PathBuf,
    #[serde(default = "default_alphas")]
    pub alphas: Vec<f32>,
    #[serde(default)]
    pub normalize: bool,
    /// Directory for outputs; next to the input when unset.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Also write a PNG of the central slice in this orientation.
    #[serde(default)]
    pub preview: Option<Orientation>,
}

impl ExportConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            alphas: default_alphas(),
            normalize: false,
            output_dir: None,
            preview: None,
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ExportError> {
        let data = fs::read_to_string(path).map_err(|source| ExportError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ExportError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Output path prefix (no extension) for `alpha`.
    pub fn output_stem(&self, basename: &Path, alpha: f32) -> PathBuf {
        let name = format!(
            "{}_GraMagDeriche_alpha{}",
            basename
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default(),
            format_alpha(alpha)
        );
        match &self.output_dir {
            Some(dir) => dir.join(name),
            None => basename.with_file_name(name),
        }
    }
}

/// Alpha printed with at least one decimal, `.` spelled `pt`.
pub fn format_alpha(alpha: f32) -> String {
    let text = if alpha.fract() == 0.0 {
        format!("{alpha:.1}")
    } else {
        alpha.to_string()
    };
    text.replace('.', "pt")
}

fn with_extension(stem: &Path, extension: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_os_string();
    name.push(extension);
    PathBuf::from(name)
}

fn write_preview(
    volume: &Volume,
    orientation: Orientation,
    path: &Path,
) -> Result<(), ExportError> {
    let index = volume.center_index(orientation);
    if let Some(image) = volume.get_image_from_axis(index, orientation) {
        image.save(path).map_err(VolumeIoError::from)?;
        info!(
            "    Preview ({orientation}, slice {index}) saved as: {}",
            path.display()
        );
    }
    Ok(())
}

/// Compute and save one gradient magnitude image per configured alpha.
///
/// The input is read once. The batch stops at the first failure.
pub fn export_deriche_gramag(config: &ExportConfig) -> Result<Vec<PathBuf>, ExportError> {
    if config.alphas.is_empty() {
        return Err(ExportError::NoAlphas);
    }
    if let Some(dir) = &config.output_dir {
        fs::create_dir_all(dir).map_err(|source| ExportError::CreateDir {
            path: dir.clone(),
            source,
        })?;
    }

    info!("-------------------------");
    info!("Deriche filter exporting initiated.");
    let image = load_volume(&config.input)?;
    let options = GradientOptions {
        normalize: config.normalize,
        return_gradients: false,
    };

    let mut written = Vec::with_capacity(config.alphas.len());
    for &alpha in &config.alphas {
        info!("  Computing gradients with alpha: {alpha}");
        let start = Instant::now();
        let magnitude = deriche_gradient_magnitude(&image.data, alpha, options)
            .map_err(|source| ExportError::Gradient { alpha, source })?
            .into_magnitude()
            .ok_or_else(|| ExportError::Gradient {
                alpha,
                source: GradientError::InvalidArgument("expected a magnitude volume".into()),
            })?;
        info!(
            "    Gradients are computed in: {:.1} sec",
            start.elapsed().as_secs_f32()
        );

        let stem = config.output_stem(image.basename(), alpha);
        let path = with_extension(&stem, ".nii.gz");
        info!("    Saving the gradient magnitude image...");
        save_volume(&magnitude, &image.affine, &path)?;
        info!("    Saved as: {}", path.display());

        if let Some(orientation) = config.preview {
            let result = Volume::new(magnitude, image.affine, stem.clone());
            write_preview(&result, orientation, &with_extension(&stem, ".png"))?;
        }
        written.push(path);
    }
    info!("Finished.");

    Ok(written)
}
