//! # Deriche gradient magnitude library
//!
//! This crate computes gradient magnitude volumes from 3D scalar images using
//! the recursive Deriche edge filter, and writes them as NIfTI files.

//!
//! The Deriche derivative only runs along the leading axis of a volume. Each
//! of the three spatial axes is rotated to the front, filtered and rotated
//! back, so the resulting derivatives always line up with the source voxel
//! grid. The directional derivatives are combined into their Euclidean norm:
//!  - x derivative
//!  - y derivative
//!  - z derivative
//!
//!  The magnitude can optionally be rescaled so that its dynamic range
//!  matches the range of the source image. Volumes are assumed to have the
//!  following attributes:
//!   - NIfTI-1 (`.nii` or `.nii.gz`), 3D or 4D with a single frame
//!   - Every axis at least 3 voxels long
//!   - Finite intensities
//!
//! # Examples
//!
//! ## Gradient magnitude of a NIfTI volume
//!
//! Load a volume, compute its gradient magnitude with alpha 2 and save the
//! result next to the input.
//!
//! ```no_run
//! # use deriche_gramag::{GradientOptions, deriche_gradient_magnitude, load_volume, save_volume};
//! let volume = load_volume("sub-01_T1w.nii.gz").expect("should have loaded the volume");
//! let magnitude = deriche_gradient_magnitude(&volume.data, 2.0, GradientOptions::default())
//!     .expect("should have computed the gradient magnitude")
//!     .into_magnitude()
//!     .expect("magnitude was requested");
//! save_volume(&magnitude, &volume.affine, "sub-01_T1w_GraMagDeriche_alpha2pt0.nii.gz")
//!     .expect("should have saved the result");
//! ```
//!
//! ## Batch export over several filter strengths
//!
//! ```no_run
//! # use deriche_gramag::{ExportConfig, export_deriche_gramag};
//! let mut config = ExportConfig::new("sub-01_T1w.nii.gz");
//! config.alphas = vec![1.0, 2.0, 3.0];
//! let written = export_deriche_gramag(&config).expect("should have exported every alpha");
//! assert_eq!(written.len(), 3);
//! ```

pub mod enums;
pub mod export;
pub mod filter;
pub mod gradient;
pub mod volume;
pub mod volume_loader;

pub use enums::{Orientation, SpatialAxis};
pub use export::{ExportConfig, ExportError, export_deriche_gramag};
pub use filter::{AxisFilter, DericheFilter, FilterError};
pub use gradient::{
    GradientError, GradientOptions, GradientOutput, GradientStack, Normalization,
    compute_gradients, deriche_gradient_magnitude, gradient_magnitude,
};
pub use volume::{Affine, Volume};
pub use volume_loader::{VolumeIoError, VolumeLoader, load_volume, save_volume};
