use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Spatial axis of a volume laid out as (x, y, z).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpatialAxis {
    X,
    Y,
    Z,
}

impl SpatialAxis {
    pub const ALL: [SpatialAxis; 3] = [SpatialAxis::X, SpatialAxis::Y, SpatialAxis::Z];

    /// Axis permutation that moves this axis to the front.
    ///
    /// Follows `permuted_axes` semantics: output axis `i` is input axis
    /// `perm[i]`. The remaining two axes keep their cyclic order.
    pub fn permutation(self) -> [usize; 3] {
        match self {
            SpatialAxis::X => [0, 1, 2],
            // (X, Y, Z) -> (Y, Z, X)
            SpatialAxis::Y => [1, 2, 0],
            // (X, Y, Z) -> (Z, X, Y)
            SpatialAxis::Z => [2, 0, 1],
        }
    }

    /// Permutation undoing [`SpatialAxis::permutation`].
    pub fn inverse_permutation(self) -> [usize; 3] {
        let perm = self.permutation();
        let mut inverse = [0; 3];
        for (i, &p) in perm.iter().enumerate() {
            inverse[p] = i;
        }
        inverse
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Slice plane used for preview images.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Fixed z
    Axial,
    /// Fixed y
    Coronal,
    /// Fixed x
    Sagittal,
}

impl Orientation {
    pub fn fixed_axis(self) -> SpatialAxis {
        match self {
            Orientation::Axial => SpatialAxis::Z,
            Orientation::Coronal => SpatialAxis::Y,
            Orientation::Sagittal => SpatialAxis::X,
        }
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "axial" => Ok(Orientation::Axial),
            "coronal" => Ok(Orientation::Coronal),
            "sagittal" => Ok(Orientation::Sagittal),
            other => Err(format!(
                "unknown orientation '{other}', expected axial, coronal or sagittal"
            )),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Orientation::Axial => "axial",
            Orientation::Coronal => "coronal",
            Orientation::Sagittal => "sagittal",
        };
        f.write_str(name)
    }
}
