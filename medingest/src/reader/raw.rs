//! Raw volume materializer.
//!
//! A `.raw` file is a headerless dump of voxel values. Its geometry has to be
//! supplied separately as [`RawVolumeInfo`] before it can be decoded.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::blob::Blob;
use crate::dataset::{DataArray, ElementType, ImageData, ScalarValues};
use crate::error::{IngestError, IngestResult};

/// Name of the scalar array attached to materialised raw volumes.
pub const SCALARS_NAME: &str = "Scalars";

/// Geometry metadata required to interpret a raw buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVolumeInfo {
    /// Number of voxels along x, y and z.
    pub dimensions: [usize; 3],
    /// Voxel spacing along x, y and z.
    pub spacing: [f64; 3],
    /// Numeric type of each voxel.
    pub element_type: ElementType,
}

impl RawVolumeInfo {
    /// Create new geometry metadata.
    pub fn new(dimensions: [usize; 3], spacing: [f64; 3], element_type: ElementType) -> Self {
        Self {
            dimensions,
            spacing,
            element_type,
        }
    }

    /// Expected number of voxels.
    pub fn voxel_count(&self) -> usize {
        self.dimensions.iter().product()
    }
}

/// Build a volumetric grid from a raw buffer and its geometry.
///
/// The buffer is read as little-endian values of `info.element_type`. A
/// buffer that does not split into whole elements is a decode failure. A
/// voxel count that differs from the dimensions is tolerated with a warning.
pub fn materialize(blob: &Blob, info: &RawVolumeInfo) -> IngestResult<ImageData> {
    if info.dimensions.contains(&0) {
        return Err(IngestError::decode(format!(
            "invalid raw dimensions {:?} for {}",
            info.dimensions,
            blob.name()
        )));
    }

    let values = ScalarValues::from_le_bytes(info.element_type, blob.data())
        .map_err(|reason| IngestError::decode(format!("cannot read {}: {}", blob.name(), reason)))?;

    if values.len() != info.voxel_count() {
        warn!(
            name = blob.name(),
            values = values.len(),
            expected = info.voxel_count(),
            "Raw buffer size does not match dimensions"
        );
    }

    let scalars = DataArray::new(SCALARS_NAME, 1, values);
    Ok(ImageData::with_dimensions(
        info.dimensions,
        info.spacing,
        scalars,
    ))
}
