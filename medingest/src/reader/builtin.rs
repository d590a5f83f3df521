//! Built-in readers.

use tracing::debug;

use crate::blob::Blob;
use crate::dataset::{DataArray, Dataset, DecodedResult, ImageData, MeasurementRecord, ScalarValues};
use crate::error::{IngestError, IngestResult};
use crate::BoxFuture;

use super::DatasetReader;

/// Reads measurement annotation files (`[{componentName, data}, ...]`).
#[derive(Debug, Default)]
pub struct MeasurementsReader;

impl MeasurementsReader {
    pub fn new() -> Self {
        Self
    }

    /// Parse one file. Valid JSON that is not a record list yields nothing.
    fn parse(blob: &Blob) -> IngestResult<Option<DecodedResult>> {
        let value: serde_json::Value = serde_json::from_slice(blob.data())
            .map_err(|e| IngestError::decode(format!("invalid JSON in {}: {}", blob.name(), e)))?;

        let records: Vec<MeasurementRecord> = match serde_json::from_value(value) {
            Ok(records) => records,
            Err(e) => {
                debug!(name = blob.name(), error = %e, "JSON file is not a measurement list");
                return Ok(None);
            }
        };

        debug!(name = blob.name(), records = records.len(), "Parsed measurements");
        Ok(Some(DecodedResult::dataset(
            blob.name(),
            Dataset::Measurements(records),
        )))
    }
}

impl DatasetReader for MeasurementsReader {
    fn extensions(&self) -> Vec<String> {
        vec!["json".to_string()]
    }

    fn read(&self, files: Vec<Blob>) -> BoxFuture<'_, IngestResult<Vec<DecodedResult>>> {
        Box::pin(async move {
            let mut results: Vec<DecodedResult> = Vec::new();
            for blob in &files {
                if let Some(result) = Self::parse(blob)? {
                    results.push(result);
                }
            }
            Ok::<_, IngestError>(results)
        })
    }
}

/// Keeps project-state bundles as raw bytes.
///
/// Parsing is deferred to the state restorer at commit time.
#[derive(Debug)]
pub struct StateBundleReader {
    extension: String,
}

impl StateBundleReader {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }
}

impl DatasetReader for StateBundleReader {
    fn extensions(&self) -> Vec<String> {
        vec![self.extension.clone()]
    }

    fn read(&self, files: Vec<Blob>) -> BoxFuture<'_, IngestResult<Vec<DecodedResult>>> {
        Box::pin(async move {
            let results: Vec<DecodedResult> = files
                .into_iter()
                .map(|blob| {
                    DecodedResult::dataset(blob.name(), Dataset::StateBundle(blob.data().clone()))
                })
                .collect();
            Ok(results)
        })
    }
}

/// Decodes 2-D raster images into single-slice RGBA grids.
#[derive(Debug, Default)]
pub struct RasterImageReader;

impl RasterImageReader {
    pub fn new() -> Self {
        Self
    }

    fn decode(blob: &Blob) -> IngestResult<DecodedResult> {
        let decoded = image::load_from_memory(blob.data())
            .map_err(|e| IngestError::decode(format!("cannot decode {}: {}", blob.name(), e)))?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        let scalars = DataArray::new("Scalars", 4, ScalarValues::Uint8(rgba.into_raw()));
        let grid = ImageData::with_dimensions(
            [width as usize, height as usize, 1],
            [1.0, 1.0, 1.0],
            scalars,
        );

        Ok(DecodedResult::dataset(blob.name(), Dataset::Image(grid)))
    }
}

impl DatasetReader for RasterImageReader {
    fn extensions(&self) -> Vec<String> {
        ["png", "jpg", "jpeg", "bmp", "tif", "tiff"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn read(&self, files: Vec<Blob>) -> BoxFuture<'_, IngestResult<Vec<DecodedResult>>> {
        Box::pin(async move {
            let decoded = tokio::task::spawn_blocking(move || {
                files
                    .iter()
                    .map(Self::decode)
                    .collect::<IngestResult<Vec<_>>>()
            })
            .await;

            match decoded {
                Ok(results) => results,
                Err(e) => Err(IngestError::decode(format!("image decoder failed: {}", e))),
            }
        })
    }
}
