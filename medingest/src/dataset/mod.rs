//! Decoded dataset payloads.
//!
//! Readers resolve either with a streaming reader (output produced on demand)
//! or with a materialised [`Dataset`]. Both travel as a [`DecodedResult`]
//! together with free-form metadata.

mod image;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::IngestResult;

pub use image::{DataArray, ElementType, ImageData, ScalarValues};

/// A reader whose output is produced lazily.
pub trait StreamingReader: Send + Sync + fmt::Debug {
    /// Produce the reader's output dataset.
    fn output_data(&self) -> IngestResult<Dataset>;
}

/// One measurement annotation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementRecord {
    /// Name of the measurement tool (e.g. `"Ruler"`).
    pub component_name: String,
    /// Tool-specific payload, forwarded unchanged.
    #[serde(default)]
    pub data: Value,
}

/// A dataset produced by a reader that the pipeline does not interpret.
#[derive(Clone)]
pub struct ExternalDataset {
    /// Type marker chosen by the reader (e.g. `"vtkPolyData"`).
    pub kind: String,
    /// Opaque payload.
    pub data: Arc<dyn Any + Send + Sync>,
}

impl fmt::Debug for ExternalDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalDataset")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// A materialised dataset.
#[derive(Debug, Clone)]
pub enum Dataset {
    /// Volumetric or 2-D grid image.
    Image(ImageData),
    /// Segmentation mask, attached to a base image instead of shown alone.
    LabelMap(ImageData),
    /// Measurement annotations.
    Measurements(Vec<MeasurementRecord>),
    /// Serialized project state, parsed lazily at restore time.
    StateBundle(Bytes),
    /// Anything else a registered reader produces.
    External(ExternalDataset),
}

impl Dataset {
    /// Short type name for logging.
    pub fn kind(&self) -> &str {
        match self {
            Dataset::Image(_) => "image",
            Dataset::LabelMap(_) => "labelmap",
            Dataset::Measurements(_) => "measurements",
            Dataset::StateBundle(_) => "state-bundle",
            Dataset::External(ext) => &ext.kind,
        }
    }
}

/// Reader output: either a streaming reader or a materialised dataset.
#[derive(Debug, Clone)]
pub enum Payload {
    Reader(Arc<dyn StreamingReader>),
    Dataset(Dataset),
}

/// Result of decoding one entry.
#[derive(Debug, Clone)]
pub struct DecodedResult {
    /// Name of the decoded file (or first file of a series).
    pub name: String,
    /// Decoded payload.
    pub payload: Payload,
    /// Free-form metadata, forwarded to the scene.
    pub metadata: Map<String, Value>,
}

impl DecodedResult {
    /// A result holding a materialised dataset.
    pub fn dataset(name: impl Into<String>, dataset: Dataset) -> Self {
        Self {
            name: name.into(),
            payload: Payload::Dataset(dataset),
            metadata: Map::new(),
        }
    }

    /// A result holding a streaming reader.
    pub fn reader(name: impl Into<String>, reader: Arc<dyn StreamingReader>) -> Self {
        Self {
            name: name.into(),
            payload: Payload::Reader(reader),
            metadata: Map::new(),
        }
    }

    /// Add a metadata field.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Resolve the payload to a dataset, running the reader if needed.
    pub fn materialize(&self) -> IngestResult<Dataset> {
        match &self.payload {
            Payload::Dataset(ds) => Ok(ds.clone()),
            Payload::Reader(reader) => reader.output_data(),
        }
    }

    /// Replace a reader payload by its dataset and apply scene metadata.
    ///
    /// An image whose metadata type equals `labelmap_marker` becomes a
    /// [`Dataset::LabelMap`].
    pub fn post_process(mut self, data_type: Option<&str>, labelmap_marker: &str) -> IngestResult<Self> {
        let dataset = match self.materialize()? {
            Dataset::Image(image) if data_type == Some(labelmap_marker) => Dataset::LabelMap(image),
            other => other,
        };
        self.payload = Payload::Dataset(dataset);
        Ok(self)
    }
}
