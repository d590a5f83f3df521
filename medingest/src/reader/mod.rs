//! Type dispatch and dataset readers.
//!
//! The [`ReaderRegistry`] picks a decoding strategy from an entry's
//! extension:
//!
//! - `raw` → [`raw::materialize`], once geometry metadata is available
//! - `dcm` → the registered [`SeriesAssembler`], fed every file of the entry
//! - state-bundle extension → the registered bundle reader, at most once per queue
//! - anything else → the [`DatasetReader`] registered for that extension
//!
//! # Example
//!
//! ```ignore
//! use medingest::config::PipelineConfig;
//! use medingest::reader::ReaderRegistry;
//!
//! let registry = ReaderRegistry::with_builtins(&PipelineConfig::default())
//!     .with_reader(Arc::new(MyVtiReader))
//!     .with_series_assembler(Arc::new(MyDicomAssembler));
//!
//! assert!(registry.supported_extensions().contains("vti"));
//! ```

mod builtin;
pub mod raw;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::blob::Blob;
use crate::config::PipelineConfig;
use crate::dataset::{Dataset, DecodedResult};
use crate::error::{IngestError, IngestResult};
use crate::BoxFuture;

pub use builtin::{MeasurementsReader, RasterImageReader, StateBundleReader};
pub use raw::RawVolumeInfo;

/// Extension of headerless raw volumes.
pub const RAW_EXTENSION: &str = "raw";
/// Extension of DICOM slices.
pub const DICOM_EXTENSION: &str = "dcm";
/// Extension of zip containers.
pub const ZIP_EXTENSION: &str = "zip";
/// Extension of gzip-compressed files.
pub const GZIP_EXTENSION: &str = "gz";

/// A reader for one or more file extensions.
///
/// Readers are expected to resolve with one decoded result per file group.
/// Any other count is treated by the dispatcher as "nothing produced".
pub trait DatasetReader: Send + Sync {
    /// Extensions handled by this reader (lower case, without dot).
    fn extensions(&self) -> Vec<String>;

    /// Decode the given files.
    fn read(&self, files: Vec<Blob>) -> BoxFuture<'_, IngestResult<Vec<DecodedResult>>>;
}

/// Assembles a set of DICOM slices into one series dataset.
///
/// Every `.dcm` file submitted in one batch is handed over as a single
/// series. No study or series identifiers are checked.
pub trait SeriesAssembler: Send + Sync {
    /// Assemble the series. `None` means nothing was produced.
    fn assemble<'a>(
        &'a self,
        name: &'a str,
        files: Vec<Blob>,
    ) -> BoxFuture<'a, IngestResult<Option<DecodedResult>>>;
}

/// Everything the dispatcher needs to decode one entry.
#[derive(Debug, Clone)]
pub struct DecodeJob {
    /// Display name of the entry.
    pub name: String,
    /// Lower-cased extension used for dispatch.
    pub extension: String,
    /// Source files, in submission order.
    pub files: Vec<Blob>,
    /// Raw volume geometry, if supplied.
    pub extra_info: Option<RawVolumeInfo>,
    /// Whether an earlier entry in the queue is also a state bundle.
    pub preceded_by_state_bundle: bool,
}

/// Outcome of a successful dispatch.
#[derive(Debug)]
pub enum Decoded {
    /// The entry decoded to exactly one result.
    Ready(DecodedResult),
    /// A raw volume is missing its geometry metadata.
    NeedsInfo,
    /// The reader produced no single result; the entry is left as is.
    Nothing,
}

/// Registry of readers keyed by extension, plus the dispatch logic.
pub struct ReaderRegistry {
    readers: HashMap<String, Arc<dyn DatasetReader>>,
    series: Option<Arc<dyn SeriesAssembler>>,
    state_bundle_extension: String,
}

impl ReaderRegistry {
    /// Create an empty registry.
    pub fn new(state_bundle_extension: impl Into<String>) -> Self {
        Self {
            readers: HashMap::new(),
            series: None,
            state_bundle_extension: state_bundle_extension.into().to_lowercase(),
        }
    }

    /// Create a registry with the built-in measurement, state-bundle and
    /// raster image readers.
    pub fn with_builtins(config: &PipelineConfig) -> Self {
        Self::new(config.state_bundle_extension.clone())
            .with_reader(Arc::new(MeasurementsReader::new()))
            .with_reader(Arc::new(StateBundleReader::new(
                config.state_bundle_extension.clone(),
            )))
            .with_reader(Arc::new(RasterImageReader::new()))
    }

    /// Register a reader for all of its extensions, replacing earlier ones.
    pub fn register(&mut self, reader: Arc<dyn DatasetReader>) {
        for ext in reader.extensions() {
            self.readers.insert(ext.to_lowercase(), Arc::clone(&reader));
        }
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_reader(mut self, reader: Arc<dyn DatasetReader>) -> Self {
        self.register(reader);
        self
    }

    /// Set the DICOM series assembler.
    pub fn set_series_assembler(&mut self, assembler: Arc<dyn SeriesAssembler>) {
        self.series = Some(assembler);
    }

    /// Builder form of [`set_series_assembler`](Self::set_series_assembler).
    pub fn with_series_assembler(mut self, assembler: Arc<dyn SeriesAssembler>) -> Self {
        self.set_series_assembler(assembler);
        self
    }

    /// Extension that marks project-state bundles.
    pub fn state_bundle_extension(&self) -> &str {
        &self.state_bundle_extension
    }

    /// Whether a reader is registered for an extension.
    pub fn has_reader(&self, extension: &str) -> bool {
        self.readers.contains_key(extension)
    }

    /// The supported-extension allow-list.
    ///
    /// Containers, raw volumes, DICOM slices, the state-bundle extension and
    /// every registered reader extension.
    pub fn supported_extensions(&self) -> BTreeSet<String> {
        let mut exts: BTreeSet<String> = [
            ZIP_EXTENSION,
            RAW_EXTENSION,
            GZIP_EXTENSION,
            DICOM_EXTENSION,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        exts.insert(self.state_bundle_extension.clone());
        exts.extend(self.readers.keys().cloned());
        exts
    }

    /// Decode one entry according to its extension.
    pub async fn decode(&self, job: DecodeJob) -> IngestResult<Decoded> {
        let DecodeJob {
            name,
            extension,
            files,
            extra_info,
            preceded_by_state_bundle,
        } = job;

        match extension.as_str() {
            RAW_EXTENSION => {
                let Some(info) = extra_info else {
                    return Ok(Decoded::NeedsInfo);
                };
                let blob = files
                    .into_iter()
                    .next()
                    .ok_or_else(|| IngestError::decode(format!("no data for {}", name)))?;

                let image = tokio::task::spawn_blocking(move || raw::materialize(&blob, &info))
                    .await
                    .map_err(|e| IngestError::decode(format!("raw decoder failed: {}", e)))??;

                Ok(Decoded::Ready(DecodedResult::dataset(
                    name,
                    Dataset::Image(image),
                )))
            }
            DICOM_EXTENSION => {
                let assembler = self.series.as_ref().ok_or_else(|| IngestError::NoReader {
                    extension: extension.clone(),
                })?;

                match assembler.assemble(&name, files).await? {
                    Some(result) => Ok(Decoded::Ready(result)),
                    None => {
                        debug!(name = %name, "Series assembler produced nothing");
                        Ok(Decoded::Nothing)
                    }
                }
            }
            ext if ext == self.state_bundle_extension && preceded_by_state_bundle => {
                Err(IngestError::DuplicateStateBundle)
            }
            ext => {
                let reader = self.readers.get(ext).ok_or_else(|| IngestError::NoReader {
                    extension: ext.to_string(),
                })?;

                let mut results = reader.read(files).await?;
                if results.len() == 1 {
                    Ok(Decoded::Ready(results.remove(0)))
                } else {
                    debug!(
                        name = %name,
                        produced = results.len(),
                        "Reader did not produce exactly one dataset"
                    );
                    Ok(Decoded::Nothing)
                }
            }
        }
    }
}
