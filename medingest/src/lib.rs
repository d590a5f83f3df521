//! medingest - dataset file ingestion pipeline
//!
//! This library turns heterogeneous dataset files (local files, remote URLs,
//! zip archives, DICOM series and project-state bundles) into decoded
//! datasets, tracks every file through an explicit state machine, and hands
//! the results to an external scene collaborator in dependency order.
//!
//! # Architecture
//!
//! ```text
//! open_files / open_remote_files
//!         │
//!         ├── ArchiveExpander (zip + gzip, allow-list filtering)
//!         │
//!         ▼
//!     FileQueue ──── RemoteFetcher (download + progress)
//!   (state machine)  ReaderRegistry (raw / dcm / state bundle / generic)
//!         │
//!         ▼
//!      Loader ──────► StateRestorer, then Scene (register, attach)
//! ```

use std::future::Future;
use std::pin::Pin;

pub mod archive;
pub mod blob;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod progress;
pub mod queue;
pub mod reader;

pub use blob::Blob;
pub use error::{IngestError, IngestResult};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
