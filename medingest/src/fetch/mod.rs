//! Remote file download.
//!
//! The [`RemoteFetcher`] trait abstracts downloading so the queue can be
//! driven by a mock in tests. [`HttpFetcher`] is the `reqwest`
//! implementation.

mod auth;
mod http;

use crate::blob::Blob;
use crate::error::IngestResult;
use crate::progress::Progress;
use crate::queue::RemoteDescriptor;
use crate::BoxFuture;

pub use auth::{authorized_options, AuthHeader, StaticToken, TokenProvider};
pub use http::HttpFetcher;

/// Callback receiving download progress for one file.
pub type ProgressCallback = Box<dyn Fn(Progress) + Send + Sync>;

/// Downloads remote files.
pub trait RemoteFetcher: Send + Sync {
    /// Download `remote` and return its body as a blob named `name`.
    ///
    /// Any failure is reported as [`IngestError::FetchFailure`](crate::IngestError::FetchFailure).
    fn fetch<'a>(
        &'a self,
        name: &'a str,
        remote: &'a RemoteDescriptor,
        on_progress: ProgressCallback,
    ) -> BoxFuture<'a, IngestResult<Blob>>;
}
