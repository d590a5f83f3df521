//! Queue entries and their lifecycle states.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::blob::{extension_of, Blob};
use crate::dataset::DecodedResult;
use crate::reader::RawVolumeInfo;

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identifier of a queue entry.
///
/// Ids are never reused, so an operation that outlives its entry cannot
/// accidentally act on a different one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    /// Wrap a raw id value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id value.
    pub fn as_raw(&self) -> u64 {
        self.0
    }

    pub(crate) fn next() -> Self {
        Self(NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry-{}", self.0)
    }
}

/// Extra HTTP request options for a remote file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Additional request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl RequestOptions {
    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Where and how to download a remote entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDescriptor {
    pub url: String,
    pub options: RequestOptions,
    /// Whether the auth token must be injected into the request.
    pub requires_auth_token: bool,
}

/// Keys under `meta` that name a dataset's type, in lookup order.
pub const DATA_TYPE_KEYS: [&str; 2] = ["dataType", "glanceDataType"];

/// Opaque key/value map forwarded to the scene on registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneKeys(pub Map<String, Value>);

impl SceneKeys {
    /// Empty keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// The `meta` object, if present.
    pub fn meta(&self) -> Option<&Map<String, Value>> {
        self.0.get("meta").and_then(Value::as_object)
    }

    /// The dataset type named in `meta`, used to recognise labelmaps.
    ///
    /// Looks at each of [`DATA_TYPE_KEYS`] in turn.
    pub fn data_type(&self) -> Option<&str> {
        let meta = self.meta()?;
        DATA_TYPE_KEYS
            .iter()
            .find_map(|key| meta.get(*key).and_then(Value::as_str))
    }
}

/// A remote file to be downloaded and decoded.
#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub name: String,
    pub url: String,
    pub options: RequestOptions,
    pub requires_auth_token: bool,
    pub scene_keys: SceneKeys,
}

impl RemoteFile {
    /// A remote file without extra options or scene keys.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            options: RequestOptions::default(),
            requires_auth_token: false,
            scene_keys: SceneKeys::default(),
        }
    }

    /// Require the auth token for this download.
    pub fn with_auth_token(mut self) -> Self {
        self.requires_auth_token = true;
        self
    }

    /// Set request options.
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Set scene keys.
    pub fn with_scene_keys(mut self, scene_keys: SceneKeys) -> Self {
        self.scene_keys = scene_keys;
        self
    }

    fn descriptor(&self) -> RemoteDescriptor {
        RemoteDescriptor {
            url: self.url.clone(),
            options: self.options.clone(),
            requires_auth_token: self.requires_auth_token,
        }
    }
}

/// Something handed to the queue for ingestion.
#[derive(Debug, Clone)]
pub enum Submission {
    /// A single local file.
    Regular { name: String, blob: Blob },
    /// All DICOM slices of one batch, decoded as one series.
    Dicom { name: String, blobs: Vec<Blob> },
    /// A file to download first.
    Remote(RemoteFile),
}

impl Submission {
    /// A local file named after its blob.
    pub fn regular(blob: Blob) -> Self {
        Submission::Regular {
            name: blob.name().to_string(),
            blob,
        }
    }

    /// Display name of the submission.
    pub fn name(&self) -> &str {
        match self {
            Submission::Regular { name, .. } | Submission::Dicom { name, .. } => name,
            Submission::Remote(remote) => &remote.name,
        }
    }
}

/// Lifecycle state of an entry.
#[derive(Debug, Clone)]
pub enum EntryState {
    /// Remote entry waiting for its download.
    NeedsDownload,
    /// Raw volume waiting for geometry metadata.
    NeedsInfo,
    /// Source bytes available, decoding pending or in progress.
    Loading,
    /// Decoded successfully.
    Ready(Arc<DecodedResult>),
    /// A stage failed with the given message.
    Error(String),
}

/// Payload-free view of [`EntryState`], for events and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryStateKind {
    NeedsDownload,
    NeedsInfo,
    Loading,
    Ready,
    Error,
}

impl fmt::Display for EntryStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryStateKind::NeedsDownload => "needs download",
            EntryStateKind::NeedsInfo => "needs info",
            EntryStateKind::Loading => "loading",
            EntryStateKind::Ready => "ready",
            EntryStateKind::Error => "error",
        };
        write!(f, "{}", s)
    }
}

impl EntryState {
    pub fn kind(&self) -> EntryStateKind {
        match self {
            EntryState::NeedsDownload => EntryStateKind::NeedsDownload,
            EntryState::NeedsInfo => EntryStateKind::NeedsInfo,
            EntryState::Loading => EntryStateKind::Loading,
            EntryState::Ready(_) => EntryStateKind::Ready,
            EntryState::Error(_) => EntryStateKind::Error,
        }
    }

    /// `Ready` and `Error` only change through deletion.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryState::Ready(_) | EntryState::Error(_))
    }
}

/// One tracked unit of ingestion.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub id: EntryId,
    pub name: String,
    /// Lower-cased extension used for dispatch.
    pub extension: String,
    /// Source blobs: one for regular files, N for a series, none before download.
    pub source_files: Vec<Blob>,
    pub state: EntryState,
    pub extra_info: Option<RawVolumeInfo>,
    pub remote: Option<RemoteDescriptor>,
    pub scene_keys: SceneKeys,
}

impl FileEntry {
    /// Build a fresh entry from a submission.
    pub(crate) fn from_submission(id: EntryId, submission: Submission) -> Self {
        match submission {
            Submission::Regular { name, blob } => Self {
                id,
                extension: extension_of(&name),
                name,
                source_files: vec![blob],
                state: EntryState::Loading,
                extra_info: None,
                remote: None,
                scene_keys: SceneKeys::default(),
            },
            Submission::Dicom { name, blobs } => Self {
                id,
                extension: extension_of(&name),
                name,
                source_files: blobs,
                state: EntryState::Loading,
                extra_info: None,
                remote: None,
                scene_keys: SceneKeys::default(),
            },
            Submission::Remote(remote) => Self {
                id,
                extension: extension_of(&remote.name),
                remote: Some(remote.descriptor()),
                name: remote.name,
                source_files: Vec::new(),
                state: EntryState::NeedsDownload,
                extra_info: None,
                scene_keys: remote.scene_keys,
            },
        }
    }

    /// The decoded result, set only when `Ready`.
    pub fn decoded(&self) -> Option<&Arc<DecodedResult>> {
        match &self.state {
            EntryState::Ready(decoded) => Some(decoded),
            _ => None,
        }
    }

    /// The error message, set only when in `Error`.
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            EntryState::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use serde_json::json;

    #[test]
    fn test_entry_ids_are_unique() {
        let a = EntryId::next();
        let b = EntryId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_regular_submission_starts_loading() {
        let entry = FileEntry::from_submission(
            EntryId::from_raw(1),
            Submission::regular(Blob::new("Brain.VTI", vec![1u8])),
        );
        assert_eq!(entry.state.kind(), EntryStateKind::Loading);
        assert_eq!(entry.extension, "vti");
        assert_eq!(entry.source_files.len(), 1);
        assert!(!entry.is_remote());
    }

    #[test]
    fn test_remote_submission_needs_download() {
        let remote = RemoteFile::new("ct.vti", "https://host/ct.vti")
            .with_auth_token()
            .with_scene_keys(SceneKeys::new().with("meta", json!({"dataType": "vtkLabelMap"})));
        let entry = FileEntry::from_submission(EntryId::from_raw(2), Submission::Remote(remote));

        assert_eq!(entry.state.kind(), EntryStateKind::NeedsDownload);
        assert!(entry.source_files.is_empty());
        let descriptor = entry.remote.as_ref().unwrap();
        assert_eq!(descriptor.url, "https://host/ct.vti");
        assert!(descriptor.requires_auth_token);
        assert_eq!(entry.scene_keys.data_type(), Some("vtkLabelMap"));
    }

    #[test]
    fn test_decoded_and_error_follow_state() {
        let mut entry = FileEntry::from_submission(
            EntryId::from_raw(3),
            Submission::regular(Blob::new("m.json", vec![])),
        );
        assert!(entry.decoded().is_none());
        assert!(!entry.state.is_terminal());

        entry.state = EntryState::Ready(Arc::new(DecodedResult::dataset(
            "m.json",
            Dataset::Measurements(vec![]),
        )));
        assert!(entry.decoded().is_some());
        assert!(entry.error().is_none());
        assert!(entry.state.is_terminal());

        entry.state = EntryState::Error("boom".to_string());
        assert_eq!(entry.error(), Some("boom"));
        assert!(entry.decoded().is_none());
    }

    #[test]
    fn test_scene_keys_without_meta() {
        let keys = SceneKeys::new().with("name", "x");
        assert!(keys.meta().is_none());
        assert!(keys.data_type().is_none());
    }

    #[test]
    fn test_scene_keys_data_type_keys() {
        let keys = SceneKeys::new().with("meta", json!({"glanceDataType": "vtkLabelMap"}));
        assert_eq!(keys.data_type(), Some("vtkLabelMap"));

        let keys = SceneKeys::new().with(
            "meta",
            json!({"dataType": "vtkImageData", "glanceDataType": "vtkLabelMap"}),
        );
        assert_eq!(keys.data_type(), Some("vtkImageData"));
    }
}
