//! Named in-memory files.

use bytes::Bytes;

/// A named, immutable in-memory file.
///
/// Blobs are what the pipeline moves around: files read from disk, archive
/// leaves, and downloaded bodies. Cloning is cheap (`Bytes` is refcounted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    name: String,
    data: Bytes,
}

impl Blob {
    /// Create a new blob.
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Display name of the blob (base name only, no directories).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw contents.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Lower-cased extension used for dispatch.
    pub fn extension(&self) -> String {
        extension_of(&self.name)
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the blob has no contents.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Same contents under a different name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: self.data.clone(),
        }
    }
}

/// Largest buffer pre-allocated from a size declared by an archive or server.
pub const MAX_PREALLOCATION: usize = 8 * 1024 * 1024;

/// Initial buffer capacity for contents of a declared, untrusted size.
///
/// The buffer still grows to the real size as data arrives.
pub fn capacity_hint(declared: u64) -> usize {
    usize::try_from(declared).map_or(MAX_PREALLOCATION, |n| n.min(MAX_PREALLOCATION))
}

/// Extract the lower-cased suffix after the last `.` of a file name.
///
/// Returns an empty string when the name has no dot.
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(i) => name[i + 1..].to_lowercase(),
        None => String::new(),
    }
}

/// Strip any directory components from an archive path.
pub fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
