//! Archive expansion.
//!
//! Zip containers are unpacked recursively into a flat list of blobs. Only
//! leaves whose extension is on the allow-list survive, named by their base
//! name. Single-file `.gz` blobs are decompressed when the inner file is
//! supported and skipped otherwise. A gzip stream that fails to decompress
//! is reported in [`Expansion::unreadable`] so it can surface as an error.
//!
//! Expansion runs in rounds: every container found in a round is unpacked
//! concurrently on the blocking pool, and its children are examined in the
//! next round. A container that cannot be opened is logged and contributes
//! nothing.

mod gzip;

use std::collections::{BTreeSet, HashMap};
use std::io::{Cursor, Read};

use futures::future::join_all;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::blob::{base_name, capacity_hint, extension_of, Blob};
use crate::error::{IngestError, IngestResult};
use crate::reader::{GZIP_EXTENSION, ZIP_EXTENSION};

pub use gzip::{gunzip, inner_name};

/// Files produced by [`ArchiveExpander::expand`].
#[derive(Debug, Default)]
pub struct Expansion {
    /// Extracted and passed-through files, in order.
    pub files: Vec<Blob>,
    /// Gzip files of a supported type that could not be decompressed,
    /// named after the file they should have contained.
    pub unreadable: Vec<(Blob, IngestError)>,
}

/// How the expander treats one blob.
enum Kind {
    Leaf,
    Zip,
    Gzip,
    Skip,
}

/// Unpacks zip and gzip containers.
#[derive(Debug, Clone)]
pub struct ArchiveExpander {
    supported: BTreeSet<String>,
    gzip_readable: bool,
}

impl ArchiveExpander {
    /// Create an expander with the given extension allow-list.
    pub fn new(supported: BTreeSet<String>) -> Self {
        Self {
            supported,
            gzip_readable: false,
        }
    }

    /// Keep `.gz` files with unsupported contents as they are, for a reader
    /// that accepts gzip directly. Without this they are skipped.
    pub fn with_gzip_passthrough(mut self, readable: bool) -> Self {
        self.gzip_readable = readable;
        self
    }

    /// Whether an extension is on the allow-list.
    pub fn is_supported(&self, extension: &str) -> bool {
        self.supported.contains(extension)
    }

    fn classify(&self, blob: &Blob) -> Kind {
        match blob.extension().as_str() {
            ZIP_EXTENSION => Kind::Zip,
            GZIP_EXTENSION => {
                let inner = extension_of(inner_name(blob.name()));
                if inner != GZIP_EXTENSION && self.is_supported(&inner) {
                    Kind::Gzip
                } else if self.gzip_readable {
                    Kind::Leaf
                } else {
                    Kind::Skip
                }
            }
            _ => Kind::Leaf,
        }
    }

    /// Expand every container in `blobs`, recursively.
    ///
    /// Non-container blobs pass through unchanged, in order, ahead of the
    /// extracted files.
    pub async fn expand(&self, blobs: Vec<Blob>) -> Expansion {
        let mut expansion = Expansion::default();
        let mut pending = blobs;

        while !pending.is_empty() {
            let mut containers = Vec::new();
            for blob in pending {
                match self.classify(&blob) {
                    Kind::Leaf => expansion.files.push(blob),
                    Kind::Zip | Kind::Gzip => containers.push(blob),
                    Kind::Skip => {
                        debug!(name = blob.name(), "Skipping gzip file with unsupported contents")
                    }
                }
            }

            if containers.is_empty() {
                break;
            }

            let rounds = containers.into_iter().map(|blob| {
                let supported = self.supported.clone();
                async move {
                    let source = blob.clone();
                    let unpacked =
                        tokio::task::spawn_blocking(move || unpack(&blob, &supported)).await;
                    let result = match unpacked {
                        Ok(result) => result,
                        Err(e) => Err(IngestError::Archive {
                            name: source.name().to_string(),
                            reason: format!("unpack task failed: {}", e),
                        }),
                    };

                    match result {
                        Ok(children) => {
                            debug!(name = source.name(), files = children.len(), "Expanded archive");
                            Ok(children)
                        }
                        Err(e) if source.extension() == GZIP_EXTENSION => {
                            warn!(name = source.name(), error = %e, "Unreadable gzip file");
                            Err((source.renamed(inner_name(source.name())), e))
                        }
                        Err(e) => {
                            warn!(name = source.name(), error = %e, "Skipping unreadable archive");
                            Ok(Vec::new())
                        }
                    }
                }
            });

            pending = Vec::new();
            for unpacked in join_all(rounds).await {
                match unpacked {
                    Ok(children) => pending.extend(children),
                    Err(failed) => expansion.unreadable.push(failed),
                }
            }
        }

        expansion
    }
}

fn unpack(blob: &Blob, supported: &BTreeSet<String>) -> IngestResult<Vec<Blob>> {
    if blob.extension() == GZIP_EXTENSION {
        return Ok(vec![gunzip(blob)?]);
    }
    expand_zip(blob, supported)
}

/// Extract every supported leaf of one zip archive.
///
/// Leaves sharing a base name collapse into one blob at the first one's
/// position, holding the last one's data.
pub fn expand_zip(blob: &Blob, supported: &BTreeSet<String>) -> IngestResult<Vec<Blob>> {
    let archive_error = |reason: String| IngestError::Archive {
        name: blob.name().to_string(),
        reason,
    };

    let mut archive =
        ZipArchive::new(Cursor::new(blob.data().clone())).map_err(|e| archive_error(e.to_string()))?;

    let mut files: Vec<Blob> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| archive_error(e.to_string()))?;
        if entry.is_dir() {
            continue;
        }

        let path = entry.name().to_string();
        let name = base_name(&path).to_string();
        if name.is_empty() || !supported.contains(&extension_of(&name)) {
            continue;
        }

        let mut data = Vec::with_capacity(capacity_hint(entry.size()));
        entry
            .read_to_end(&mut data)
            .map_err(|e| archive_error(format!("{}: {}", path, e)))?;

        let extracted = Blob::new(name.clone(), data);
        match positions.get(&name) {
            Some(&pos) => {
                debug!(archive = blob.name(), name = %name, "Duplicate file name in archive, keeping last");
                files[pos] = extracted;
            }
            None => {
                positions.insert(name, files.len());
                files.push(extracted);
            }
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn supported() -> BTreeSet<String> {
        ["zip", "gz", "raw", "dcm", "glance", "vti", "json"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in files {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    fn names(blobs: &[Blob]) -> Vec<&str> {
        blobs.iter().map(|b| b.name()).collect()
    }

    #[test]
    fn test_expand_zip_filters_and_flattens() {
        let archive = Blob::new(
            "study.zip",
            zip_bytes(&[
                ("series/", b""),
                ("series/a.dcm", b"a"),
                ("series/deep/b.dcm", b"b"),
                ("readme.txt", b"ignored"),
            ]),
        );

        let files = expand_zip(&archive, &supported()).unwrap();
        assert_eq!(names(&files), vec!["a.dcm", "b.dcm"]);
    }

    #[test]
    fn test_expand_zip_duplicate_names_keep_last_at_first_position() {
        let archive = Blob::new(
            "dup.zip",
            zip_bytes(&[("x/a.vti", b"first"), ("m.json", b"[]"), ("y/a.vti", b"second")]),
        );

        let files = expand_zip(&archive, &supported()).unwrap();
        assert_eq!(names(&files), vec!["a.vti", "m.json"]);
        assert_eq!(&files[0].data()[..], b"second");
    }

    #[test]
    fn test_expand_zip_corrupt() {
        let archive = Blob::new("bad.zip", vec![1u8, 2, 3]);
        assert!(matches!(
            expand_zip(&archive, &supported()),
            Err(IngestError::Archive { .. })
        ));
    }

    #[tokio::test]
    async fn test_expand_nested_archives() {
        let inner = zip_bytes(&[("c.vti", b"c"), ("skip.exe", b"x")]);
        let outer = zip_bytes(&[("a.vti", b"a"), ("nested/inner.zip", &inner)]);
        let expander = ArchiveExpander::new(supported());

        let expansion = expander
            .expand(vec![
                Blob::new("loose.json", b"[]".to_vec()),
                Blob::new("outer.zip", outer),
            ])
            .await;

        assert_eq!(names(&expansion.files), vec!["loose.json", "a.vti", "c.vti"]);
    }

    #[tokio::test]
    async fn test_expand_sibling_archives_and_broken_one() {
        let expander = ArchiveExpander::new(supported());
        let expansion = expander
            .expand(vec![
                Blob::new("one.zip", zip_bytes(&[("a.vti", b"a")])),
                Blob::new("broken.zip", vec![0u8; 10]),
                Blob::new("two.zip", zip_bytes(&[("b.vti", b"b")])),
            ])
            .await;

        assert_eq!(names(&expansion.files), vec!["a.vti", "b.vti"]);
        assert!(expansion.unreadable.is_empty());
    }

    #[tokio::test]
    async fn test_expand_gzip() {
        let expander = ArchiveExpander::new(supported());
        let expansion = expander
            .expand(vec![
                Blob::new("volume.raw.gz", gzip::gzip_bytes(&[9u8; 8])),
                Blob::new("mesh.obj.gz", vec![1u8]),
                Blob::new("bad.vti.gz", vec![1u8, 2]),
            ])
            .await;

        assert_eq!(names(&expansion.files), vec!["volume.raw"]);
        assert_eq!(expansion.files[0].len(), 8);

        assert_eq!(expansion.unreadable.len(), 1);
        let (blob, error) = &expansion.unreadable[0];
        assert_eq!(blob.name(), "bad.vti");
        assert!(matches!(error, IngestError::Archive { .. }));
    }

    #[tokio::test]
    async fn test_expand_gzip_passthrough() {
        let expander = ArchiveExpander::new(supported()).with_gzip_passthrough(true);
        let expansion = expander
            .expand(vec![Blob::new("mesh.obj.gz", vec![1u8])])
            .await;

        assert_eq!(names(&expansion.files), vec!["mesh.obj.gz"]);
    }

    #[test]
    fn test_expand_zip_ignores_declared_size() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("a.vti", options).unwrap();
        writer.write_all(b"abc").unwrap();
        let mut bytes = writer.finish().unwrap().into_inner();

        // Claim a 4 GiB uncompressed size in the central directory.
        let header = bytes
            .windows(4)
            .position(|w| w == b"PK\x01\x02")
            .unwrap();
        bytes[header + 24..header + 28].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());

        match expand_zip(&Blob::new("lying.zip", bytes), &supported()) {
            Ok(files) => assert_eq!(&files[0].data()[..], b"abc"),
            Err(e) => assert!(matches!(e, IngestError::Archive { .. })),
        }
    }

    #[tokio::test]
    async fn test_expand_gzipped_zip() {
        let expander = ArchiveExpander::new(supported());
        let zipped = zip_bytes(&[("a.vti", b"a")]);
        let expansion = expander
            .expand(vec![Blob::new("bundle.zip.gz", gzip::gzip_bytes(&zipped))])
            .await;

        assert_eq!(names(&expansion.files), vec!["a.vti"]);
    }
}
