//! Single-file gzip decompression.

use std::io::Read;

use flate2::read::GzDecoder;

use crate::blob::Blob;
use crate::error::{IngestError, IngestResult};

/// Gzip suffix, including the dot.
pub const GZIP_SUFFIX: &str = ".gz";

/// Name of the file inside a `.gz` blob.
pub fn inner_name(name: &str) -> &str {
    let split = name.len().saturating_sub(GZIP_SUFFIX.len());
    match (name.get(..split), name.get(split..)) {
        (Some(inner), Some(suffix)) if !inner.is_empty() && suffix.eq_ignore_ascii_case(GZIP_SUFFIX) => {
            inner
        }
        _ => name,
    }
}

/// Decompress a `.gz` blob into its inner file.
pub fn gunzip(blob: &Blob) -> IngestResult<Blob> {
    let mut decoder = GzDecoder::new(&blob.data()[..]);
    let mut data = Vec::new();
    decoder
        .read_to_end(&mut data)
        .map_err(|e| IngestError::Archive {
            name: blob.name().to_string(),
            reason: e.to_string(),
        })?;

    Ok(Blob::new(inner_name(blob.name()), data))
}

#[cfg(test)]
pub(crate) fn gzip_bytes(data: &[u8]) -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
